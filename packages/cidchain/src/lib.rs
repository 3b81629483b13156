//! # cidchain
//!
//! Resolve URL paths into chains of executable segments and content
//! references, run each in its language runtime, and store results under
//! deterministic content identifiers.
//!
//! This crate re-exports the workspace's layers:
//!
//! - [`store`]: CIDs and the content store (embedding rule, dedup)
//! - [`exec`]: languages, runtime table, process dispatch
//! - [`pipeline`]: segment classification, right-to-left resolution, debug
//!   traces and response projection
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use cidchain::prelude::*;
//!
//! let store = Arc::new(InMemoryContentStore::new());
//! let source = store.put(b"tr a-z A-Z")?;
//! let registry = InMemoryRegistry::new()
//!     .with(ServerDefinition::new("upper", Language::Bash, source));
//!
//! let resolver = Resolver::new(Arc::new(registry), Dispatcher::new(store.clone()));
//! let response = resolver.handle(&Request::parse("/upper/hello"), &CancelToken::new());
//! assert_eq!(&response.body()[..], b"HELLO");
//! ```

pub use cidchain_exec as exec;
pub use cidchain_pipeline as pipeline;
pub use cidchain_store as store;

/// The types most callers need.
pub mod prelude {
    pub use cidchain_exec::{CancelToken, Dispatcher, Language, ProcessRunner, Target};
    pub use cidchain_pipeline::{
        ErrorKind, InMemoryRegistry, Output, PipelineError, PipelineTrace, Request, Resolver,
        Response, Segment, ServerDefinition, ServerRegistry,
    };
    pub use cidchain_store::{Cid, ContentStore, Format, InMemoryContentStore, EMBED_LIMIT};
}

#[cfg(test)]
mod tests {
    use super::prelude::*;
    use crate::exec::mock::ScriptedRunner;
    use std::sync::Arc;

    #[test]
    fn prelude_wires_a_pipeline() {
        let store = Arc::new(InMemoryContentStore::new());
        let source = store.put(b"tr a-z A-Z").unwrap();
        let registry =
            InMemoryRegistry::new().with(ServerDefinition::new("upper", Language::Bash, source));
        let runner = ScriptedRunner::new()
            .with_text_script("tr a-z A-Z", |call| call.input().to_uppercase());

        let resolver = Resolver::new(
            Arc::new(registry),
            Dispatcher::with_runner(store.clone(), runner),
        );
        let response = resolver.handle(&Request::parse("/upper/hello"), &CancelToken::new());
        assert_eq!(&response.body()[..], b"HELLO");
    }
}
