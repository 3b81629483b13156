//! # cidchain-exec
//!
//! Runs executable segments in their language runtime.
//!
//! A [`Target`] is either a registered server (its source lives in the
//! content store under a CID) or an ad-hoc executable CID. The
//! [`Dispatcher`] fetches the source, writes it to a scratch file, and hands
//! a [`ProcessSpec`] to a [`ProcessRunner`]:
//!
//! - chained input goes to the child's standard input
//! - an adjacent literal parameter becomes the first positional argument
//! - standard output is the result; a non-zero exit is an error carrying
//!   standard error
//! - every run has a deadline and honours a [`CancelToken`]
//!
//! Which interpreter runs which [`Language`] is a static table
//! ([`RuntimeTable`]); adding a language means adding one entry there.
//!
//! ```rust,ignore
//! use cidchain_exec::{CancelToken, Dispatcher, Language, Target};
//!
//! let dispatcher = Dispatcher::new(store.clone());
//! let target = Target::server("shout", Language::Python, source_cid);
//! let output = dispatcher.run(&target, Some(b"hi"), None, &CancelToken::new())?;
//! ```

mod cancel;
mod detect;
mod dispatcher;
mod error;
mod invocation;
mod language;
mod runner;

pub use cancel::CancelToken;
pub use detect::Detector;
pub use dispatcher::{Dispatcher, Target, DEFAULT_TIMEOUT};
pub use error::ExecError;
pub use invocation::{Invocation, RuntimeTable};
pub use language::Language;
pub use runner::{CommandRunner, ProcessOutput, ProcessRunner, ProcessSpec};

#[cfg(any(test, feature = "test-utils"))]
pub use runner::mock;
