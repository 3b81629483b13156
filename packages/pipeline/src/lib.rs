//! # cidchain-pipeline
//!
//! Resolves request paths into pipelines of servers, content references and
//! literal parameters.
//!
//! ```text
//! /shout/grep/ap/AAAAAAAUYXBwbGUKYmFuYW5hCmFwcmljb3Q
//!  ^^^^^ ^^^^ ^^ ^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^
//!  |     |    |  CID (literal content)
//!  |     |    parameter, bound to grep
//!  server server
//! ```
//!
//! Tokens are classified by [`classify`]: a registered server name first,
//! then a CID (optionally with `.ext`), otherwise a literal parameter. The
//! [`Resolver`] folds the segments from right to left, running executables
//! through a [`Dispatcher`](cidchain_exec::Dispatcher). Results larger than
//! the embedding limit are written back to the content store and reported as
//! a redirect to their CID.
//!
//! In debug mode ([`Request::debug`]) the resolver records a
//! [`PipelineTrace`] instead and keeps going past failing segments.

mod debug;
mod error;
mod registry;
mod request;
mod resolver;
mod response;
mod segment;

pub use debug::{render_output, PipelineTrace, ResolutionType, TraceEntry, OUTPUT_PREVIEW_CHARS};
pub use error::{ErrorKind, PipelineError, Result};
pub use registry::{InMemoryRegistry, ServerDefinition, ServerRegistry};
pub use request::Request;
pub use resolver::{Mode, Output, Resolution, Resolver};
pub use response::Response;
pub use segment::{classify, parse_segments, percent_decode, split_path, Segment};
