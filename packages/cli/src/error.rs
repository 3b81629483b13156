//! Errors surfaced by the `cidchain` binary.

use std::path::PathBuf;

use thiserror::Error;

use cidchain_pipeline::ErrorKind;
use cidchain_store::{CidError, StoreError};

use crate::config::ConfigError;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to read {}: {source}", .path.display())]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid cid: {0}")]
    InvalidCid(#[from] CidError),

    #[error(transparent)]
    Store(#[from] StoreError),

    /// The pipeline failed; `kind` is the error category.
    #[error("{}: {message}", .kind.as_str())]
    Resolution { kind: ErrorKind, message: String },

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CliError>;
