//! Error taxonomy for pipeline resolution.

use http::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use cidchain_exec::ExecError;
use cidchain_store::{Cid, StoreError};

/// Coarse error category, as reported to callers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    ChainMisuse,
    ChainRejected,
    ExecutionError,
    ExecutionTimeout,
    Cancelled,
    EmptyPipeline,
    StoreFailure,
}

impl ErrorKind {
    /// HTTP status for a response carrying this kind of error.
    pub fn status_code(self) -> StatusCode {
        match self {
            ErrorKind::NotFound | ErrorKind::EmptyPipeline => StatusCode::NOT_FOUND,
            ErrorKind::ChainMisuse | ErrorKind::ChainRejected => StatusCode::BAD_REQUEST,
            ErrorKind::ExecutionError | ErrorKind::StoreFailure => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ErrorKind::ExecutionTimeout => StatusCode::GATEWAY_TIMEOUT,
            // 499: client closed request
            ErrorKind::Cancelled => {
                StatusCode::from_u16(499).unwrap_or(StatusCode::SERVICE_UNAVAILABLE)
            }
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::ChainMisuse => "chain_misuse",
            ErrorKind::ChainRejected => "chain_rejected",
            ErrorKind::ExecutionError => "execution_error",
            ErrorKind::ExecutionTimeout => "execution_timeout",
            ErrorKind::Cancelled => "cancelled",
            ErrorKind::EmptyPipeline => "empty_pipeline",
            ErrorKind::StoreFailure => "store_failure",
        }
    }
}

/// Errors raised while resolving a pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The path had no segments.
    #[error("empty pipeline")]
    EmptyPipeline,

    /// Content for a CID segment is not in the store.
    #[error("content not found for cid {cid}")]
    NotFound { cid: Cid },

    /// A server segment names a server the registry no longer knows.
    #[error("server '{name}' not found")]
    UnknownServer { name: String },

    /// Chained output was handed to a segment that cannot take it.
    #[error("segment {index}: {message}")]
    ChainMisuse { index: usize, message: String },

    /// A terminal server appeared in a multi-segment pipeline.
    #[error("server '{name}' cannot be used in a server chain")]
    ChainRejected { name: String },

    /// Running an executable segment failed.
    #[error("segment {index}: {source}")]
    Execution {
        index: usize,
        #[source]
        source: ExecError,
    },

    /// Resolution was cancelled before it finished.
    #[error("resolution cancelled")]
    Cancelled,

    /// The content store failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl PipelineError {
    pub(crate) fn execution(index: usize, source: ExecError) -> Self {
        match source {
            ExecError::Cancelled => PipelineError::Cancelled,
            ExecError::Store(StoreError::NotFound { cid }) => PipelineError::NotFound { cid },
            source => PipelineError::Execution { index, source },
        }
    }

    pub(crate) fn store(error: StoreError) -> Self {
        match error {
            StoreError::NotFound { cid } => PipelineError::NotFound { cid },
            error => PipelineError::Store(error),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::EmptyPipeline => ErrorKind::EmptyPipeline,
            PipelineError::NotFound { .. } | PipelineError::UnknownServer { .. } => {
                ErrorKind::NotFound
            }
            PipelineError::ChainMisuse { .. } => ErrorKind::ChainMisuse,
            PipelineError::ChainRejected { .. } => ErrorKind::ChainRejected,
            PipelineError::Execution { source, .. } => match source {
                ExecError::Timeout { .. } => ErrorKind::ExecutionTimeout,
                ExecError::Cancelled => ErrorKind::Cancelled,
                ExecError::Store(StoreError::NotFound { .. }) => ErrorKind::NotFound,
                _ => ErrorKind::ExecutionError,
            },
            PipelineError::Cancelled => ErrorKind::Cancelled,
            PipelineError::Store(StoreError::NotFound { .. }) => ErrorKind::NotFound,
            PipelineError::Store(_) => ErrorKind::StoreFailure,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        self.kind().status_code()
    }
}

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;
    use cidchain_exec::Language;
    use std::time::Duration;

    #[test]
    fn status_mapping() {
        assert_eq!(ErrorKind::NotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(ErrorKind::ChainMisuse.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ErrorKind::ChainRejected.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ErrorKind::ExecutionError.status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ErrorKind::ExecutionTimeout.status_code(),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(ErrorKind::Cancelled.status_code().as_u16(), 499);
        assert_eq!(ErrorKind::EmptyPipeline.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn rejection_message() {
        let e = PipelineError::ChainRejected {
            name: "terminal-server".to_string(),
        };
        assert!(e.to_string().contains("cannot be used in a server chain"));
        assert_eq!(e.kind(), ErrorKind::ChainRejected);
    }

    #[test]
    fn execution_kinds() {
        let timeout = PipelineError::execution(
            0,
            ExecError::Timeout {
                program: "bash".to_string(),
                after: Duration::from_secs(1),
            },
        );
        assert_eq!(timeout.kind(), ErrorKind::ExecutionTimeout);

        let failed = PipelineError::execution(
            2,
            ExecError::Failed {
                language: Language::Bash,
                status: Some(1),
                stderr: "oops".to_string(),
            },
        );
        assert_eq!(failed.kind(), ErrorKind::ExecutionError);
        assert!(failed.to_string().starts_with("segment 2:"));

        let cancelled = PipelineError::execution(0, ExecError::Cancelled);
        assert!(matches!(cancelled, PipelineError::Cancelled));
    }

    #[test]
    fn missing_source_is_not_found() {
        let cid = Cid::for_content(&[1u8; 80]);
        let e = PipelineError::execution(
            0,
            ExecError::Store(StoreError::NotFound { cid: cid.clone() }),
        );
        assert_eq!(e.kind(), ErrorKind::NotFound);
        assert!(e.to_string().contains(cid.as_str()));
    }

    #[test]
    fn kind_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&ErrorKind::ExecutionTimeout).unwrap(),
            "\"execution_timeout\""
        );
        assert_eq!(ErrorKind::ChainRejected.as_str(), "chain_rejected");
    }
}
