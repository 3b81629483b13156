//! Error types for execution dispatch.

use std::time::Duration;

use thiserror::Error;

use cidchain_store::StoreError;

use crate::Language;

/// Errors raised while running an executable segment.
#[derive(Debug, Error)]
pub enum ExecError {
    /// The program exited unsuccessfully.
    #[error("{language} program exited with {}: {stderr}", describe_status(.status))]
    Failed {
        language: Language,
        status: Option<i32>,
        stderr: String,
    },

    /// The program ran past its deadline and was killed.
    #[error("{program} timed out after {}ms", millis(.after))]
    Timeout { program: String, after: Duration },

    /// Execution was cancelled by the caller; the child was killed.
    #[error("execution cancelled")]
    Cancelled,

    /// The interpreter could not be started.
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// No runtime is configured for the language.
    #[error("no runtime configured for {0}")]
    UnknownLanguage(Language),

    /// Scratch file or pipe I/O failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The program's source could not be fetched.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

fn describe_status(status: &Option<i32>) -> String {
    match status {
        Some(code) => format!("status {}", code),
        None => "a signal".to_string(),
    }
}

fn millis(duration: &Duration) -> u128 {
    duration.as_millis()
}

/// Result type alias for dispatch operations.
pub type Result<T> = std::result::Result<T, ExecError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_display_includes_stderr() {
        let e = ExecError::Failed {
            language: Language::Python,
            status: Some(2),
            stderr: "Traceback: boom".to_string(),
        };
        let display = e.to_string();
        assert!(display.contains("python"));
        assert!(display.contains("status 2"));
        assert!(display.contains("boom"));
    }

    #[test]
    fn killed_by_signal() {
        let e = ExecError::Failed {
            language: Language::Bash,
            status: None,
            stderr: String::new(),
        };
        assert!(e.to_string().contains("a signal"));
    }

    #[test]
    fn timeout_display() {
        let e = ExecError::Timeout {
            program: "bash".to_string(),
            after: Duration::from_millis(250),
        };
        assert_eq!(e.to_string(), "bash timed out after 250ms");
    }
}
