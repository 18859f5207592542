//! Custom error types for the video analysis pipeline

use std::path::PathBuf;
use thiserror::Error;

use crate::core::models::FileState;

/// Video analysis errors
#[derive(Error, Debug)]
pub enum AnalysisError {
    /// Source video unreadable or staging copy unwritable
    #[error("IO error: {} - {source}", path.display())]
    Io {
        /// File being read or written
        path: PathBuf,
        /// Underlying OS error
        #[source]
        source: std::io::Error,
    },

    /// Network, transport or auth failure talking to the remote service
    #[error("Service error during {operation}: {}{message}", status.map(|s| format!("{} - ", s)).unwrap_or_default())]
    Service {
        /// `upload`, `get_status` or `generate`
        operation: &'static str,
        /// HTTP status, when a response arrived
        status: Option<u16>,
        /// Response body or transport error text
        message: String,
    },

    /// Remote service reported FAILED after processing
    #[error("Video processing failed: {name}")]
    RemoteProcessing {
        /// Remote file identifier
        name: String,
    },

    /// Unknown task or missing question
    #[error("Invalid task: {message}")]
    InvalidTask {
        /// What was wrong with the task
        message: String,
    },

    /// Remote service reported a state we do not understand, or moved
    /// the file backwards through its lifecycle
    #[error("Unexpected state {state} for remote file {name}")]
    UnexpectedState {
        /// Remote file identifier
        name: String,
        /// Offending state
        state: FileState,
    },

    /// Analysis attempted against a file that is not ACTIVE
    #[error("Remote file {name} is not ready for analysis (state: {state})")]
    FileNotReady {
        /// Remote file identifier
        name: String,
        /// State the file was in
        state: FileState,
    },

    /// Poll bound exhausted while the file was still processing
    #[error("Timed out waiting for {name} after {attempts} polls")]
    PollTimeout {
        /// Remote file identifier
        name: String,
        /// Status fetches issued before giving up
        attempts: u32,
    },

    /// Configuration error
    #[error("Configuration error: {message}")]
    ConfigError {
        /// What was missing or invalid
        message: String,
    },

    /// JSON error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// YAML error
    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),
}

impl AnalysisError {
    /// Wrap an IO failure with the path it concerns
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        AnalysisError::Io {
            path: path.into(),
            source,
        }
    }

    /// Wrap a transport failure for the named remote operation
    pub fn service(operation: &'static str, message: impl ToString) -> Self {
        AnalysisError::Service {
            operation,
            status: None,
            message: message.to_string(),
        }
    }

    /// Short machine-friendly kind, used in logs and CLI output
    pub fn kind(&self) -> &'static str {
        match self {
            AnalysisError::Io { .. } => "io",
            AnalysisError::Service { .. } => "service",
            AnalysisError::RemoteProcessing { .. } => "remote_processing",
            AnalysisError::InvalidTask { .. } => "invalid_task",
            AnalysisError::UnexpectedState { .. } => "unexpected_state",
            AnalysisError::FileNotReady { .. } => "file_not_ready",
            AnalysisError::PollTimeout { .. } => "poll_timeout",
            AnalysisError::ConfigError { .. } => "config",
            AnalysisError::JsonError(_) => "json",
            AnalysisError::YamlError(_) => "yaml",
        }
    }
}

/// Result type for analysis operations
pub type Result<T> = std::result::Result<T, AnalysisError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_error_message_includes_operation_and_status() {
        let err = AnalysisError::Service {
            operation: "get_status",
            status: Some(503),
            message: "unavailable".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Service error during get_status: 503 - unavailable"
        );

        let err = AnalysisError::service("upload", "connection reset");
        assert_eq!(err.to_string(), "Service error during upload: connection reset");
        assert_eq!(err.kind(), "service");
    }

    #[test]
    fn test_remote_processing_carries_name() {
        let err = AnalysisError::RemoteProcessing {
            name: "files/abc123".to_string(),
        };
        assert!(err.to_string().contains("files/abc123"));
    }
}
