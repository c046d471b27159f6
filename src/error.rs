//! Domain-specific error types for inspect-pipeline

use thiserror::Error;

/// Main error type for the inspection and diagnosis pipelines
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Transport or HTTP-level failure talking to the completion service.
    #[error("Completion service error: {message}")]
    Completion { message: String },

    #[error("Timeout error: {operation} timed out after {timeout_ms}ms")]
    Timeout { operation: String, timeout_ms: u64 },

    #[error("Serialization error: {message}")]
    Serialization { message: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Notification error: {message}")]
    Notification { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl PipelineError {
    /// Short stable label used in HTTP error bodies and logs
    pub fn label(&self) -> &'static str {
        match self {
            PipelineError::Config { .. } => "config",
            PipelineError::Completion { .. } => "completion",
            PipelineError::Timeout { .. } => "timeout",
            PipelineError::Serialization { .. } => "serialization",
            PipelineError::Validation { .. } => "validation",
            PipelineError::Notification { .. } => "notification",
            PipelineError::Internal { .. } => "internal",
        }
    }
}

impl From<anyhow::Error> for PipelineError {
    fn from(err: anyhow::Error) -> Self {
        PipelineError::Internal {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for PipelineError {
    fn from(err: serde_json::Error) -> Self {
        PipelineError::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<reqwest::Error> for PipelineError {
    fn from(err: reqwest::Error) -> Self {
        PipelineError::Completion {
            message: format!("HTTP request failed: {}", err),
        }
    }
}

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;
