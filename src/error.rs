//! Error types for the extraction run.
//!
//! Errors are classified by recoverability:
//! - Retryable: oracle timeouts, rate limits, transport failures
//! - NonRetryable: malformed configuration, empty input
//!
//! Per-contact failures never abort the batch — the engine logs the
//! contact identity and continues with the rest.

use thiserror::Error;

/// Errors surfaced by the relationship engine.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("No messages for contact {0}")]
    EmptyContact(String),

    #[error("Oracle error: {0}")]
    Oracle(#[from] crate::oracle::OracleError),

    #[error("Contact task failed: {0}")]
    TaskFailed(String),

    #[error("IO error: {0}")]
    Io(String),

    #[error("JSON error: {0}")]
    Json(String),
}

impl EngineError {
    /// Returns true if retrying the same operation could succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            EngineError::Oracle(e) => e.is_retryable(),
            _ => false,
        }
    }
}

impl From<std::io::Error> for EngineError {
    fn from(err: std::io::Error) -> Self {
        EngineError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        EngineError::Json(err.to_string())
    }
}
