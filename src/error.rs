//! Error types for filegate.

use thiserror::Error;

/// Common error type for filegate.
#[derive(Error, Debug)]
pub enum FilegateError {
    /// Blob storage failure (write, read or delete of raw bytes).
    #[error("storage error: {0}")]
    Storage(String),

    /// Metadata registry failure.
    ///
    /// Errors from sqlx are converted into this variant automatically.
    #[error("persistence error: {0}")]
    Persistence(String),

    /// Content extraction failure.
    #[error("processing error: {0}")]
    Processing(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Authentication error.
    #[error("authentication error: {0}")]
    Auth(String),

    /// Validation error for user input.
    #[error("validation error: {0}")]
    Validation(String),

    /// Resource not found.
    #[error("{0} not found")]
    NotFound(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl From<sqlx::Error> for FilegateError {
    fn from(e: sqlx::Error) -> Self {
        FilegateError::Persistence(e.to_string())
    }
}

impl From<serde_json::Error> for FilegateError {
    fn from(e: serde_json::Error) -> Self {
        FilegateError::Persistence(format!("malformed JSON column: {e}"))
    }
}

/// Result type alias for filegate operations.
pub type Result<T> = std::result::Result<T, FilegateError>;
