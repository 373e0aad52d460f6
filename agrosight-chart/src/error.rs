//! Error types for the chart core.

use thiserror::Error;

/// Result type alias using [`ChartError`].
pub type Result<T> = std::result::Result<T, ChartError>;

/// Errors raised by the chart core and its collaborators.
#[derive(Error, Debug)]
pub enum ChartError {
    /// Key-value store failure.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization error.
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ChartError {
    /// Create a storage error.
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }
}
