use thiserror::Error;

/// Common error type for AgroSight components.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid series key: {0}")]
    SeriesKey(String),

    #[error("Invalid timestamp: {0}")]
    Timestamp(String),
}

impl From<json5::Error> for Error {
    fn from(e: json5::Error) -> Self {
        Error::Config(format!("Failed to parse config: {}", e))
    }
}

/// Result type alias using AgroSight's Error.
pub type Result<T> = std::result::Result<T, Error>;
