//! Error types for memstream-thread

use thiserror::Error;

/// Result type alias using our Error
pub type Result<T> = std::result::Result<T, Error>;

/// Thread resolution error type
#[derive(Error, Debug)]
pub enum Error {
    /// A URL or reference could not be decoded
    #[error("Decode error: {0}")]
    Decode(String),

    /// A caller-supplied payload fetch failed
    #[error("Fetch error: {0}")]
    Fetch(String),

    /// The caller cancelled an in-flight fetch
    #[error("Fetch cancelled")]
    Cancelled,

    /// JSON parsing error (serde_json)
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a decode error
    pub fn decode(msg: impl Into<String>) -> Self {
        Error::Decode(msg.into())
    }

    /// Create a fetch error
    pub fn fetch(msg: impl Into<String>) -> Self {
        Error::Fetch(msg.into())
    }
}
