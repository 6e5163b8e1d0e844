//! Error types for memstream-pack

use thiserror::Error;

/// Result type alias using our Error
pub type Result<T> = std::result::Result<T, Error>;

/// Packing and URL-codec error type
#[derive(Error, Debug)]
pub enum Error {
    /// A serialized form exceeded its hard length budget
    #[error("Budget exceeded: {0}")]
    Budget(String),

    /// A token or URL could not be decoded
    #[error("Decode error: {0}")]
    Decode(String),

    /// JSON parsing error (serde_json)
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a budget error
    pub fn budget(msg: impl Into<String>) -> Self {
        Error::Budget(msg.into())
    }

    /// Create a decode error
    pub fn decode(msg: impl Into<String>) -> Self {
        Error::Decode(msg.into())
    }
}
