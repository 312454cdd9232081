//! Error types for gaswatch

use thiserror::Error;

/// Result type alias using gaswatch's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for gaswatch operations
#[derive(Error, Debug)]
pub enum Error {
    /// The external price could not be retrieved
    #[error("Retrieval error: {0}")]
    Retrieval(#[from] RetrievalError),

    /// A notification could not be delivered
    #[error("Notification error: {0}")]
    Notification(#[from] NotificationError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Whether this error came from the price fetch
    pub fn is_retrieval(&self) -> bool {
        matches!(self, Self::Retrieval(_))
    }
}

impl From<::config::ConfigError> for Error {
    fn from(err: ::config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

/// Failure to obtain a price from the external source
#[derive(Error, Debug)]
pub enum RetrievalError {
    /// Transport failure (DNS, connect, timeout, body read)
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The endpoint answered with a non-success status
    #[error("source returned HTTP {status}: {body}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body, as text
        body: String,
    },

    /// The API answered but reported a failure
    #[error("source reported failure: {message} ({detail})")]
    Api {
        /// The `message` field of the response
        message: String,
        /// The `result` field, which carries the reason
        detail: String,
    },

    /// The response could not be interpreted
    #[error("malformed response: {0}")]
    Malformed(String),
}

impl RetrievalError {
    /// Create a malformed-response error
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::Malformed(msg.into())
    }
}

/// Notification errors
#[derive(Debug, Error)]
pub enum NotificationError {
    /// The request never got an answer
    #[error("HTTP error: {0}")]
    HttpError(String),

    /// The channel answered with a failure
    #[error("Rejected by {channel}: {reason}")]
    Rejected {
        /// Channel name
        channel: String,
        /// Description returned by the channel
        reason: String,
    },

    /// The channel is not usable as configured
    #[error("Configuration error: {0}")]
    ConfigError(String),
}
