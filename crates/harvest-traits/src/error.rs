//! Error types for collaborator operations.

use thiserror::Error;

/// Common error type for collaborator queries.
#[derive(Debug, Clone, Error)]
pub enum TraitError {
    /// Connection to the upstream (node, API) is missing or failed
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// The contract call reverted or the method does not exist
    #[error("call reverted: {0}")]
    CallReverted(String),

    /// Requested resource not found
    #[error("not found: {0}")]
    NotFound(String),

    /// Source not available
    #[error("source not available: {0}")]
    SourceNotAvailable(String),

    /// Returned value has an unexpected shape
    #[error("unexpected value: {0}")]
    UnexpectedValue(String),

    /// Operation timed out
    #[error("timeout")]
    Timeout,

    /// Parse/deserialization error
    #[error("parse error: {0}")]
    ParseError(String),

    /// IO error
    #[error("IO error: {0}")]
    IoError(String),
}

impl From<std::io::Error> for TraitError {
    fn from(e: std::io::Error) -> Self {
        TraitError::IoError(e.to_string())
    }
}
