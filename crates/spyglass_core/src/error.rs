//! Spyglass error types

use thiserror::Error;

/// Errors raised by the spy engine and its host bindings
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SpyError {
    /// A ratio specification did not match `-?<digits>[%]`
    #[error("Malformed ratio specification: {0:?}")]
    MalformedRatio(String),

    /// The host failed to measure an element or a scroll context
    #[error("Measurement failed: {0}")]
    Measurement(String),

    /// The host does not know the requested scroll context
    #[error("Unknown scroll context: {0}")]
    UnknownContext(String),

    /// The engine has already been torn down
    #[error("Spy engine has been destroyed")]
    Destroyed,
}

/// Result type for spy operations
pub type Result<T> = std::result::Result<T, SpyError>;
