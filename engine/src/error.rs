//! Error types for the Tradewire engine.

use thiserror::Error;

/// All possible errors from the feed engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    #[error("invalid cursor: {0}")]
    InvalidCursor(String),
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;
