//! Error types for the orinoco filter pipeline.

use thiserror::Error;

/// Primary error type for stream filter operations.
#[derive(Error, Debug)]
pub enum StreamError {
    #[error("allocation failure: {0}")]
    AllocationFailure(&'static str),

    #[error("{filter}: malformed input at byte {offset}: {msg}")]
    MalformedInput {
        filter: &'static str,
        offset: u64,
        msg: String,
    },

    #[error("{filter}: input ended inside an incomplete group")]
    PrematureEnd { filter: &'static str },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<std::collections::TryReserveError> for StreamError {
    fn from(_: std::collections::TryReserveError) -> Self {
        StreamError::AllocationFailure("buffer growth")
    }
}

/// Convenience Result type alias for StreamError.
pub type Result<T> = std::result::Result<T, StreamError>;
