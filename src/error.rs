use std::io;

use thiserror::Error;

/// Unified error type for order keys, the ordered list and its journal.
#[derive(Debug, Error)]
pub enum Error {
    /// A key is not well-formed, bounds are out of order, or a list
    /// operation was called with arguments that can never succeed.
    /// Retrying with the same inputs yields the same error.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// Item id is not in the list.
    #[error("item not found")]
    NotFound,
    /// Journal data failed to decode or replay (CRC mismatch, bad format, etc).
    #[error("corruption: {0}")]
    Corruption(String),
    /// A journal write failed and could not be undone. The store must be
    /// reopened before it accepts more mutations.
    #[error("journal writer poisoned by an earlier failed write")]
    Poisoned,
    /// IO error from journal file operations.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Error::InvalidArgument(msg.into())
    }

    /// Whether this is the generator's `InvalidArgument` error.
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, Error::InvalidArgument(_))
    }
}

/// Result type alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
