//! Cache Error Types
//!
//! Structured errors using `exn` for automatic location tracking and error
//! tree construction.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A cache error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for cache operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// Reading never produces these (an unreadable cache is an empty cache);
/// only persisting can fail.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The cache file (or its directory) could not be written.
    #[display("cannot write cache file: {}", _0.display())]
    Write(#[error(not(source))] PathBuf),
    /// An entry could not be converted to its persisted form.
    #[display("invalid cache data: {_0}")]
    InvalidData(#[error(not(source))] &'static str),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Write(_))
    }
}
