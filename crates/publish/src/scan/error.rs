//! Error types for the [`scan`](super) module.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A scan error with automatic location tracking via [`exn::Exn`].
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for scan operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Every scan error is a corpus-access error: the operation cannot continue.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// A category directory exists but could not be walked.
    #[display("could not list category `{_0}`")]
    List(#[error(not(source))] String),
    #[display("could not read document {}", _0.display())]
    Read(#[error(not(source))] PathBuf),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        false
    }
}
