//! Error types for the [`rewrite`](super) module.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A rewrite error with automatic location tracking via [`exn::Exn`].
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for rewrite operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The content corpus could not be enumerated.
    #[display("could not walk the content corpus")]
    Scan,
    #[display("could not read document {}", _0.display())]
    Read(#[error(not(source))] PathBuf),
    /// A rewritten document could not be saved; earlier documents may
    /// already have been rewritten.
    #[display("could not write document {}", _0.display())]
    Write(#[error(not(source))] PathBuf),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Write(_))
    }
}
