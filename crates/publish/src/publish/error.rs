//! Error types for the [`publish`](super) module.

use derive_more::{Display, Error};

/// A publish error with automatic location tracking via [`exn::Exn`].
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for publish operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The stage that could not run at all.
///
/// Failures inside a stage (one upload, one commit) are reported in the
/// [`PublishOutcome`](super::PublishOutcome) instead.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    #[display("media sync stage could not run")]
    Sync,
    #[display("rewrite stage could not run")]
    Rewrite,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        false
    }
}
