//! Error types for the [`sync`](super) module.

use derive_more::{Display, Error};

/// A sync error with automatic location tracking via [`exn::Exn`].
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for sync operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Structural failures only; per-reference failures live in
/// [`SyncResult::errors`](super::SyncResult::errors).
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The content corpus could not be scanned.
    #[display("could not scan content for media references")]
    Scan,
    /// The updated cache could not be persisted.
    #[display("could not save the upload cache")]
    CacheSave,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::CacheSave)
    }
}
