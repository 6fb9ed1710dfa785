//! Error types for the [`upload`](super) module.
//!
//! All three are per-file failures: the sync orchestrator records them and
//! moves on to the next reference.

use derive_more::{Display, Error};

/// An upload error with automatic location tracking via [`exn::Exn`].
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for upload operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The referenced file is not in the media library.
    #[display("media file not found: {_0}")]
    MissingFile(#[error(not(source))] String),
    /// The file exists but could not be read.
    #[display("could not read media file: {_0}")]
    Storage(#[error(not(source))] String),
    /// The asset store rejected the upload or could not be reached.
    #[display("upload failed for {path}: {reason}")]
    Upload {
        #[error(not(source))]
        path: String,
        #[error(not(source))]
        reason: String,
    },
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Upload { .. })
    }
}
