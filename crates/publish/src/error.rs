//! Publish Error Types
//!
//! Only structural failures end up here: a corpus that cannot be listed, a
//! cache that cannot be written, a store that cannot be built. Per-file
//! problems (a missing media file, a rejected upload) and version control
//! failures are part of the results the pipeline returns.

use derive_more::{Display, Error};

/// A publish pipeline error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for publish pipeline operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The pipeline could not be built from configuration.
    #[display("invalid configuration")]
    Config,
    /// The configured asset provider was not compiled into this build.
    #[display("asset provider `{_0}` is not available in this build")]
    ProviderUnavailable(#[error(not(source))] &'static str),
    /// The content corpus could not be enumerated or read.
    #[display("could not read the content corpus")]
    Scan,
    #[display("media sync failed")]
    Sync,
    #[display("reference rewrite failed")]
    Rewrite,
    #[display("publish failed")]
    Publish,
    /// No repository could be opened for the content root.
    #[display("version control unavailable: {_0}")]
    VcsUnavailable(#[error(not(source))] String),
    /// A version control query (not a commit or push) failed.
    #[display("version control query failed")]
    Vcs,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        false
    }
}
