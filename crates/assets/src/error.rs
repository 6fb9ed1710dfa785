//! Asset Store Error Types
//!
//! Structured errors using `exn` for automatic location tracking and error
//! tree construction.

use derive_more::{Display, Error};

/// An asset store error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for asset store operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The store could not be reached (DNS, TLS, timeouts, connection resets).
    #[display("network error: {_0}")]
    Network(#[error(not(source))] String),
    /// The store answered and refused the upload.
    #[display("upload rejected ({status}): {message}")]
    Rejected {
        status: u16,
        #[error(not(source))]
        message: String,
    },
    /// The store answered with something we could not understand.
    #[display("unexpected response from asset store")]
    InvalidResponse,
    /// The store is missing a setting it cannot work without.
    #[display("asset store misconfigured: {_0}")]
    Configuration(#[error(not(source))] &'static str),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(_) => true,
            Self::Rejected { status, .. } => *status == 429 || *status >= 500,
            Self::InvalidResponse | Self::Configuration(_) => false,
        }
    }
}
