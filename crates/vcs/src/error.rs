//! Version Control Error Types
//!
//! Structured errors using `exn` for automatic location tracking and error
//! tree construction. Expected negative answers ("nothing to commit", a
//! rejected push) are not errors; they are variants of the typed outcomes in
//! [`crate::models`].

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A version control error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for version control operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    #[display("git executable not detected on your system")]
    GitNotFound,
    #[display("not a git working tree: {}", _0.display())]
    NotARepository(#[error(not(source))] PathBuf),
    /// The command could not be started at all.
    #[display("could not run git")]
    Spawn,
    /// The command ran and exited unsuccessfully.
    #[display("`git {command}` failed: {message}")]
    Command {
        #[error(not(source))]
        command: String,
        #[error(not(source))]
        message: String,
    },
    /// The command succeeded but printed something we could not parse.
    #[display("unexpected output from `git {_0}`")]
    InvalidOutput(#[error(not(source))] String),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Spawn)
    }
}
