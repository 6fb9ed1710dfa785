//! Typed access to the content repository's version control.
//!
//! The publish pipeline only needs a handful of operations, and it needs to
//! tell benign answers ("nothing to commit", "already up to date") apart from
//! real failures without looking at command output. [`VersionControl`] gives
//! each operation an explicit outcome type; [`GitCli`] is the implementation
//! that shells out to `git` and does the output sniffing in one place.

pub mod error;
mod git;
#[cfg(feature = "mock")]
mod mock;
mod models;

pub use crate::git::GitCli;
#[cfg(feature = "mock")]
pub use crate::mock::MockVcs;
pub use crate::models::{AheadBehind, CommitOutcome, PullOutcome, PushOutcome, RepositoryStatus, StatusEntry};

use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

pub type VcsHandle = Arc<dyn VersionControl + Send + Sync>;

#[async_trait]
pub trait VersionControl: Send + Sync {
    /// Porcelain status of the working tree (empty when clean).
    async fn status(&self) -> Result<Vec<StatusEntry>>;

    /// Checked-out branch, `None` on a detached HEAD.
    async fn current_branch(&self) -> Result<Option<String>>;

    /// Stage every change in the working tree, including deletions and
    /// untracked files.
    async fn stage_all(&self) -> Result<()>;

    async fn commit(&self, message: &str) -> CommitOutcome;

    async fn push(&self) -> PushOutcome;

    async fn fetch(&self) -> Result<()>;

    /// Pull, refusing anything that is not a fast-forward.
    async fn pull_ff_only(&self) -> PullOutcome;

    /// `None` when the current branch has no upstream tracking reference.
    async fn ahead_behind(&self) -> Result<Option<AheadBehind>>;

    /// Branch, status and ahead/behind in one go.
    async fn repository_status(&self) -> Result<RepositoryStatus> {
        Ok(RepositoryStatus {
            branch: self.current_branch().await?,
            entries: self.status().await?,
            ahead_behind: self.ahead_behind().await?,
        })
    }
}
