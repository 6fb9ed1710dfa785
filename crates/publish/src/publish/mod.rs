//! The publish coordinator: sync, then rewrite, then commit and push.
//!
//! Stages run strictly one after another. Problems inside a stage are part
//! of the outcome and never stop the next stage; only a stage that cannot
//! run at all (the corpus cannot be listed, the cache cannot be saved) ends
//! the publish early. A dry run stops before version control is touched.

pub mod error;

use self::error::{ErrorKind, Result};
use crate::Context;
use crate::error::{ErrorKind as PublishErrorKind, Result as PublishResult};
use crate::rewrite::RewriteResult;
use crate::sync::{SyncOptions, SyncResult};
use exn::ResultExt;
use quire_vcs::{CommitOutcome, PushOutcome, VersionControl};
use serde::Serialize;
use time::{Date, OffsetDateTime};
use tracing::instrument;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublishOptions {
    /// Commit message; [`default_message()`] for today when `None`.
    pub message: Option<String>,
    pub dry_run: bool,
}

/// How the version control stage ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum GitResult {
    /// Something was pushed.
    Success,
    /// Nothing new to commit and nothing waiting to be pushed.
    NoChanges,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublishOutcome {
    pub sync: SyncResult,
    pub rewrite: RewriteResult,
    /// `None` for a dry run.
    pub git_result: Option<GitResult>,
    pub git_error: Option<String>,
    /// Branch that was committed and pushed, when known.
    pub branch: Option<String>,
}

impl PublishOutcome {
    /// `true` when every stage fully succeeded (or had nothing to do).
    pub fn is_complete(&self) -> bool {
        self.sync.is_complete() && self.git_result != Some(GitResult::Error)
    }
}

/// `Publish content <YYYY-MM-DD>`.
///
/// ```
/// use time::macros::date;
/// assert_eq!(quire_publish::publish::default_message(date!(2026 - 03 - 04)), "Publish content 2026-03-04");
/// ```
pub fn default_message(date: Date) -> String {
    format!("Publish content {date}")
}

struct GitStage {
    result: GitResult,
    error: Option<String>,
    branch: Option<String>,
}

impl GitStage {
    fn failed(reason: impl Into<String>, branch: Option<String>) -> Self {
        Self { result: GitResult::Error, error: Some(reason.into()), branch }
    }
}

impl Context {
    /// Sync media, rewrite references, then commit and push the content.
    #[instrument(skip(self, options), fields(dry_run = options.dry_run))]
    pub async fn publish(&self, options: PublishOptions) -> PublishResult<PublishOutcome> {
        self.publish_inner(options).await.or_raise(|| PublishErrorKind::Publish)
    }

    async fn publish_inner(&self, options: PublishOptions) -> Result<PublishOutcome> {
        let sync = self
            .sync_media(SyncOptions { dry_run: options.dry_run, force: false })
            .await
            .or_raise(|| ErrorKind::Sync)?;
        let rewrite = self.rewrite_urls(options.dry_run).await.or_raise(|| ErrorKind::Rewrite)?;
        if options.dry_run {
            tracing::info!("Dry run: skipping commit and push");
            return Ok(PublishOutcome { sync, rewrite, git_result: None, git_error: None, branch: None });
        }

        let message = options.message.unwrap_or_else(|| default_message(OffsetDateTime::now_utc().date()));
        let stage = match self.vcs.get() {
            Ok(vcs) => commit_and_push(vcs.as_ref(), &message).await,
            Err(reason) => GitStage::failed(format!("version control unavailable: {reason}"), None),
        };
        Ok(PublishOutcome { sync, rewrite, git_result: Some(stage.result), git_error: stage.error, branch: stage.branch })
    }
}

#[instrument(skip_all)]
async fn commit_and_push(vcs: &(dyn VersionControl + Send + Sync), message: &str) -> GitStage {
    let branch = match vcs.current_branch().await {
        Ok(branch) => branch,
        Err(e) => {
            let reason: &quire_vcs::error::ErrorKind = &e;
            tracing::debug!(%reason, "Could not determine the current branch");
            None
        },
    };
    if let Err(e) = vcs.stage_all().await {
        let reason = (*e).to_string();
        tracing::warn!(%reason, "Staging failed");
        return GitStage::failed(reason, branch);
    }

    match vcs.commit(message).await {
        CommitOutcome::Committed => tracing::info!(commit_message = message, "Committed"),
        CommitOutcome::NothingToCommit => {
            let ahead = match vcs.ahead_behind().await {
                Ok(counts) => counts.map_or(0, |c| c.ahead),
                Err(e) => {
                    let reason: &quire_vcs::error::ErrorKind = &e;
                    tracing::debug!(%reason, "Could not compare with upstream");
                    0
                },
            };
            if ahead == 0 {
                tracing::info!("Nothing to commit or push");
                return GitStage { result: GitResult::NoChanges, error: None, branch };
            }
            tracing::info!(ahead, "Nothing to commit; pushing earlier commits");
        },
        CommitOutcome::Failed(reason) => {
            tracing::warn!(%reason, "Commit failed");
            return GitStage::failed(reason, branch);
        },
    }

    match vcs.push().await {
        PushOutcome::Pushed => {
            tracing::info!(branch = ?branch, "Pushed");
            GitStage { result: GitResult::Success, error: None, branch }
        },
        PushOutcome::Failed(reason) => {
            tracing::warn!(%reason, "Push failed");
            GitStage::failed(reason, branch)
        },
    }
}
