//! Scripted version control for testing.

use crate::error::{ErrorKind, Result};
use crate::{AheadBehind, CommitOutcome, PullOutcome, PushOutcome, StatusEntry, VersionControl};
use async_trait::async_trait;
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct State {
    branch: Option<String>,
    /// Paths changed in the working tree.
    changes: Vec<String>,
    staged: Vec<String>,
    /// `None` means no upstream tracking reference.
    upstream: Option<AheadBehind>,
    commits: Vec<String>,
    pushes: usize,
    fail_stage: bool,
    fail_commit: Option<String>,
    fail_push: Option<String>,
    calls: Vec<&'static str>,
}

/// In-memory [`VersionControl`] that behaves like a tiny repository.
///
/// Staging moves working-tree changes to the index, a commit consumes the
/// index and puts the branch one commit ahead of its upstream, and a push
/// brings it level again. Failures can be scripted per operation.
///
/// ```
/// use quire_vcs::{CommitOutcome, MockVcs, VersionControl};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let vcs = MockVcs::new().with_upstream(0, 0);
/// vcs.stage_all().await.unwrap();
/// assert_eq!(vcs.commit("empty").await, CommitOutcome::NothingToCommit);
/// # }
/// ```
#[derive(Debug)]
pub struct MockVcs {
    state: RwLock<State>,
}

impl Default for MockVcs {
    fn default() -> Self {
        Self::new()
    }
}

impl MockVcs {
    /// A clean repository on `main` with no upstream.
    pub fn new() -> Self {
        Self { state: RwLock::new(State { branch: Some("main".to_string()), ..State::default() }) }
    }

    pub fn with_upstream(mut self, ahead: u32, behind: u32) -> Self {
        self.state.get_mut().upstream = Some(AheadBehind { ahead, behind });
        self
    }

    pub fn with_changes(mut self, paths: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.state.get_mut().changes.extend(paths.into_iter().map(Into::into));
        self
    }

    pub fn failing_stage(mut self) -> Self {
        self.state.get_mut().fail_stage = true;
        self
    }

    pub fn failing_commit(mut self, reason: impl Into<String>) -> Self {
        self.state.get_mut().fail_commit = Some(reason.into());
        self
    }

    pub fn failing_push(mut self, reason: impl Into<String>) -> Self {
        self.state.get_mut().fail_push = Some(reason.into());
        self
    }

    /// Record a working-tree change after construction.
    pub async fn touch(&self, path: impl Into<String>) {
        self.state.write().await.changes.push(path.into());
    }

    /// Messages of the commits made so far.
    pub async fn commits(&self) -> Vec<String> {
        self.state.read().await.commits.clone()
    }

    pub async fn pushes(&self) -> usize {
        self.state.read().await.pushes
    }

    /// Names of the trait methods called, in order.
    pub async fn calls(&self) -> Vec<&'static str> {
        self.state.read().await.calls.clone()
    }
}

#[async_trait]
impl VersionControl for MockVcs {
    async fn status(&self) -> Result<Vec<StatusEntry>> {
        let mut state = self.state.write().await;
        state.calls.push("status");
        let staged = state.staged.iter().map(|p| StatusEntry::new("M ", p.clone()));
        let changed = state.changes.iter().map(|p| StatusEntry::new(" M", p.clone()));
        Ok(staged.chain(changed).collect())
    }

    async fn current_branch(&self) -> Result<Option<String>> {
        let mut state = self.state.write().await;
        state.calls.push("current_branch");
        Ok(state.branch.clone())
    }

    async fn stage_all(&self) -> Result<()> {
        let mut state = self.state.write().await;
        state.calls.push("stage_all");
        if state.fail_stage {
            exn::bail!(ErrorKind::Command { command: "add --all".to_string(), message: "index.lock exists".to_string() });
        }
        let changes = std::mem::take(&mut state.changes);
        state.staged.extend(changes);
        Ok(())
    }

    async fn commit(&self, message: &str) -> CommitOutcome {
        let mut state = self.state.write().await;
        state.calls.push("commit");
        if let Some(reason) = &state.fail_commit {
            return CommitOutcome::Failed(reason.clone());
        }
        if state.staged.is_empty() {
            return CommitOutcome::NothingToCommit;
        }
        state.staged.clear();
        state.commits.push(message.to_string());
        if let Some(upstream) = state.upstream.as_mut() {
            upstream.ahead += 1;
        }
        CommitOutcome::Committed
    }

    async fn push(&self) -> PushOutcome {
        let mut state = self.state.write().await;
        state.calls.push("push");
        if let Some(reason) = &state.fail_push {
            return PushOutcome::Failed(reason.clone());
        }
        state.pushes += 1;
        let upstream = state.upstream.get_or_insert_default();
        upstream.ahead = 0;
        PushOutcome::Pushed
    }

    async fn fetch(&self) -> Result<()> {
        self.state.write().await.calls.push("fetch");
        Ok(())
    }

    async fn pull_ff_only(&self) -> PullOutcome {
        let mut state = self.state.write().await;
        state.calls.push("pull_ff_only");
        match state.upstream.as_mut() {
            None => PullOutcome::Failed("There is no tracking information for the current branch.".to_string()),
            Some(AheadBehind { behind: 0, .. }) => PullOutcome::UpToDate,
            Some(upstream) if upstream.ahead > 0 => PullOutcome::Failed("Not possible to fast-forward, aborting.".to_string()),
            Some(upstream) => {
                upstream.behind = 0;
                PullOutcome::FastForwarded
            },
        }
    }

    async fn ahead_behind(&self) -> Result<Option<AheadBehind>> {
        let mut state = self.state.write().await;
        state.calls.push("ahead_behind");
        Ok(state.upstream)
    }
}
