use serde::Serialize;

/// One line of porcelain status: two-letter `XY` code plus path.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct StatusEntry {
    pub code: String,
    pub path: String,
}
impl StatusEntry {
    pub fn new(code: impl Into<String>, path: impl Into<String>) -> Self {
        Self { code: code.into(), path: path.into() }
    }

    pub fn is_untracked(&self) -> bool {
        self.code == "??"
    }
}

/// Commit counts relative to the upstream tracking reference.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct AheadBehind {
    pub ahead: u32,
    pub behind: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "reason", rename_all = "snake_case")]
pub enum CommitOutcome {
    Committed,
    /// Nothing was staged; not a failure.
    NothingToCommit,
    Failed(String),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "reason", rename_all = "snake_case")]
pub enum PushOutcome {
    Pushed,
    Failed(String),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "reason", rename_all = "snake_case")]
pub enum PullOutcome {
    UpToDate,
    FastForwarded,
    Failed(String),
}

/// Snapshot of the working tree, for display.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RepositoryStatus {
    /// `None` on a detached HEAD.
    pub branch: Option<String>,
    pub entries: Vec<StatusEntry>,
    /// `None` when the branch has no upstream.
    pub ahead_behind: Option<AheadBehind>,
}
impl RepositoryStatus {
    pub fn is_clean(&self) -> bool {
        self.entries.is_empty()
    }
}
