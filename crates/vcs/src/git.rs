use crate::error::{ErrorKind, Result};
use crate::{AheadBehind, CommitOutcome, PullOutcome, PushOutcome, StatusEntry, VersionControl};
use async_trait::async_trait;
use exn::{OptionExt, ResultExt};
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::instrument;

/// Phrases git prints (with `LC_ALL=C`) when a commit had nothing staged.
const NOTHING_TO_COMMIT: &[&str] = &["nothing to commit", "nothing added to commit", "no changes added to commit"];

/// [`VersionControl`] backed by the `git` executable.
///
/// Every command runs inside the working tree with a C locale (so output can
/// be matched) and with terminal prompts disabled (so a missing credential
/// fails instead of hanging).
#[derive(Debug, Clone)]
pub struct GitCli {
    program: PathBuf,
    workdir: PathBuf,
    remote: Option<String>,
}

struct Output {
    success: bool,
    stdout: String,
    stderr: String,
}
impl Output {
    /// Best single-line description of why the command failed.
    fn reason(&self) -> String {
        let text = if self.stderr.trim().is_empty() { &self.stdout } else { &self.stderr };
        text.trim().lines().last().unwrap_or("unknown failure").trim().to_string()
    }
}

impl GitCli {
    /// Find `git` on the `PATH` and check that `workdir` is inside a working tree.
    pub fn discover(workdir: impl Into<PathBuf>) -> Result<Self> {
        let workdir = workdir.into();
        let Ok(program) = which::which("git") else {
            tracing::info!("git executable not found in PATH");
            exn::bail!(ErrorKind::GitNotFound);
        };
        let inside = std::process::Command::new(&program)
            .arg("-C")
            .arg(&workdir)
            .args(["rev-parse", "--is-inside-work-tree"])
            .output()
            .is_ok_and(|o| o.status.success());
        if !inside {
            exn::bail!(ErrorKind::NotARepository(workdir));
        }
        tracing::trace!(git = %program.display(), workdir = %workdir.display(), "Discovered git");
        Ok(Self { program, workdir, remote: None })
    }

    /// Push to, fetch and pull from this remote instead of the branch's upstream.
    pub fn with_remote(mut self, remote: impl Into<String>) -> Self {
        self.remote = Some(remote.into());
        self
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    async fn exec(&self, args: &[&str]) -> Result<Output> {
        tracing::trace!(args = ?args, "Running git");
        let output = Command::new(&self.program)
            .args(args)
            .current_dir(&self.workdir)
            .env("LC_ALL", "C")
            .env("GIT_TERMINAL_PROMPT", "0")
            .kill_on_drop(true)
            .output()
            .await
            .or_raise(|| ErrorKind::Spawn)?;
        Ok(Output {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    /// Run and return stdout, raising on a non-zero exit.
    async fn run(&self, args: &[&str]) -> Result<String> {
        let output = self.exec(args).await?;
        if !output.success {
            exn::bail!(ErrorKind::Command { command: args.join(" "), message: output.reason() });
        }
        Ok(output.stdout)
    }

    async fn head(&self) -> Option<String> {
        let output = self.exec(&["rev-parse", "--verify", "--quiet", "HEAD"]).await.ok()?;
        output.success.then(|| output.stdout.trim().to_string())
    }
}

#[async_trait]
impl VersionControl for GitCli {
    #[instrument(skip(self))]
    async fn status(&self) -> Result<Vec<StatusEntry>> {
        let stdout = self.run(&["-c", "core.quotePath=false", "status", "--porcelain"]).await?;
        Ok(parse_porcelain(&stdout))
    }

    async fn current_branch(&self) -> Result<Option<String>> {
        // `symbolic-ref` works before the first commit; it exits 1 when detached.
        let output = self.exec(&["symbolic-ref", "--quiet", "--short", "HEAD"]).await?;
        let branch = output.stdout.trim();
        Ok((output.success && !branch.is_empty()).then(|| branch.to_string()))
    }

    #[instrument(skip(self))]
    async fn stage_all(&self) -> Result<()> {
        self.run(&["add", "--all"]).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn commit(&self, message: &str) -> CommitOutcome {
        let output = match self.exec(&["commit", "--message", message]).await {
            Ok(output) => output,
            Err(e) => return CommitOutcome::Failed((*e).to_string()),
        };
        if output.success {
            return CommitOutcome::Committed;
        }
        if is_nothing_to_commit(&output.stdout) || is_nothing_to_commit(&output.stderr) {
            tracing::debug!("Nothing staged to commit");
            return CommitOutcome::NothingToCommit;
        }
        CommitOutcome::Failed(output.reason())
    }

    #[instrument(skip(self))]
    async fn push(&self) -> PushOutcome {
        let args = match &self.remote {
            Some(remote) => vec!["push", remote.as_str(), "HEAD"],
            None => vec!["push"],
        };
        match self.exec(&args).await {
            Ok(output) if output.success => PushOutcome::Pushed,
            Ok(output) => PushOutcome::Failed(output.reason()),
            Err(e) => PushOutcome::Failed((*e).to_string()),
        }
    }

    #[instrument(skip(self))]
    async fn fetch(&self) -> Result<()> {
        match &self.remote {
            Some(remote) => self.run(&["fetch", remote.as_str()]).await?,
            None => self.run(&["fetch"]).await?,
        };
        Ok(())
    }

    #[instrument(skip(self))]
    async fn pull_ff_only(&self) -> PullOutcome {
        let before = self.head().await;
        let branch = self.current_branch().await.ok().flatten();
        let args = match (&self.remote, &branch) {
            (Some(remote), Some(branch)) => vec!["pull", "--ff-only", remote.as_str(), branch.as_str()],
            _ => vec!["pull", "--ff-only"],
        };
        match self.exec(&args).await {
            Ok(output) if output.success => {
                if self.head().await == before { PullOutcome::UpToDate } else { PullOutcome::FastForwarded }
            },
            Ok(output) => PullOutcome::Failed(output.reason()),
            Err(e) => PullOutcome::Failed((*e).to_string()),
        }
    }

    async fn ahead_behind(&self) -> Result<Option<AheadBehind>> {
        match &self.remote {
            Some(remote) => self.ahead_behind_remote(remote).await,
            None => self.ahead_behind_upstream().await,
        }
    }
}

impl GitCli {
    async fn ahead_behind_upstream(&self) -> Result<Option<AheadBehind>> {
        let upstream = self.exec(&["rev-parse", "--abbrev-ref", "--symbolic-full-name", "@{upstream}"]).await?;
        if !upstream.success {
            tracing::debug!("No upstream tracking reference");
            return Ok(None);
        }
        self.left_right("HEAD...@{upstream}").await.map(Some)
    }

    /// Compare with `<remote>/<branch>`, where [`push()`](VersionControl::push) sends `HEAD`.
    ///
    /// A branch the remote has never seen is ahead by every local commit.
    async fn ahead_behind_remote(&self, remote: &str) -> Result<Option<AheadBehind>> {
        let Some(branch) = self.current_branch().await? else {
            tracing::debug!("Detached HEAD");
            return Ok(None);
        };
        if self.head().await.is_none() {
            return Ok(None);
        }
        let tracking = format!("refs/remotes/{remote}/{branch}");
        let known = self.exec(&["rev-parse", "--verify", "--quiet", &tracking]).await?;
        if known.success {
            return self.left_right(&format!("HEAD...{tracking}")).await.map(Some);
        }
        tracing::debug!(%remote, %branch, "Branch not on remote yet");
        let args = ["rev-list", "--count", "HEAD"];
        let stdout = self.run(&args).await?;
        let ahead = stdout.trim().parse::<u32>().ok().ok_or_raise(|| ErrorKind::InvalidOutput(args.join(" ")))?;
        Ok(Some(AheadBehind { ahead, behind: 0 }))
    }

    async fn left_right(&self, range: &str) -> Result<AheadBehind> {
        let args = ["rev-list", "--left-right", "--count", range];
        let stdout = self.run(&args).await?;
        parse_ahead_behind(&stdout).ok_or_raise(|| ErrorKind::InvalidOutput(args.join(" ")))
    }
}

fn is_nothing_to_commit(text: &str) -> bool {
    NOTHING_TO_COMMIT.iter().any(|phrase| text.contains(phrase))
}

/// Parse `git status --porcelain` (v1). Renames report the new path.
fn parse_porcelain(stdout: &str) -> Vec<StatusEntry> {
    stdout
        .lines()
        .filter_map(|line| {
            let code = line.get(..2)?;
            let path = line.get(3..)?;
            let path = path.rsplit_once(" -> ").map_or(path, |(_, to)| to);
            let path = path.strip_prefix('"').and_then(|p| p.strip_suffix('"')).unwrap_or(path);
            (!path.is_empty()).then(|| StatusEntry::new(code, path))
        })
        .collect()
}

/// Parse `rev-list --left-right --count`: `<ahead>\t<behind>`.
fn parse_ahead_behind(stdout: &str) -> Option<AheadBehind> {
    let mut counts = stdout.split_whitespace().map(str::parse::<u32>);
    let ahead = counts.next()?.ok()?;
    let behind = counts.next()?.ok()?;
    Some(AheadBehind { ahead, behind })
}
