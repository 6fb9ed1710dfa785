//! `quire`: publish markdown content.
//!
//! Syncs the media a site's documents refer to up to an asset store,
//! rewrites the references to the remote URLs, then commits and pushes.

use clap::{Parser, Subcommand};
use exn::ResultExt;
use quire_config::{CONFIG_PATH_ENV, Config};
use quire_publish::error::{ErrorKind, Result};
use quire_publish::{Context, GitResult, PublishOptions, PublishOutcome, RewriteResult, SyncOptions, SyncResult};
use quire_vcs::{PullOutcome, RepositoryStatus};
use serde::Serialize;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Exit code for a run that completed with per-item failures.
const PARTIAL: u8 = 2;

#[derive(Parser, Debug)]
#[command(name = "quire", version, about)]
struct Cli {
    /// Config file (TOML, YAML or JSON).
    #[arg(long, global = true, env = CONFIG_PATH_ENV)]
    config: Option<PathBuf>,
    /// Print results as JSON.
    #[arg(long, global = true)]
    json: bool,
    /// More logging; repeat for more. `RUST_LOG` takes precedence.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Upload referenced media that is new or changed.
    Sync {
        #[arg(long)]
        dry_run: bool,
        /// Upload even if the cache says nothing changed.
        #[arg(long)]
        force: bool,
    },
    /// Replace local media references with their remote URLs.
    Rewrite {
        #[arg(long)]
        dry_run: bool,
    },
    /// List local reference to remote URL mappings.
    Mappings,
    /// Sync, rewrite, commit and push.
    Publish {
        /// Commit message (default: "Publish content <date>").
        #[arg(short, long)]
        message: Option<String>,
        #[arg(long)]
        dry_run: bool,
    },
    /// Show the content repository's status.
    Status,
    /// Fetch and fast-forward the content repository.
    Pull,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:?}");
            ExitCode::FAILURE
        },
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let config = Config::load(cli.config.as_deref()).or_raise(|| ErrorKind::Config)?;
    tracing::debug!(content_root = %config.content_root.display(), "Configuration loaded");
    let ctx = Context::from_config(&config)?;
    let json = cli.json;

    let code = match cli.command {
        Command::Sync { dry_run, force } => {
            let result = ctx.sync_media(SyncOptions { dry_run, force }).await?;
            emit(json, &result, print_sync);
            partial_unless(result.is_complete())
        },
        Command::Rewrite { dry_run } => {
            let result = ctx.rewrite_urls(dry_run).await?;
            emit(json, &result, print_rewrite);
            ExitCode::SUCCESS
        },
        Command::Mappings => {
            let mappings = ctx.url_mappings().await;
            emit(json, &mappings, |mappings| {
                for (local, url) in mappings {
                    println!("{local} -> {url}");
                }
            });
            ExitCode::SUCCESS
        },
        Command::Publish { message, dry_run } => {
            let outcome = ctx.publish(PublishOptions { message, dry_run }).await?;
            emit(json, &outcome, print_publish);
            partial_unless(outcome.is_complete())
        },
        Command::Status => {
            let status = ctx.repository_status().await?;
            emit(json, &status, print_status);
            ExitCode::SUCCESS
        },
        Command::Pull => {
            let outcome = ctx.pull().await?;
            emit(json, &outcome, |outcome| match outcome {
                PullOutcome::UpToDate => println!("Already up to date."),
                PullOutcome::FastForwarded => println!("Fast-forwarded."),
                PullOutcome::Failed(reason) => println!("Pull failed: {reason}"),
            });
            partial_unless(!matches!(outcome, PullOutcome::Failed(_)))
        },
    };
    Ok(code)
}

fn partial_unless(complete: bool) -> ExitCode {
    match complete {
        true => ExitCode::SUCCESS,
        false => ExitCode::from(PARTIAL),
    }
}

fn emit<T: Serialize>(json: bool, value: &T, human: impl FnOnce(&T)) {
    if !json {
        return human(value);
    }
    match serde_json::to_string_pretty(value) {
        Ok(encoded) => println!("{encoded}"),
        Err(e) => eprintln!("error: could not encode output as JSON: {e}"),
    }
}

fn print_sync(result: &SyncResult) {
    let verb = if result.dry_run { "would upload" } else { "uploaded" };
    println!(
        "{} references: {} {verb}, {} unchanged, {} failed",
        result.scanned, result.uploaded, result.skipped, result.failed
    );
    for upload in &result.uploads {
        println!("  {} -> {} ({} bytes)", upload.path, upload.url, upload.bytes);
    }
    for error in &result.errors {
        println!("  ! {error}");
    }
}

fn print_rewrite(result: &RewriteResult) {
    let verb = if result.dry_run { "would replace" } else { "replaced" };
    println!(
        "{} documents: {verb} {} references in {}",
        result.files_scanned, result.urls_replaced, result.files_modified
    );
    for file in &result.files {
        println!("  {} ({})", file.path, file.replacements);
    }
}

fn print_publish(outcome: &PublishOutcome) {
    print_sync(&outcome.sync);
    print_rewrite(&outcome.rewrite);
    let branch = outcome.branch.as_deref().unwrap_or("HEAD");
    match (outcome.git_result, &outcome.git_error) {
        (None, _) => println!("Dry run: nothing committed."),
        (Some(GitResult::Success), _) => println!("Pushed {branch}."),
        (Some(GitResult::NoChanges), _) => println!("Nothing to commit or push."),
        (Some(GitResult::Error), error) => {
            println!("Git failed: {}", error.as_deref().unwrap_or("unknown error"));
        },
    }
}

fn print_status(status: &RepositoryStatus) {
    println!("On branch {}", status.branch.as_deref().unwrap_or("(detached)"));
    match status.ahead_behind {
        Some(counts) => println!("{} ahead, {} behind upstream", counts.ahead, counts.behind),
        None => println!("No upstream configured"),
    }
    if status.is_clean() {
        println!("Working tree clean");
    }
    for entry in &status.entries {
        println!("  {} {}", entry.code, entry.path);
    }
}
