//! Replacing local media references with their remote URLs, in place.
//!
//! Rewriting is driven by the upload cache, not by a fresh scan: only paths
//! that have a known remote URL are touched, so a reference whose upload
//! failed keeps pointing at the local file.

pub mod error;
mod substring;

pub use self::substring::SubstringRewriter;

use self::error::{ErrorKind, Result};
use crate::Context;
use crate::error::{ErrorKind as PublishErrorKind, Result as PublishResult};
use crate::scan::documents;
use exn::ResultExt;
use futures::TryStreamExt;
use quire_storage::error::ErrorKind as StorageErrorKind;
use quire_storage::to_slash_string;
use serde::Serialize;
use std::pin::pin;
use std::sync::Arc;
use tracing::instrument;

/// One local reference form and the URL that replaces it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Replacement {
    pub local: String,
    pub url: String,
}

impl Replacement {
    pub fn new(local: impl Into<String>, url: impl Into<String>) -> Self {
        Self { local: local.into(), url: url.into() }
    }
}

/// A rewritten document and how many occurrences were replaced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rewritten {
    pub text: String,
    pub replaced: usize,
}

/// Strategy for replacing references inside one document's text.
///
/// Implementations never do I/O; reading and writing documents is the
/// caller's job.
pub trait Rewriter: Send + Sync {
    fn rewrite(&self, text: &str, replacements: &[Replacement]) -> Rewritten;
}

pub type RewriterHandle = Arc<dyn Rewriter>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileRewrite {
    /// Path relative to the content root, `/`-separated.
    pub path: String,
    pub replacements: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RewriteResult {
    pub dry_run: bool,
    pub files_scanned: usize,
    pub files_modified: usize,
    pub urls_replaced: usize,
    /// Only documents with at least one replacement.
    pub files: Vec<FileRewrite>,
}

impl Context {
    /// Rewrite every cached local reference across the content corpus.
    ///
    /// In a dry run the counts are computed exactly as for a real run, but
    /// nothing is written.
    #[instrument(skip(self))]
    pub async fn rewrite_urls(&self, dry_run: bool) -> PublishResult<RewriteResult> {
        self.rewrite_urls_inner(dry_run).await.or_raise(|| PublishErrorKind::Rewrite)
    }

    async fn rewrite_urls_inner(&self, dry_run: bool) -> Result<RewriteResult> {
        let mapping = self.cache.load().await;
        let replacements: Vec<_> = mapping
            .url_mappings(&self.marker)
            .into_iter()
            .map(|(local, url)| Replacement { local, url })
            .collect();
        tracing::info!(mappings = replacements.len(), "Rewriting media references");

        let mut result = RewriteResult { dry_run, ..RewriteResult::default() };
        let mut files = pin!(documents(self.content.as_ref(), &self.categories));
        while let Some(file) = files.try_next().await.or_raise(|| ErrorKind::Scan)? {
            result.files_scanned += 1;
            if replacements.is_empty() {
                continue;
            }
            let text = match self.content.read_to_string(&file.path).await {
                Ok(text) => text,
                Err(e) if matches!(&*e, StorageErrorKind::InvalidText(_)) => {
                    tracing::warn!(document = %file.path.display(), "Skipping document that is not valid UTF-8");
                    continue;
                },
                Err(e) => return Err(e).or_raise(|| ErrorKind::Read(file.path.clone())),
            };
            let rewritten = self.rewriter.rewrite(&text, &replacements);
            if rewritten.replaced == 0 {
                continue;
            }
            if !dry_run {
                self.content
                    .write(&file.path, rewritten.text.as_bytes())
                    .await
                    .or_raise(|| ErrorKind::Write(file.path.clone()))?;
            }
            tracing::info!(document = %file.path.display(), replaced = rewritten.replaced, dry_run, "Document rewritten");
            result.files_modified += 1;
            result.urls_replaced += rewritten.replaced;
            result.files.push(FileRewrite { path: to_slash_string(&file.path), replacements: rewritten.replaced });
        }
        Ok(result)
    }
}
