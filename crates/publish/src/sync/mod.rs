//! Media sync: scan, compare against the upload cache, upload what changed.
//!
//! References are handled one at a time, in scan order. A reference that
//! fails (missing file, unreadable file, rejected upload) is recorded and the
//! loop moves on; the cache is written once at the end with every success of
//! the run, so one failure never costs the others their entries.

pub mod error;

use self::error::{ErrorKind, Result};
use crate::Context;
use crate::error::{ErrorKind as PublishErrorKind, Result as PublishResult};
use crate::scan::scan_references;
use crate::upload::MediaUploader;
use crate::upload::error::{ErrorKind as UploadErrorKind, Result as UploadResult};
use exn::ResultExt;
use quire_cache::{CacheEntry, Mapping};
use quire_storage::StorageBackend;
use serde::Serialize;
use std::path::Path;
use tracing::instrument;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncOptions {
    /// Work out what would be uploaded without uploading or saving the cache.
    pub dry_run: bool,
    /// Upload even when the cache says the remote copy is current.
    pub force: bool,
}

/// One successful upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadRecord {
    pub path: String,
    pub url: String,
    pub bytes: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncResult {
    pub dry_run: bool,
    /// Distinct references found in the content.
    pub scanned: usize,
    /// Uploaded, or (in a dry run) would have been.
    pub uploaded: usize,
    /// Unchanged since their last upload.
    pub skipped: usize,
    pub failed: usize,
    /// One line per failed reference.
    pub errors: Vec<String>,
    pub uploads: Vec<UploadRecord>,
}

impl SyncResult {
    /// `true` when no reference failed.
    pub fn is_complete(&self) -> bool {
        self.failed == 0
    }
}

enum Step {
    Skipped,
    WouldUpload,
    Uploaded(UploadRecord, CacheEntry),
}

impl Context {
    /// Upload every referenced media file that is new or changed.
    #[instrument(skip(self), fields(dry_run = options.dry_run, force = options.force))]
    pub async fn sync_media(&self, options: SyncOptions) -> PublishResult<SyncResult> {
        self.sync_media_inner(options).await.or_raise(|| PublishErrorKind::Sync)
    }

    async fn sync_media_inner(&self, options: SyncOptions) -> Result<SyncResult> {
        let mut mapping = self.cache.load().await;
        let references = scan_references(self.content.as_ref(), &self.categories, &self.marker)
            .await
            .or_raise(|| ErrorKind::Scan)?;
        tracing::info!(references = references.len(), cached = mapping.len(), "Syncing media");

        let mut result = SyncResult { dry_run: options.dry_run, scanned: references.len(), ..SyncResult::default() };
        for path in references {
            match sync_reference(self.media.as_ref(), self.uploader.get(), &mapping, &path, options).await {
                Ok(Step::Skipped) => {
                    tracing::debug!(%path, "Unchanged since last upload");
                    result.skipped += 1;
                },
                Ok(Step::WouldUpload) => {
                    tracing::info!(%path, "Would upload");
                    result.uploaded += 1;
                },
                Ok(Step::Uploaded(record, entry)) => {
                    mapping.insert(path, entry);
                    result.uploaded += 1;
                    result.uploads.push(record);
                },
                Err(e) => {
                    let reason = (*e).to_string();
                    tracing::warn!(%path, %reason, "Media reference failed");
                    result.failed += 1;
                    result.errors.push(reason);
                },
            }
        }

        if !options.dry_run {
            self.cache.save(&mapping).await.or_raise(|| ErrorKind::CacheSave)?;
        }
        tracing::info!(
            uploaded = result.uploaded,
            skipped = result.skipped,
            failed = result.failed,
            "Media sync finished"
        );
        Ok(result)
    }
}

async fn sync_reference(
    media: &dyn StorageBackend,
    uploader: std::result::Result<&MediaUploader, &str>,
    mapping: &Mapping,
    path: &str,
    options: SyncOptions,
) -> UploadResult<Step> {
    let file = Path::new(path);
    let exists = media.exists(file).await.or_raise(|| UploadErrorKind::Storage(path.to_string()))?;
    if !exists {
        exn::bail!(UploadErrorKind::MissingFile(path.to_string()));
    }
    if !options.force {
        let hash = hash_media(media, path).await?;
        if mapping.is_fresh(path, &hash) {
            return Ok(Step::Skipped);
        }
    }
    if options.dry_run {
        return Ok(Step::WouldUpload);
    }
    let uploader = uploader.map_err(|reason| UploadErrorKind::Upload {
        path: path.to_string(),
        reason: format!("asset store unavailable: {reason}"),
    })?;
    let data = media.read(file).await.or_raise(|| UploadErrorKind::Storage(path.to_string()))?;
    // Record the hash of the bytes actually uploaded.
    let hash = quire_cache::hash(&data);
    let asset = uploader.upload_bytes(path, data).await?;
    let record = UploadRecord { path: path.to_string(), url: asset.secure_url.clone(), bytes: asset.bytes };
    Ok(Step::Uploaded(record, CacheEntry::new(hash, asset.secure_url, asset.public_id)))
}

/// Hash a media file without holding all of it in memory.
async fn hash_media(media: &dyn StorageBackend, path: &str) -> UploadResult<String> {
    let reader = media.reader(Path::new(path)).await.or_raise(|| UploadErrorKind::Storage(path.to_string()))?;
    tokio::task::spawn_blocking(move || quire_cache::hash_reader(reader))
        .await
        .or_raise(|| UploadErrorKind::Storage(path.to_string()))?
        .or_raise(|| UploadErrorKind::Storage(path.to_string()))
}
