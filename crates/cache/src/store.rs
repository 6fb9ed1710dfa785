use crate::entry::{EntryRecord, Mapping};
use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::instrument;

/// The persisted upload cache: one JSON file, read and written whole.
///
/// ```no_run
/// use quire_cache::{CacheEntry, UploadCache};
///
/// # async fn example() -> quire_cache::error::Result<()> {
/// let cache = UploadCache::new("/home/me/site/.quire/media-cache.json");
/// let mut mapping = cache.load().await;
/// mapping.insert("foo/bar.jpg", CacheEntry::new("hash", "https://cdn/x.jpg", "quire/foo/bar"));
/// cache.save(&mapping).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct UploadCache {
    path: PathBuf,
}
impl UploadCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the persisted mapping.
    ///
    /// Never fails: a missing file is an empty cache, and so is one that
    /// can't be read or parsed. The worst outcome of a lost cache is
    /// re-uploading files that overwrite their own remote assets.
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub async fn load(&self) -> Mapping {
        let raw = match fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No upload cache on disk yet; starting empty");
                return Mapping::default();
            },
            Err(e) => {
                tracing::warn!(error = %e, "Upload cache unreadable; treating as empty");
                return Mapping::default();
            },
        };
        match serde_json::from_slice::<BTreeMap<String, EntryRecord>>(&raw) {
            Ok(records) => {
                let mapping = Mapping::from_records(records);
                tracing::debug!(entries = mapping.len(), "Upload cache loaded");
                mapping
            },
            Err(e) => {
                tracing::warn!(error = %e, "Upload cache corrupt; treating as empty");
                Mapping::default()
            },
        }
    }

    /// Persist the full mapping, replacing whatever was there.
    ///
    /// The new contents are written next to the cache file and renamed over
    /// it, so a reader sees either the old mapping or the new one.
    #[instrument(skip_all, fields(path = %self.path.display(), entries = mapping.len()))]
    pub async fn save(&self, mapping: &Mapping) -> Result<()> {
        let json = serde_json::to_vec_pretty(&mapping.to_records()?)
            .or_raise(|| ErrorKind::InvalidData("serialization"))?;
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).await.or_raise(|| ErrorKind::Write(parent.to_path_buf()))?;
        }
        let staging = self.staging_path();
        fs::write(&staging, &json).await.or_raise(|| ErrorKind::Write(staging.clone()))?;
        if let Err(e) = fs::rename(&staging, &self.path).await {
            _ = fs::remove_file(&staging).await;
            return Err(e).or_raise(|| ErrorKind::Write(self.path.clone()));
        }
        tracing::debug!("Upload cache saved");
        Ok(())
    }

    fn staging_path(&self) -> PathBuf {
        let mut name = self.path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}
