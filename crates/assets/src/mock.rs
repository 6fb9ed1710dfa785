//! In-memory asset store for testing.

use crate::error::{ErrorKind, Result};
use crate::{AssetStore, UploadOptions, UploadedAsset};
use async_trait::async_trait;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;

/// One call to [`MockStore::upload()`] that succeeded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordedUpload {
    pub file: PathBuf,
    pub data: Vec<u8>,
    pub options: UploadOptions,
}

/// Asset store that keeps uploads in memory.
///
/// URLs are deterministic (see [`MockStore::url_for()`]) so tests can assert
/// on rewritten documents. Individual remote identifiers can be made to fail.
///
/// ```
/// use quire_assets::{AssetStore, MockStore, ResourceKind, UploadOptions};
/// use std::path::Path;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let store = MockStore::default();
/// let options = UploadOptions {
///     public_id: "quire/cover".to_string(),
///     overwrite: true,
///     resource_kind: ResourceKind::Image,
///     transformations: vec![],
/// };
/// let asset = store.upload(Path::new("cover.jpg"), b"jpeg".to_vec(), &options).await.unwrap();
/// assert_eq!(asset.secure_url, MockStore::url_for("quire/cover"));
/// assert_eq!(store.upload_count(), 1);
/// # }
/// ```
#[derive(Debug, Default)]
pub struct MockStore {
    uploads: RwLock<Vec<RecordedUpload>>,
    failing: RwLock<BTreeSet<String>>,
    attempts: AtomicUsize,
}

impl MockStore {
    /// The URL an upload under `public_id` is served from.
    pub fn url_for(public_id: &str) -> String {
        format!("https://assets.test/{public_id}")
    }

    /// Reject every upload under `public_id` from now on.
    pub async fn fail_on(&self, public_id: impl Into<String>) {
        self.failing.write().await.insert(public_id.into());
    }

    /// Number of upload attempts, failed ones included.
    pub fn upload_count(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Successful uploads, in call order.
    pub async fn uploads(&self) -> Vec<RecordedUpload> {
        self.uploads.read().await.clone()
    }
}

#[async_trait]
impl AssetStore for MockStore {
    fn name(&self) -> &str {
        "mock"
    }

    async fn upload(&self, file: &Path, data: Vec<u8>, options: &UploadOptions) -> Result<UploadedAsset> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.failing.read().await.contains(&options.public_id) {
            exn::bail!(ErrorKind::Rejected { status: 400, message: format!("refusing {}", options.public_id) });
        }
        let bytes = data.len() as u64;
        self.uploads.write().await.push(RecordedUpload { file: file.to_path_buf(), data, options: options.clone() });
        Ok(UploadedAsset { secure_url: Self::url_for(&options.public_id), public_id: options.public_id.clone(), bytes })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ResourceKind;

    fn options(public_id: &str) -> UploadOptions {
        UploadOptions {
            public_id: public_id.to_string(),
            overwrite: true,
            resource_kind: ResourceKind::Image,
            transformations: vec![],
        }
    }

    #[tokio::test]
    async fn test_records_uploads() {
        let store = MockStore::default();
        let asset = store.upload(Path::new("a.jpg"), vec![1, 2, 3], &options("quire/a")).await.unwrap();
        assert_eq!(asset.bytes, 3);
        assert_eq!(asset.public_id, "quire/a");
        let uploads = store.uploads().await;
        assert_eq!(uploads.len(), 1);
        assert_eq!(uploads[0].file, Path::new("a.jpg"));
    }

    #[tokio::test]
    async fn test_fail_on() {
        let store = MockStore::default();
        store.fail_on("quire/bad").await;
        let err = store.upload(Path::new("bad.jpg"), vec![], &options("quire/bad")).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Rejected { status: 400, .. }));
        assert!(store.upload(Path::new("good.jpg"), vec![], &options("quire/good")).await.is_ok());
        assert_eq!(store.upload_count(), 2);
        assert_eq!(store.uploads().await.len(), 1);
    }
}
