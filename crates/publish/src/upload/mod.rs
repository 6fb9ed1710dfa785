//! Uploading a single media file.
//!
//! The remote identifier is derived from the local path alone, so uploading
//! the same path again replaces the same remote asset. Renaming a local file
//! therefore leaves its old remote asset behind.

pub mod error;

use self::error::{ErrorKind, Result};
use exn::ResultExt;
use quire_assets::{ResourceKind, StoreHandle, Transformation, UploadOptions, UploadedAsset};
use quire_storage::BackendHandle;
use std::path::Path;
use tracing::instrument;

/// `<folder>/<path without extension>`, with `/` separators.
///
/// ```
/// use quire_publish::upload::remote_id;
/// assert_eq!(remote_id("quire", "trip/beach.jpg"), "quire/trip/beach");
/// assert_eq!(remote_id("/site/", "trip\\clip.final.mp4"), "site/trip/clip.final");
/// ```
pub fn remote_id(folder: &str, path: &str) -> String {
    let path = path.replace('\\', "/");
    let path = path.trim_start_matches('/');
    let (dir, name) = match path.rsplit_once('/') {
        Some((dir, name)) => (Some(dir), name),
        None => (None, path),
    };
    // A leading dot is a hidden file, not an extension.
    let stem = match name.rfind('.') {
        Some(index) if index > 0 => &name[..index],
        _ => name,
    };
    let folder = folder.trim_matches('/');
    match dir {
        Some(dir) => format!("{folder}/{dir}/{stem}"),
        None => format!("{folder}/{stem}"),
    }
}

/// Upload options for a media path: images get automatic quality and format
/// optimisation, video is stored untouched.
pub fn upload_options(folder: &str, path: &str) -> UploadOptions {
    let resource_kind = ResourceKind::from_path(Path::new(path));
    let transformations = match resource_kind {
        ResourceKind::Image => vec![Transformation::AutoQuality, Transformation::AutoFormat],
        ResourceKind::Video => Vec::new(),
    };
    UploadOptions {
        public_id: remote_id(folder, path),
        overwrite: true,
        resource_kind,
        transformations,
    }
}

/// Uploads files from the media library to an asset store.
#[derive(Clone)]
pub struct MediaUploader {
    media: BackendHandle,
    store: StoreHandle,
    folder: String,
}

impl MediaUploader {
    pub fn new(media: BackendHandle, store: StoreHandle, folder: impl Into<String>) -> Self {
        Self { media, store, folder: folder.into() }
    }

    pub fn options_for(&self, path: &str) -> UploadOptions {
        upload_options(&self.folder, path)
    }

    /// Read `path` from the media library and upload it.
    pub async fn upload(&self, path: &str) -> Result<UploadedAsset> {
        let file = Path::new(path);
        let exists = self.media.exists(file).await.or_raise(|| ErrorKind::Storage(path.to_string()))?;
        if !exists {
            exn::bail!(ErrorKind::MissingFile(path.to_string()));
        }
        let data = self.media.read(file).await.or_raise(|| ErrorKind::Storage(path.to_string()))?;
        self.upload_bytes(path, data).await
    }

    /// Upload bytes already read from the media file at `path`.
    #[instrument(skip(self, data), fields(store = self.store.name(), size = data.len()))]
    pub async fn upload_bytes(&self, path: &str, data: Vec<u8>) -> Result<UploadedAsset> {
        let options = self.options_for(path);
        match self.store.upload(Path::new(path), data, &options).await {
            Ok(asset) => {
                tracing::info!(path, url = %asset.secure_url, bytes = asset.bytes, "Uploaded");
                Ok(asset)
            },
            Err(e) => {
                let reason = (*e).to_string();
                Err(e).or_raise(|| ErrorKind::Upload { path: path.to_string(), reason })
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quire_assets::MockStore;
    use quire_storage::backend::MockBackend;
    use rstest::rstest;
    use std::sync::Arc;

    #[rstest]
    #[case("quire", "a.jpg", "quire/a")]
    #[case("quire", "/a.jpg", "quire/a")]
    #[case("quire", "dir/sub/a.b.png", "quire/dir/sub/a.b")]
    #[case("quire", "dir\\a.png", "quire/dir/a")]
    #[case("quire", "noext", "quire/noext")]
    #[case("quire", "dir.v2/noext", "quire/dir.v2/noext")]
    #[case("quire", ".hidden", "quire/.hidden")]
    #[case("site/media", "a.jpg", "site/media/a")]
    fn test_remote_id(#[case] folder: &str, #[case] path: &str, #[case] expected: &str) {
        assert_eq!(remote_id(folder, path), expected);
    }

    #[test]
    fn test_image_options() {
        let options = upload_options("quire", "trip/Beach.JPG");
        assert_eq!(options.resource_kind, ResourceKind::Image);
        assert_eq!(options.transformations, [Transformation::AutoQuality, Transformation::AutoFormat]);
        assert!(options.overwrite);
        assert_eq!(options.public_id, "quire/trip/Beach");
    }

    #[test]
    fn test_video_options() {
        let options = upload_options("quire", "clips/intro.webm");
        assert_eq!(options.resource_kind, ResourceKind::Video);
        assert!(options.transformations.is_empty());
        assert!(options.overwrite);
    }

    #[tokio::test]
    async fn test_missing_file_is_distinct() {
        let store = Arc::new(MockStore::default());
        let uploader = MediaUploader::new(Arc::new(MockBackend::with_files([("a.jpg", "x")])), store.clone(), "quire");
        let err = uploader.upload("b.jpg").await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::MissingFile(p) if p == "b.jpg"));
        assert_eq!(store.upload_count(), 0);
    }

    #[tokio::test]
    async fn test_store_failure_is_upload_error() {
        let store = Arc::new(MockStore::default());
        store.fail_on("quire/a").await;
        let uploader = MediaUploader::new(Arc::new(MockBackend::with_files([("a.jpg", "x")])), store.clone(), "quire");
        let err = uploader.upload("a.jpg").await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Upload { path, reason } if path == "a.jpg" && reason.contains("400")));
    }

    #[tokio::test]
    async fn test_upload_reads_media() {
        let store = Arc::new(MockStore::default());
        let uploader =
            MediaUploader::new(Arc::new(MockBackend::with_files([("clips/a.mp4", "video")])), store.clone(), "quire");
        let asset = uploader.upload("clips/a.mp4").await.unwrap();
        assert_eq!(asset.secure_url, MockStore::url_for("quire/clips/a"));
        assert_eq!(asset.bytes, 5);
        let uploads = store.uploads().await;
        assert_eq!(uploads[0].data, b"video");
        assert_eq!(uploads[0].options.resource_kind, ResourceKind::Video);
    }
}
