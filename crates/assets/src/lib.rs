//! Remote asset stores.
//!
//! An [`AssetStore`] takes the bytes of one local media file plus
//! [`UploadOptions`] and answers with the permanent URL it is now served
//! from. Stores are expected to honour `overwrite`: uploading again under the
//! same `public_id` replaces the asset instead of creating a sibling.

#[cfg(feature = "cloudinary")]
mod cloudinary;
pub mod error;
#[cfg(feature = "mock")]
mod mock;
mod models;
#[cfg(feature = "s3")]
mod s3;

#[cfg(feature = "cloudinary")]
pub use crate::cloudinary::CloudinaryStore;
#[cfg(feature = "mock")]
pub use crate::mock::{MockStore, RecordedUpload};
pub use crate::models::{ResourceKind, Transformation, UploadOptions, UploadedAsset};
#[cfg(feature = "s3")]
pub use crate::s3::S3Store;

use crate::error::Result;
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;

pub type StoreHandle = Arc<dyn AssetStore + Send + Sync>;

#[async_trait]
pub trait AssetStore: Send + Sync {
    /// Name of the store (used for logging only).
    fn name(&self) -> &str;

    /// Upload `data`, read from the media file at `file` (relative to the
    /// media library; used for naming and content-type detection only).
    async fn upload(&self, file: &Path, data: Vec<u8>, options: &UploadOptions) -> Result<UploadedAsset>;
}
