//! S3-compatible asset store.
//!
//! For sites served straight out of a bucket (AWS S3, Backblaze B2, Tigris,
//! MinIO, R2) instead of an image CDN. Objects are written under
//! `<public_id>.<ext>` and the returned URL is that key appended to the
//! configured public base URL. Transformations are not applied; the bytes are
//! stored as-is.

use crate::error::{ErrorKind, Result};
use crate::{AssetStore, UploadOptions, UploadedAsset};
use async_trait::async_trait;
use aws_sdk_s3::{
    Client,
    config::{BehaviorVersion, Credentials, Region, retry::RetryConfig},
    primitives::ByteStream,
};
use exn::ResultExt;
use std::path::Path;
use tokio::sync::Semaphore;
use tracing::instrument;

/// Uploads of large videos are memory-bound; keep the fan-out modest.
const DEFAULT_CONCURRENT_REQUESTS: usize = 8;

/// S3-compatible asset store.
///
/// ```no_run
/// use quire_assets::S3Store;
///
/// # fn example() -> quire_assets::error::Result<()> {
/// let store = S3Store::new(
///     "my-site-media",
///     "us-west-004",
///     Some("https://s3.us-west-004.backblazeb2.com"),
///     "https://media.example.com",
///     "access_key_id",
///     "secret_access_key",
/// )?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct S3Store {
    client: Client,
    bucket: String,
    public_url: String,
    rate_limiter: Semaphore,
}

impl S3Store {
    /// Create a new S3 asset store.
    ///
    /// # Arguments
    /// * `bucket` - S3 bucket name
    /// * `region` - AWS region or provider-specific region (e.g., "us-west-004" for Backblaze)
    /// * `endpoint` - Custom endpoint URL for S3-compatible services
    /// * `public_url` - Base URL the bucket's objects are publicly served from
    /// * `key_id` - AWS/provider access key ID
    /// * `key_secret` - AWS/provider secret access key
    pub fn new(
        bucket: impl Into<String>,
        region: impl Into<String>,
        endpoint: Option<impl Into<String>>,
        public_url: impl Into<String>,
        key_id: impl Into<String>,
        key_secret: impl Into<String>,
    ) -> Result<Self> {
        let bucket = bucket.into();
        if bucket.is_empty() {
            exn::bail!(ErrorKind::Configuration("bucket"));
        }
        let public_url = public_url.into().trim_end_matches('/').to_string();
        if public_url.is_empty() {
            exn::bail!(ErrorKind::Configuration("public_url"));
        }
        let credentials = Credentials::new(key_id, key_secret, None, None, "quire-config");
        let mut config_builder = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .credentials_provider(credentials)
            .region(Region::new(region.into()))
            // 1 initial + 3 retries, exponential backoff.
            .retry_config(RetryConfig::standard().with_max_attempts(4))
            // Path-style addressing for S3-compatible services.
            .force_path_style(true);
        if let Some(endpoint_url) = endpoint {
            config_builder = config_builder.endpoint_url(endpoint_url);
        }
        Ok(Self {
            client: Client::from_conf(config_builder.build()),
            bucket,
            public_url,
            rate_limiter: Semaphore::new(DEFAULT_CONCURRENT_REQUESTS),
        })
    }
}

/// Object key for an upload: the remote identifier plus the source extension.
fn object_key(file: &Path, public_id: &str) -> String {
    let public_id = public_id.trim_matches('/');
    match file.extension() {
        Some(ext) => format!("{public_id}.{}", ext.to_string_lossy().to_ascii_lowercase()),
        None => public_id.to_string(),
    }
}

fn content_type(file: &Path) -> &'static str {
    let ext = file.extension().map(|e| e.to_string_lossy().to_ascii_lowercase()).unwrap_or_default();
    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "avif" => "image/avif",
        "svg" => "image/svg+xml",
        "mp4" | "m4v" => "video/mp4",
        "mov" => "video/quicktime",
        "webm" => "video/webm",
        "mkv" => "video/x-matroska",
        "avi" => "video/x-msvideo",
        "ogv" => "video/ogg",
        _ => "application/octet-stream",
    }
}

#[async_trait]
impl AssetStore for S3Store {
    fn name(&self) -> &str {
        &self.bucket
    }

    #[instrument(skip(self, data, options), fields(file = %file.display(), public_id = %options.public_id, size = data.len()))]
    async fn upload(&self, file: &Path, data: Vec<u8>, options: &UploadOptions) -> Result<UploadedAsset> {
        let key = object_key(file, &options.public_id);
        let location = format!("s3://{}/{key}", self.bucket);
        let bytes = data.len() as u64;
        let _permit = self.rate_limiter.acquire().await.or_raise(|| ErrorKind::Network(location.clone()))?;
        let mut request = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .content_type(content_type(file))
            .body(ByteStream::from(data));
        if !options.overwrite {
            // Conditional write: fail instead of replacing an existing object.
            request = request.if_none_match("*");
        }
        request.send().await.or_raise(|| ErrorKind::Network(location.clone()))?;
        tracing::debug!(%location, "Object written");
        Ok(UploadedAsset { secure_url: format!("{}/{key}", self.public_url), public_id: options.public_id.clone(), bytes })
    }
}
