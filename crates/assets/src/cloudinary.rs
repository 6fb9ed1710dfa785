use crate::error::{ErrorKind, Result};
use crate::{AssetStore, UploadOptions, UploadedAsset};
use async_trait::async_trait;
use exn::{OptionExt, ResultExt};
use reqwest::Client;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::path::Path;
use std::time::Duration;
use time::OffsetDateTime;
use tracing::instrument;

const DEFAULT_ENDPOINT: &str = "https://api.cloudinary.com/v1_1";

/// Uploads through Cloudinary's signed upload API.
///
/// Every request is signed with the account's API secret (SHA-256), so no
/// unsigned upload preset needs to exist on the account.
pub struct CloudinaryStore {
    client: Client,
    endpoint: String,
    cloud_name: String,
    api_key: String,
    api_secret: String,
}
impl CloudinaryStore {
    pub fn new(cloud_name: impl Into<String>, api_key: impl Into<String>, api_secret: impl Into<String>) -> Result<Self> {
        let (cloud_name, api_key, api_secret) = (cloud_name.into(), api_key.into(), api_secret.into());
        if cloud_name.is_empty() {
            exn::bail!(ErrorKind::Configuration("cloud_name"));
        }
        if api_key.is_empty() {
            exn::bail!(ErrorKind::Configuration("api_key"));
        }
        if api_secret.is_empty() {
            exn::bail!(ErrorKind::Configuration("api_secret"));
        }
        let client = Client::builder()
            .timeout(Duration::from_secs(300))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(concat!("quire/", env!("CARGO_PKG_VERSION")))
            .build()
            .or_raise(|| ErrorKind::Configuration("http client"))?;
        Ok(Self { client, endpoint: DEFAULT_ENDPOINT.to_string(), cloud_name, api_key, api_secret })
    }

    /// Point the store at a different API base (proxies, test servers).
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into().trim_end_matches('/').to_string();
        self
    }

    fn upload_url(&self, options: &UploadOptions) -> String {
        format!("{}/{}/{}/upload", self.endpoint, self.cloud_name, options.resource_kind.as_str())
    }

    /// Parameters covered by the signature, sorted by name.
    fn signed_params(options: &UploadOptions, timestamp: i64) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("overwrite", options.overwrite.to_string()),
            ("public_id", options.public_id.clone()),
            ("timestamp", timestamp.to_string()),
        ];
        if let Some(transformation) = options.transformation_param() {
            params.push(("transformation", transformation));
        }
        params.sort_by(|a, b| a.0.cmp(b.0));
        params
    }
}

/// `sha256("k1=v1&k2=v2" + secret)`, hex encoded. Params must already be sorted.
fn sign(params: &[(&str, String)], secret: &str) -> String {
    let joined = params.iter().map(|(k, v)| format!("{k}={v}")).collect::<Vec<_>>().join("&");
    let mut hasher = Sha256::new();
    hasher.update(joined.as_bytes());
    hasher.update(secret.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: Option<String>,
    public_id: Option<String>,
    bytes: Option<u64>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

#[async_trait]
impl AssetStore for CloudinaryStore {
    fn name(&self) -> &str {
        "cloudinary"
    }

    #[instrument(skip(self, data, options), fields(file = %file.display(), public_id = %options.public_id, size = data.len()))]
    async fn upload(&self, file: &Path, data: Vec<u8>, options: &UploadOptions) -> Result<UploadedAsset> {
        let timestamp = OffsetDateTime::now_utc().unix_timestamp();
        let params = Self::signed_params(options, timestamp);
        let signature = sign(&params, &self.api_secret);

        let file_name = file.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_else(|| "upload".to_string());
        let mut form = Form::new()
            .text("api_key", self.api_key.clone())
            .text("signature", signature)
            .text("signature_algorithm", "sha256")
            .part("file", Part::bytes(data).file_name(file_name));
        for (key, value) in params {
            form = form.text(key, value);
        }

        let url = self.upload_url(options);
        tracing::debug!(%url, "Uploading to Cloudinary");
        let response = self
            .client
            .post(&url)
            .multipart(form)
            .send()
            .await
            .or_raise(|| ErrorKind::Network(url.clone()))?;
        let status = response.status();
        let body = response.bytes().await.or_raise(|| ErrorKind::Network(url.clone()))?;
        let parsed = serde_json::from_slice::<UploadResponse>(&body);

        if !status.is_success() {
            let message = match parsed {
                Ok(UploadResponse { error: Some(error), .. }) => error.message,
                _ => String::from_utf8_lossy(&body).trim().to_string(),
            };
            tracing::warn!(status = status.as_u16(), %message, "Cloudinary rejected upload");
            exn::bail!(ErrorKind::Rejected { status: status.as_u16(), message });
        }

        let parsed = parsed.or_raise(|| ErrorKind::InvalidResponse)?;
        if let Some(error) = parsed.error {
            exn::bail!(ErrorKind::Rejected { status: status.as_u16(), message: error.message });
        }
        let secure_url = parsed.secure_url.ok_or_raise(|| ErrorKind::InvalidResponse)?;
        Ok(UploadedAsset {
            secure_url,
            public_id: parsed.public_id.unwrap_or_else(|| options.public_id.clone()),
            bytes: parsed.bytes.unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ResourceKind, Transformation};

    fn options(kind: ResourceKind, transformations: Vec<Transformation>) -> UploadOptions {
        UploadOptions { public_id: "quire/trip/beach".to_string(), overwrite: true, resource_kind: kind, transformations }
    }

    #[test]
    fn test_signed_params_sorted_with_transformation() {
        let params = CloudinaryStore::signed_params(
            &options(ResourceKind::Image, vec![Transformation::AutoQuality, Transformation::AutoFormat]),
            1_700_000_000,
        );
        let names: Vec<_> = params.iter().map(|(k, _)| *k).collect();
        assert_eq!(names, ["overwrite", "public_id", "timestamp", "transformation"]);
        assert_eq!(params[3].1, "q_auto,f_auto");
        assert_eq!(params[0].1, "true");
    }

    #[test]
    fn test_signed_params_video_has_no_transformation() {
        let params = CloudinaryStore::signed_params(&options(ResourceKind::Video, vec![]), 1);
        assert!(params.iter().all(|(k, _)| *k != "transformation"));
    }

    #[test]
    fn test_sign() {
        // sha256("public_id=sample&timestamp=1315060510abcd")
        let params = [("public_id", "sample".to_string()), ("timestamp", "1315060510".to_string())];
        let mut hasher = Sha256::new();
        hasher.update(b"public_id=sample&timestamp=1315060510abcd");
        assert_eq!(sign(&params, "abcd"), format!("{:x}", hasher.finalize()));
        assert_eq!(sign(&params, "abcd").len(), 64);
    }

    #[test]
    fn test_upload_url() {
        let store = CloudinaryStore::new("demo", "key", "secret").unwrap().with_endpoint("http://localhost:9000/");
        assert_eq!(
            store.upload_url(&options(ResourceKind::Video, vec![])),
            "http://localhost:9000/demo/video/upload"
        );
    }

    #[test]
    fn test_missing_credentials() {
        let err = CloudinaryStore::new("", "key", "secret").err().unwrap();
        assert!(matches!(&*err, ErrorKind::Configuration("cloud_name")));
    }

    #[test]
    fn test_parse_error_response() {
        let parsed: UploadResponse = serde_json::from_str(r#"{"error":{"message":"Invalid Signature"}}"#).unwrap();
        assert_eq!(parsed.error.unwrap().message, "Invalid Signature");
    }
}
