//! Configuration for quire.
//!
//! Settings are layered with [`figment`]: built-in defaults, then the config
//! file (TOML, YAML or JSON by extension), then `QUIRE_`-prefixed environment
//! variables using `__` as the nesting separator:
//!
//! ```toml
//! content_root = "/home/me/site"
//! media_root = "/home/me/media"
//! categories = ["posts", "notes"]
//!
//! [assets]
//! provider = "cloudinary"
//! folder = "my-site"
//! cloud_name = "demo"
//! ```
//!
//! `QUIRE_ASSETS__FOLDER=other` overrides `assets.folder` from the file.
//! Relative `media_root` and `cache_file` are resolved against `content_root`.

pub mod error;

use crate::error::{ErrorKind, Result};
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const ENV_PREFIX: &str = "QUIRE_";
/// Environment variable the CLI reads the config file location from.
pub const CONFIG_PATH_ENV: &str = "QUIRE_CONFIG";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Root of the content repository (the git working tree).
    pub content_root: PathBuf,
    /// Root of the local media library.
    pub media_root: PathBuf,
    /// Content categories: sub-directories of `content_root`, scanned in order.
    pub categories: Vec<String>,
    /// Upload cache location.
    pub cache_file: PathBuf,
    pub media: MediaConfig,
    pub assets: AssetsConfig,
    pub git: GitConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            content_root: PathBuf::new(),
            media_root: PathBuf::new(),
            categories: ["posts", "projects", "pieces", "notes"].map(String::from).to_vec(),
            cache_file: PathBuf::from(".quire").join("media-cache.json"),
            media: MediaConfig::default(),
            assets: AssetsConfig::default(),
            git: GitConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaConfig {
    /// URL segment that marks a media-library reference: `/<marker>/<path>`.
    pub marker: String,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self { marker: "media".to_string() }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    #[default]
    Cloudinary,
    S3,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetsConfig {
    pub provider: Provider,
    /// Prefix every remote identifier is namespaced under.
    pub folder: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cloud_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_secret: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bucket: Option<String>,
    pub region: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_secret: Option<String>,
}

impl Default for AssetsConfig {
    fn default() -> Self {
        Self {
            provider: Provider::default(),
            folder: "quire".to_string(),
            cloud_name: None,
            api_key: None,
            api_secret: None,
            bucket: None,
            region: "auto".to_string(),
            endpoint: None,
            public_url: None,
            key_id: None,
            key_secret: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitConfig {
    /// Remote to push to and pull from; the branch's upstream when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote: Option<String>,
}

/// Default config file: `<config_dir>/quire/config.toml`.
pub fn default_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|dirs| dirs.config_dir().join("quire").join("config.toml"))
}

impl Config {
    /// The layered provider chain, before extraction.
    ///
    /// `file` defaults to [`default_path()`], which is skipped quietly if it
    /// does not exist; an explicitly given file must exist.
    pub fn figment(file: Option<&Path>) -> Result<Figment> {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        let file = match file {
            Some(file) if !file.exists() => exn::bail!(ErrorKind::FileNotFound(file.to_path_buf())),
            Some(file) => Some(file.to_path_buf()),
            None => default_path().filter(|path| path.exists()),
        };
        if let Some(file) = file {
            tracing::debug!(file = %file.display(), "Loading config file");
            let extension = file.extension().map(|e| e.to_string_lossy().to_ascii_lowercase());
            figment = match extension.as_deref() {
                Some("yaml" | "yml") => figment.merge(Yaml::file(file)),
                Some("json") => figment.merge(Json::file(file)),
                _ => figment.merge(Toml::file(file)),
            };
        }
        Ok(figment.merge(Env::prefixed(ENV_PREFIX).split("__").ignore(&["config"])))
    }

    /// Load and validate.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let config: Config = Self::figment(file)?.extract().map_err(|e| ErrorKind::Invalid(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.content_root.as_os_str().is_empty() {
            exn::bail!(ErrorKind::Missing("content_root"));
        }
        if self.media_root.as_os_str().is_empty() {
            exn::bail!(ErrorKind::Missing("media_root"));
        }
        if self.categories.is_empty() {
            exn::bail!(ErrorKind::Missing("categories"));
        }
        if let Some(category) = self.categories.iter().find(|c| !is_plain_segment(c)) {
            exn::bail!(ErrorKind::Invalid(format!("category {category:?} must be a single directory name")));
        }
        let marker = self.media.marker.trim_matches('/');
        if marker.is_empty() || marker.contains(|c: char| c == '/' || c.is_whitespace()) {
            exn::bail!(ErrorKind::Invalid(format!("media.marker {:?} is not a usable URL segment", self.media.marker)));
        }
        if self.assets.folder.trim_matches('/').is_empty() {
            exn::bail!(ErrorKind::Missing("assets.folder"));
        }
        Ok(())
    }

    /// `media_root`, resolved against `content_root` when relative.
    pub fn media_root(&self) -> PathBuf {
        self.content_root.join(&self.media_root)
    }

    /// `cache_file`, resolved against `content_root` when relative.
    pub fn cache_file(&self) -> PathBuf {
        self.content_root.join(&self.cache_file)
    }
}

fn is_plain_segment(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".." && !name.contains(['/', '\\'])
}

/// Cloudinary account credentials.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("cloud_name", &self.cloud_name)
            .field("api_key", &self.api_key)
            .field("api_secret", &"<redacted>")
            .finish()
    }
}

impl Credentials {
    /// Credentials from the config, falling back to `CLOUDINARY_CLOUD_NAME`,
    /// `CLOUDINARY_API_KEY` and `CLOUDINARY_API_SECRET` for anything the
    /// config leaves out. This is the only place the process environment is
    /// read outside of [`Config::figment()`].
    pub fn resolve(assets: &AssetsConfig) -> Result<Self> {
        Self::resolve_with(assets, |name| std::env::var(name).ok())
    }

    fn resolve_with(assets: &AssetsConfig, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let pick = |configured: &Option<String>, variable: &str, field: &'static str| -> Result<String> {
            match configured.clone().filter(|v| !v.is_empty()).or_else(|| lookup(variable).filter(|v| !v.is_empty())) {
                Some(value) => Ok(value),
                None => exn::bail!(ErrorKind::Missing(field)),
            }
        };
        Ok(Self {
            cloud_name: pick(&assets.cloud_name, "CLOUDINARY_CLOUD_NAME", "assets.cloud_name")?,
            api_key: pick(&assets.api_key, "CLOUDINARY_API_KEY", "assets.api_key")?,
            api_secret: pick(&assets.api_secret, "CLOUDINARY_API_SECRET", "assets.api_secret")?,
        })
    }
}

/// Everything an S3-compatible asset store needs, validated.
#[derive(Clone, PartialEq, Eq)]
pub struct S3Settings {
    pub bucket: String,
    pub region: String,
    pub endpoint: Option<String>,
    pub public_url: String,
    pub key_id: String,
    pub key_secret: String,
}

impl S3Settings {
    pub fn resolve(assets: &AssetsConfig) -> Result<Self> {
        let required = |value: &Option<String>, field: &'static str| -> Result<String> {
            match value.as_deref().filter(|v| !v.is_empty()) {
                Some(value) => Ok(value.to_string()),
                None => exn::bail!(ErrorKind::Missing(field)),
            }
        };
        Ok(Self {
            bucket: required(&assets.bucket, "assets.bucket")?,
            region: assets.region.clone(),
            endpoint: assets.endpoint.clone(),
            public_url: required(&assets.public_url, "assets.public_url")?,
            key_id: required(&assets.key_id, "assets.key_id")?,
            key_secret: required(&assets.key_secret, "assets.key_secret")?,
        })
    }
}
