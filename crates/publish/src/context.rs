//! Everything one pipeline run needs, wired together once.

use crate::error::{ErrorKind, Result};
use crate::rewrite::{RewriterHandle, SubstringRewriter};
use crate::upload::MediaUploader;
use exn::ResultExt;
use quire_assets::StoreHandle;
use quire_cache::UploadCache;
use quire_config::{AssetsConfig, Config, Provider};
use quire_storage::BackendHandle;
use quire_storage::backend::LocalBackend;
use quire_vcs::{GitCli, PullOutcome, RepositoryStatus, VcsHandle};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::instrument;

/// A collaborator that could not be set up, and why.
///
/// Only the operations that need it fail, so `quire status` works without
/// asset credentials and `quire sync --dry-run` works outside a repository.
pub(crate) enum Component<T> {
    Ready(T),
    Unavailable(String),
}

impl<T> Component<T> {
    pub(crate) fn get(&self) -> std::result::Result<&T, &str> {
        match self {
            Self::Ready(value) => Ok(value),
            Self::Unavailable(reason) => Err(reason.as_str()),
        }
    }
}

/// The publish pipeline: content corpus, media library, asset store, upload
/// cache and version control.
///
/// Built from configuration with [`Context::from_config()`], or piece by
/// piece with [`Context::builder()`].
pub struct Context {
    pub(crate) content: BackendHandle,
    pub(crate) media: BackendHandle,
    pub(crate) uploader: Component<MediaUploader>,
    pub(crate) vcs: Component<VcsHandle>,
    pub(crate) cache: UploadCache,
    pub(crate) rewriter: RewriterHandle,
    pub(crate) categories: Vec<String>,
    pub(crate) marker: String,
}

impl Context {
    pub fn builder(content: BackendHandle, media: BackendHandle, cache: UploadCache) -> ContextBuilder {
        let defaults = Config::default();
        ContextBuilder {
            content,
            media,
            cache,
            store: None,
            unavailable_store: None,
            vcs: None,
            unavailable_vcs: None,
            rewriter: Arc::new(SubstringRewriter),
            categories: defaults.categories,
            marker: defaults.media.marker,
            folder: defaults.assets.folder,
        }
    }

    /// Wire up local backends, the configured asset store and `git`.
    ///
    /// The content and media roots must exist. A missing asset store or
    /// repository is only reported when an operation needs it.
    #[instrument(skip_all, fields(content_root = %config.content_root.display()))]
    pub fn from_config(config: &Config) -> Result<Self> {
        let content_root = std::fs::canonicalize(&config.content_root).or_raise(|| ErrorKind::Config)?;
        let media_root = std::fs::canonicalize(config.media_root()).or_raise(|| ErrorKind::Config)?;
        let content: BackendHandle =
            Arc::new(LocalBackend::new("content", &content_root).or_raise(|| ErrorKind::Config)?);
        let media: BackendHandle = Arc::new(LocalBackend::new("media", &media_root).or_raise(|| ErrorKind::Config)?);

        let mut builder = Self::builder(content, media, UploadCache::new(config.cache_file()))
            .categories(config.categories.iter().cloned())
            .marker(config.media.marker.clone())
            .folder(config.assets.folder.clone());
        match asset_store(&config.assets) {
            Ok(store) => builder = builder.store(store),
            Err(e) => {
                let reason = (*e).to_string();
                tracing::debug!(%reason, "Asset store not configured");
                builder.unavailable_store = Some(reason);
            },
        }
        match GitCli::discover(&content_root) {
            Ok(git) => {
                let git = match &config.git.remote {
                    Some(remote) => git.with_remote(remote.clone()),
                    None => git,
                };
                builder = builder.vcs(Arc::new(git));
            },
            Err(e) => {
                let reason = (*e).to_string();
                tracing::debug!(%reason, "Version control not available");
                builder.unavailable_vcs = Some(reason);
            },
        }
        Ok(builder.build())
    }

    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    pub fn marker(&self) -> &str {
        &self.marker
    }

    /// Every media path the content refers to, deduplicated, in discovery order.
    pub async fn scan_references(&self) -> Result<Vec<String>> {
        crate::scan::scan_references(self.content.as_ref(), &self.categories, &self.marker)
            .await
            .or_raise(|| ErrorKind::Scan)
    }

    /// Local reference form (`/<marker>/<path>`) to remote URL, for every
    /// cached upload.
    pub async fn url_mappings(&self) -> BTreeMap<String, String> {
        self.cache.load().await.url_mappings(&self.marker)
    }

    pub(crate) fn vcs(&self) -> Result<&VcsHandle> {
        self.vcs.get().map_err(|reason| ErrorKind::VcsUnavailable(reason.to_string()).into())
    }

    pub async fn repository_status(&self) -> Result<RepositoryStatus> {
        self.vcs()?.repository_status().await.or_raise(|| ErrorKind::Vcs)
    }

    /// Fetch, then fast-forward the current branch. Never merges.
    #[instrument(skip(self))]
    pub async fn pull(&self) -> Result<PullOutcome> {
        let vcs = self.vcs()?;
        if let Err(e) = vcs.fetch().await {
            let reason = (*e).to_string();
            tracing::warn!(%reason, "Fetch failed");
            return Ok(PullOutcome::Failed(reason));
        }
        let outcome = vcs.pull_ff_only().await;
        tracing::info!(?outcome, "Pulled");
        Ok(outcome)
    }
}

pub struct ContextBuilder {
    content: BackendHandle,
    media: BackendHandle,
    cache: UploadCache,
    store: Option<StoreHandle>,
    unavailable_store: Option<String>,
    vcs: Option<VcsHandle>,
    unavailable_vcs: Option<String>,
    rewriter: RewriterHandle,
    categories: Vec<String>,
    marker: String,
    folder: String,
}

impl ContextBuilder {
    pub fn store(mut self, store: StoreHandle) -> Self {
        self.store = Some(store);
        self
    }

    pub fn vcs(mut self, vcs: VcsHandle) -> Self {
        self.vcs = Some(vcs);
        self
    }

    pub fn rewriter(mut self, rewriter: RewriterHandle) -> Self {
        self.rewriter = rewriter;
        self
    }

    pub fn categories(mut self, categories: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.categories = categories.into_iter().map(Into::into).collect();
        self
    }

    pub fn marker(mut self, marker: impl Into<String>) -> Self {
        self.marker = marker.into().trim_matches('/').to_string();
        self
    }

    /// Prefix of every remote identifier.
    pub fn folder(mut self, folder: impl Into<String>) -> Self {
        self.folder = folder.into();
        self
    }

    pub fn build(self) -> Context {
        let uploader = match self.store {
            Some(store) => Component::Ready(MediaUploader::new(self.media.clone(), store, self.folder)),
            None => Component::Unavailable(self.unavailable_store.unwrap_or_else(|| "no asset store configured".to_string())),
        };
        let vcs = match self.vcs {
            Some(vcs) => Component::Ready(vcs),
            None => Component::Unavailable(self.unavailable_vcs.unwrap_or_else(|| "no repository configured".to_string())),
        };
        Context {
            content: self.content,
            media: self.media,
            uploader,
            vcs,
            cache: self.cache,
            rewriter: self.rewriter,
            categories: self.categories,
            marker: self.marker,
        }
    }
}

fn asset_store(assets: &AssetsConfig) -> Result<StoreHandle> {
    match assets.provider {
        Provider::Cloudinary => cloudinary_store(assets),
        Provider::S3 => s3_store(assets),
    }
}

#[cfg(feature = "cloudinary")]
fn cloudinary_store(assets: &AssetsConfig) -> Result<StoreHandle> {
    let credentials = quire_config::Credentials::resolve(assets).or_raise(|| ErrorKind::Config)?;
    let store = quire_assets::CloudinaryStore::new(credentials.cloud_name, credentials.api_key, credentials.api_secret)
        .or_raise(|| ErrorKind::Config)?;
    Ok(Arc::new(store))
}

#[cfg(not(feature = "cloudinary"))]
fn cloudinary_store(_assets: &AssetsConfig) -> Result<StoreHandle> {
    exn::bail!(ErrorKind::ProviderUnavailable("cloudinary"))
}

#[cfg(feature = "s3")]
fn s3_store(assets: &AssetsConfig) -> Result<StoreHandle> {
    let settings = quire_config::S3Settings::resolve(assets).or_raise(|| ErrorKind::Config)?;
    let store = quire_assets::S3Store::new(
        settings.bucket,
        settings.region,
        settings.endpoint,
        settings.public_url,
        settings.key_id,
        settings.key_secret,
    )
    .or_raise(|| ErrorKind::Config)?;
    Ok(Arc::new(store))
}

#[cfg(not(feature = "s3"))]
fn s3_store(_assets: &AssetsConfig) -> Result<StoreHandle> {
    exn::bail!(ErrorKind::ProviderUnavailable("s3"))
}
