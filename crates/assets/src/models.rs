use serde::Serialize;
use std::path::Path;

const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "webm", "m4v", "avi", "mkv", "ogv"];

/// How the remote store should treat an asset.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Image,
    Video,
}
impl ResourceKind {
    /// Decide by (case-insensitive) file extension; anything that isn't a
    /// known video container is treated as an image.
    ///
    /// ```
    /// use std::path::Path;
    /// use quire_assets::ResourceKind;
    /// assert_eq!(ResourceKind::from_path(Path::new("trip/clip.MOV")), ResourceKind::Video);
    /// assert_eq!(ResourceKind::from_path(Path::new("trip/beach.jpg")), ResourceKind::Image);
    /// ```
    pub fn from_path(path: &Path) -> Self {
        let is_video = path
            .extension()
            .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
            .is_some_and(|ext| VIDEO_EXTENSIONS.contains(&ext.as_str()));
        if is_video { Self::Video } else { Self::Image }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Video => "video",
        }
    }
}

/// Transformations applied by the store as the asset is ingested.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum Transformation {
    /// Let the store pick the compression level.
    AutoQuality,
    /// Let the store pick the delivery format per client.
    AutoFormat,
}
impl Transformation {
    /// Cloudinary-style transformation parameter.
    pub fn as_param(&self) -> &'static str {
        match self {
            Self::AutoQuality => "q_auto",
            Self::AutoFormat => "f_auto",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct UploadOptions {
    /// Remote identifier; re-using it replaces the existing asset.
    pub public_id: String,
    pub overwrite: bool,
    pub resource_kind: ResourceKind,
    pub transformations: Vec<Transformation>,
}
impl UploadOptions {
    /// Joined transformation string (`q_auto,f_auto`), `None` if empty.
    pub fn transformation_param(&self) -> Option<String> {
        if self.transformations.is_empty() {
            return None;
        }
        Some(self.transformations.iter().map(Transformation::as_param).collect::<Vec<_>>().join(","))
    }
}

/// What the store hands back after a successful upload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct UploadedAsset {
    pub secure_url: String,
    pub public_id: String,
    pub bytes: u64,
}
