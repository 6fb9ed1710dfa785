use std::path::PathBuf;

/// A file found while walking a storage backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    /// Relative path from storage root
    pub path: PathBuf,
}
impl FileInfo {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Lowercased file extension, if any.
    pub fn extension(&self) -> Option<String> {
        self.path.extension().map(|ext| ext.to_string_lossy().to_ascii_lowercase())
    }

    /// Returns `true` if the (case-insensitive) extension is one of `extensions`.
    pub fn has_extension(&self, extensions: &[&str]) -> bool {
        self.extension().is_some_and(|ext| extensions.iter().any(|e| e.eq_ignore_ascii_case(&ext)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_is_lowercased() {
        let info = FileInfo::new("posts/Hello.MD");
        assert_eq!(info.extension().as_deref(), Some("md"));
        assert!(info.has_extension(&["md", "markdown"]));
        assert!(!info.has_extension(&["txt"]));
    }

    #[test]
    fn test_no_extension() {
        let info = FileInfo::new("posts/README");
        assert_eq!(info.extension(), None);
        assert!(!info.has_extension(&["md"]));
    }
}
