//! Path validation for root-relative storage paths.
//!
//! Media references are lifted straight out of document text, so anything a
//! backend is asked to touch goes through [`validate`] first.

use std::path::{Component, Path, PathBuf};

use crate::error::{ErrorKind, Result};

/// Validates and normalises a root-relative path.
///
/// Leading slashes and `.` segments are dropped, `..` segments are resolved
/// against the components seen so far, and anything that would climb out of
/// the root (or is empty once normalised) is rejected with
/// [`InvalidPath`](crate::error::ErrorKind::InvalidPath). Null bytes are
/// rejected explicitly.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use quire_storage::validate_path;
/// assert_eq!(validate_path("/blog/cover.jpg").unwrap(), Path::new("blog/cover.jpg"));
/// assert_eq!(validate_path("blog/./drafts/../cover.jpg").unwrap(), Path::new("blog/cover.jpg"));
/// assert!(validate_path("../secrets.txt").is_err());
/// assert!(validate_path("a/../../b").is_err());
/// ```
pub fn validate(path: impl AsRef<Path>) -> Result<PathBuf> {
    let original = path.as_ref();
    let mut components = Vec::new();
    for component in original.components() {
        match component {
            Component::Normal(segment) => {
                // Null bytes survive Path::components() on Unix but truncate
                // in C-based syscalls.
                if segment.as_encoded_bytes().contains(&0) {
                    exn::bail!(ErrorKind::InvalidPath(original.to_path_buf()));
                }
                components.push(segment);
            },
            Component::CurDir | Component::RootDir => {},
            Component::Prefix(_) => exn::bail!(ErrorKind::InvalidPath(original.to_path_buf())),
            Component::ParentDir => {
                if components.pop().is_none() {
                    exn::bail!(ErrorKind::InvalidPath(original.to_path_buf()));
                }
            },
        }
    }
    if components.is_empty() {
        exn::bail!(ErrorKind::InvalidPath(original.to_path_buf()));
    }
    Ok(components.into_iter().collect())
}

/// Renders a validated relative path with `/` separators on every platform.
///
/// Cache keys and remote identifiers are derived from this form, so they stay
/// stable between a Windows and a Unix checkout of the same content.
///
/// ```
/// use std::path::Path;
/// use quire_storage::to_slash_string;
/// assert_eq!(to_slash_string(Path::new("2024/trip/beach.jpg")), "2024/trip/beach.jpg");
/// ```
pub fn to_slash_string(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(segment) => Some(segment.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}
