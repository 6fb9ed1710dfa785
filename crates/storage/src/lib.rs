//! Rooted file trees behind one async interface.
//!
//! Both the content corpus (markdown documents, grouped into category
//! directories) and the media library (source images and videos) are exposed
//! as a [`StorageBackend`]: every path handed to a backend is relative to its
//! root and is validated so it can never escape it.

pub mod backend;
pub mod error;
mod file;
mod path;

pub use crate::backend::StorageBackend;
pub use crate::file::FileInfo;
pub use crate::path::{to_slash_string, validate as validate_path};
use std::sync::Arc;

pub type BackendHandle = Arc<dyn StorageBackend + Send + Sync>;
