//! Storage backend trait and implementations.
//!
//! The [`StorageBackend`] trait is deliberately small: publishing only ever
//! needs to walk a tree, check for and read files, and overwrite documents in
//! place.

mod local;
#[cfg(feature = "mock")]
mod mock;

pub use self::local::LocalBackend;
#[cfg(feature = "mock")]
pub use self::mock::MockBackend;
use crate::error::{ErrorKind, Result};
use crate::file::FileInfo;
use async_trait::async_trait;
use futures::Stream;
use std::io::Read;
use std::path::Path;
use std::pin::Pin;

pub type FileInfoStream<'a> = Pin<Box<dyn Stream<Item = Result<FileInfo>> + Send + 'a>>;
pub type BoxSyncRead = Box<dyn Read + Send + 'static>;

/// Unified interface for a rooted tree of files.
///
/// # Path Handling
/// All paths are relative to the backend root and are validated using
/// [`validate_path`](crate::validate_path) before use. Implementations must
/// enforce this validation.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use quire_storage::{backend::StorageBackend, error::Result};
///
/// async fn size_of_cover(media: &dyn StorageBackend) -> Result<u64> {
///     let path = Path::new("posts/cover.jpg");
///     if media.exists(path).await? {
///         Ok(media.read(path).await?.len() as u64)
///     } else {
///         Ok(0)
///     }
/// }
/// ```
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Name of the backend (used for logging only).
    fn name(&self) -> &str;

    /// Lazily walk every file under an optional prefix.
    ///
    /// The stream is finite and restartable: calling this again walks the
    /// tree afresh. A prefix that does not exist yields an empty stream, not
    /// an error. Traversal order is whatever the backend produces and is not
    /// guaranteed to be stable between runs.
    ///
    /// # Examples
    ///
    /// ```
    /// use futures::TryStreamExt;
    /// use std::path::Path;
    /// # use quire_storage::{backend::StorageBackend, error::Result};
    /// # async fn example(content: &dyn StorageBackend) -> Result<()> {
    /// let mut posts = content.list_stream(Some(Path::new("posts")));
    /// while let Some(info) = posts.try_next().await? {
    ///     println!("{}", info.path.display());
    /// }
    /// # Ok(())
    /// # }
    /// ```
    fn list_stream<'a>(&'a self, prefix: Option<&'a Path>) -> FileInfoStream<'a>;

    /// Check if a file exists.
    async fn exists(&self, path: &Path) -> Result<bool>;

    /// Read file contents.
    ///
    /// Returns [`NotFound`](crate::error::ErrorKind::NotFound) if the file
    /// does not exist.
    async fn read(&self, path: &Path) -> Result<Vec<u8>>;

    /// Open a file for reading without loading it into memory.
    ///
    /// The reader is blocking; use it from
    /// [`spawn_blocking()`](tokio::task::spawn_blocking). Returns
    /// [`NotFound`](crate::error::ErrorKind::NotFound) if the file does not
    /// exist.
    async fn reader(&self, path: &Path) -> Result<BoxSyncRead>;

    /// Read a file as UTF-8 text.
    ///
    /// Returns [`InvalidText`](crate::error::ErrorKind::InvalidText) if the
    /// bytes are not valid UTF-8.
    async fn read_to_string(&self, path: &Path) -> Result<String> {
        let bytes = self.read(path).await?;
        String::from_utf8(bytes).map_err(|_| exn::Exn::from(ErrorKind::InvalidText(path.to_path_buf())))
    }

    /// Write file contents, creating parent directories as needed and
    /// overwriting whatever was there.
    async fn write(&self, path: &Path, data: &[u8]) -> Result<()>;
}
