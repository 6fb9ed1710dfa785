use super::document::extract_references;
use super::error::{ErrorKind, Result};
use async_stream::stream;
use exn::ResultExt;
use futures::{Stream, TryStreamExt};
use quire_storage::{FileInfo, StorageBackend};
use std::collections::HashSet;
use std::path::PathBuf;
use std::pin::pin;
use tracing::instrument;

/// Extensions (lowercase) of files treated as documents.
pub const DOCUMENT_EXTENSIONS: &[&str] = &["md", "mdx", "markdown"];

/// Lazily walk the documents of every category, in category order.
///
/// A category directory that does not exist contributes nothing. The first
/// listing error ends the stream.
pub fn documents<'a>(
    content: &'a dyn StorageBackend,
    categories: &'a [String],
) -> impl Stream<Item = Result<FileInfo>> + Send + 'a {
    stream! {
        for category in categories {
            let prefix = PathBuf::from(category);
            let mut listing = content.list_stream(Some(&prefix));
            loop {
                match listing.try_next().await.or_raise(|| ErrorKind::List(category.clone())) {
                    Ok(Some(file)) if file.has_extension(DOCUMENT_EXTENSIONS) => {
                        yield Ok(file);
                    },
                    Ok(Some(_)) => {},
                    Ok(None) => break,
                    Err(e) => {
                        yield Err(e);
                        return;
                    },
                }
            }
        }
    }
}

/// The deduplicated media paths referenced across the corpus, in discovery
/// order.
///
/// Does not check that the referenced files exist.
#[instrument(skip_all, fields(categories = categories.len()))]
pub async fn scan_references(content: &dyn StorageBackend, categories: &[String], marker: &str) -> Result<Vec<String>> {
    let mut seen = HashSet::new();
    let mut references = Vec::new();
    let mut files = pin!(documents(content, categories));
    let mut scanned = 0usize;
    while let Some(file) = files.try_next().await? {
        let bytes = content.read(&file.path).await.or_raise(|| ErrorKind::Read(file.path.clone()))?;
        let text = String::from_utf8_lossy(&bytes);
        for path in extract_references(&text, marker) {
            if seen.insert(path.clone()) {
                tracing::trace!(document = %file.path.display(), reference = %path, "Media reference discovered");
                references.push(path);
            }
        }
        scanned += 1;
    }
    tracing::debug!(documents = scanned, references = references.len(), "Content scanned");
    Ok(references)
}
