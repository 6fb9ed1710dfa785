//! Upload cache for the media library.
//!
//! The cache is the only state that outlives a single publish: a mapping from
//! a media-library-relative path (always `/`-separated) to the remote asset
//! it was last uploaded as, together with the BLAKE3 hash of the bytes that
//! were uploaded. An entry can be trusted only while the file on disk still
//! hashes to the same value; there is no other invalidation.
//!
//! The cache file is not the source of truth. Deleting it only costs
//! re-uploads (which overwrite the same remote assets, since remote
//! identifiers are derived from paths).

mod entry;
pub mod error;
mod store;

pub use crate::entry::{CacheEntry, Mapping, local_reference};
pub use crate::store::UploadCache;

/// Deterministic content digest used purely for change detection.
///
/// ```
/// let a = quire_cache::hash(b"jpeg bytes");
/// assert_eq!(a, quire_cache::hash(b"jpeg bytes"));
/// assert_ne!(a, quire_cache::hash(b"other bytes"));
/// assert_eq!(a.len(), 64);
/// ```
pub fn hash(bytes: impl AsRef<[u8]>) -> String {
    blake3::hash(bytes.as_ref()).to_hex().to_string()
}

/// [`hash()`] of everything `reader` yields, read in chunks.
///
/// ```
/// let bytes = b"video bytes".repeat(10_000);
/// let streamed = quire_cache::hash_reader(std::io::Cursor::new(&bytes)).unwrap();
/// assert_eq!(streamed, quire_cache::hash(&bytes));
/// ```
pub fn hash_reader(reader: impl std::io::Read) -> std::io::Result<String> {
    let mut hasher = blake3::Hasher::new();
    hasher.update_reader(reader)?;
    Ok(hasher.finalize().to_hex().to_string())
}
