use crate::error::{Error, ErrorKind};
use exn::ResultExt;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

/// What the cache remembers about one uploaded media file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    /// BLAKE3 digest of the local file when it was last uploaded.
    pub hash: String,
    /// Permanent remote URL returned by the asset store.
    pub url: String,
    /// Remote-side identifier of the asset.
    pub remote_id: String,
    pub uploaded_at: OffsetDateTime,
}
impl CacheEntry {
    pub fn new(hash: impl Into<String>, url: impl Into<String>, remote_id: impl Into<String>) -> Self {
        Self {
            hash: hash.into(),
            url: url.into(),
            remote_id: remote_id.into(),
            uploaded_at: OffsetDateTime::now_utc(),
        }
    }
}

/// On-disk shape of a [`CacheEntry`].
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct EntryRecord {
    hash: String,
    url: String,
    public_id: String,
    uploaded_at: String,
}
impl TryFrom<&CacheEntry> for EntryRecord {
    type Error = Error;
    fn try_from(entry: &CacheEntry) -> Result<Self, Self::Error> {
        Ok(Self {
            hash: entry.hash.clone(),
            url: entry.url.clone(),
            public_id: entry.remote_id.clone(),
            uploaded_at: entry.uploaded_at.format(&Rfc3339).or_raise(|| ErrorKind::InvalidData("uploaded_at"))?,
        })
    }
}
impl TryFrom<EntryRecord> for CacheEntry {
    type Error = Error;
    fn try_from(record: EntryRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            uploaded_at: OffsetDateTime::parse(&record.uploaded_at, &Rfc3339)
                .or_raise(|| ErrorKind::InvalidData("uploaded_at"))?,
            hash: record.hash,
            url: record.url,
            remote_id: record.public_id,
        })
    }
}

/// Builds the form a media path takes inside content: `/<marker>/<path>`.
///
/// ```
/// assert_eq!(quire_cache::local_reference("media", "foo/bar.jpg"), "/media/foo/bar.jpg");
/// assert_eq!(quire_cache::local_reference("/media/", "foo/bar.jpg"), "/media/foo/bar.jpg");
/// ```
pub fn local_reference(marker: &str, path: &str) -> String {
    format!("/{}/{}", marker.trim_matches('/'), path.trim_start_matches('/'))
}

/// The full cache: media path to [`CacheEntry`], ordered by path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Mapping {
    entries: BTreeMap<String, CacheEntry>,
}
impl Mapping {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, path: &str) -> Option<&CacheEntry> {
        self.entries.get(path)
    }

    /// Insert or replace the entry for `path`, returning the previous one.
    pub fn insert(&mut self, path: impl Into<String>, entry: CacheEntry) -> Option<CacheEntry> {
        self.entries.insert(path.into(), entry)
    }

    /// Returns `true` if `path` was uploaded with exactly these bytes.
    pub fn is_fresh(&self, path: &str, hash: &str) -> bool {
        self.entries.get(path).is_some_and(|entry| entry.hash == hash)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &CacheEntry)> {
        self.entries.iter().map(|(path, entry)| (path.as_str(), entry))
    }

    /// Read-only view: local reference form to remote URL.
    pub fn url_mappings(&self, marker: &str) -> BTreeMap<String, String> {
        self.iter().map(|(path, entry)| (local_reference(marker, path), entry.url.clone())).collect()
    }

    /// Rebuild from persisted records, dropping entries that don't parse.
    pub(crate) fn from_records(records: BTreeMap<String, EntryRecord>) -> Self {
        let entries = records
            .into_iter()
            .filter_map(|(path, record)| match CacheEntry::try_from(record) {
                Ok(entry) => Some((path, entry)),
                Err(e) => {
                    tracing::warn!(path = %path, error = %*e, "Dropping unreadable cache entry; it will be re-uploaded");
                    None
                },
            })
            .collect();
        Self { entries }
    }

    pub(crate) fn to_records(&self) -> Result<BTreeMap<String, EntryRecord>, Error> {
        self.entries.iter().map(|(path, entry)| Ok((path.clone(), EntryRecord::try_from(entry)?))).collect()
    }
}
impl FromIterator<(String, CacheEntry)> for Mapping {
    fn from_iter<I: IntoIterator<Item = (String, CacheEntry)>>(iter: I) -> Self {
        Self { entries: iter.into_iter().collect() }
    }
}
