//! Durable last-known-good catalog record.

use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::CatalogDocument;

/// Disk cache entry with the document and the fetch time (for serialization).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheRecord {
    /// Catalog as last fetched from the remote.
    pub document: CatalogDocument,
    /// Unix time in milliseconds when the document was fetched.
    pub fetched_at_millis: i64,
}

impl CacheRecord {
    /// Wrap a freshly fetched document.
    #[must_use]
    pub const fn new(document: CatalogDocument, fetched_at_millis: i64) -> Self {
        Self {
            document,
            fetched_at_millis,
        }
    }

    /// What: Age of the record relative to `now_millis`.
    ///
    /// Output:
    /// - Milliseconds since fetch; negative when the clock moved backwards.
    #[must_use]
    pub const fn age_millis(&self, now_millis: i64) -> i64 {
        now_millis.saturating_sub(self.fetched_at_millis)
    }

    /// What: Decide whether the record can be served without a network round-trip.
    ///
    /// Inputs:
    /// - `now_millis`: Current wall-clock time.
    /// - `ttl`: Freshness window.
    ///
    /// Output:
    /// - `true` iff `age < ttl`. Records from the future count as fresh.
    #[must_use]
    pub fn is_fresh(&self, now_millis: i64, ttl: Duration) -> bool {
        let ttl_ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
        self.age_millis(now_millis) < ttl_ms
    }
}

/// What: Durable store for the last-known-good catalog.
///
/// Details:
/// - Reads never fail loudly: an unreadable store behaves as empty.
/// - Writes overwrite unconditionally and log failures instead of returning them.
pub trait CatalogCache: Send + Sync {
    /// Return the stored record, if any.
    fn read(&self) -> Option<CacheRecord>;
    /// Replace the stored record.
    fn write(&self, record: &CacheRecord);
}

/// JSON-file backed cache living under the app cache directory.
#[derive(Debug, Clone)]
pub struct DiskCatalogCache {
    /// Location of the JSON file.
    path: PathBuf,
}

impl DiskCatalogCache {
    /// Cache stored at `path`.
    #[must_use]
    pub const fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// File name used inside the cache directory.
    pub const FILE_NAME: &'static str = "catalog_cache.json";

    /// Cache stored as [`Self::FILE_NAME`] inside `dir`.
    #[must_use]
    pub fn in_dir(dir: &Path) -> Self {
        Self::new(dir.join(Self::FILE_NAME))
    }

    /// Backing file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CatalogCache for DiskCatalogCache {
    fn read(&self) -> Option<CacheRecord> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) => {
                debug!(path = %self.path.display(), error = %e, "no catalog cache on disk");
                return None;
            }
        };
        match serde_json::from_str::<CacheRecord>(&content) {
            Ok(record) => {
                debug!(
                    path = %self.path.display(),
                    entries = record.document.entries.len(),
                    fetched_at = record.fetched_at_millis,
                    "loaded catalog cache"
                );
                Some(record)
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "ignoring corrupt catalog cache");
                None
            }
        }
    }

    fn write(&self, record: &CacheRecord) {
        if let Some(parent) = self.path.parent()
            && let Err(e) = std::fs::create_dir_all(parent)
        {
            warn!(
                path = %self.path.display(),
                error = %e,
                "failed to create parent directory for catalog cache"
            );
            return;
        }
        match serde_json::to_string(record) {
            Ok(json) => {
                if let Err(e) = std::fs::write(&self.path, json) {
                    warn!(path = %self.path.display(), error = %e, "failed to write catalog cache");
                } else {
                    debug!(
                        path = %self.path.display(),
                        entries = record.document.entries.len(),
                        "saved catalog cache"
                    );
                }
            }
            Err(e) => warn!(error = %e, "failed to serialize catalog cache"),
        }
    }
}

/// In-process cache, for sessions without a writable cache directory.
#[derive(Debug, Default)]
pub struct MemoryCatalogCache {
    /// Stored record.
    slot: Mutex<Option<CacheRecord>>,
}

impl MemoryCatalogCache {
    /// Cache pre-seeded with `record`.
    #[must_use]
    pub const fn with_record(record: CacheRecord) -> Self {
        Self {
            slot: Mutex::new(Some(record)),
        }
    }
}

impl CatalogCache for MemoryCatalogCache {
    fn read(&self) -> Option<CacheRecord> {
        self.slot
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    fn write(&self, record: &CacheRecord) {
        *self
            .slot
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = Some(record.clone());
    }
}
