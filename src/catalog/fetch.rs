//! Tiered catalog loading: fresh cache, remote, stale cache, bundled fallback.

use std::path::PathBuf;
use std::time::Duration;

use tracing::{debug, info, warn};

use super::{CacheRecord, CatalogCache, CatalogDocument};
use crate::error::StoreError;
use crate::net::RemoteSource;
use crate::util::now_millis;

/// Where a loaded catalog came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provenance {
    /// Cache younger than the TTL; the network was not touched.
    FreshCache,
    /// Just fetched from the remote.
    Remote,
    /// Remote failed; an expired cache record was served.
    StaleCache,
    /// Remote and cache failed; the bundled local document was served.
    Bundled,
}

impl Provenance {
    /// `true` when the document was "served from cache".
    #[must_use]
    pub const fn is_from_cache(self) -> bool {
        matches!(self, Self::FreshCache | Self::StaleCache)
    }
}

/// What: Result of a successful catalog load.
///
/// Details:
/// - `fetched_at_millis` is the original fetch time for cache and remote loads; `None` for
///   the bundled document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedCatalog {
    /// The catalog to display.
    pub document: CatalogDocument,
    /// Which tier produced the document.
    pub provenance: Provenance,
    /// Fetch time of the underlying remote copy, when known.
    pub fetched_at_millis: Option<i64>,
}

/// What: Loads the catalog through the fallback chain.
///
/// Inputs:
/// - A [`RemoteSource`] for the bounded GET and a [`CatalogCache`] for the last-known-good copy.
///
/// Output:
/// - [`LoadedCatalog`] or `StoreError::CatalogUnavailable`.
///
/// Details:
/// - Every successful remote fetch overwrites the cache.
/// - Concurrent calls are not deduplicated; the caller serialises loads per session.
pub struct CatalogFetcher<R, C> {
    /// Remote GET collaborator.
    remote: R,
    /// Durable cache.
    cache: C,
    /// Catalog URL.
    url: String,
    /// Bound for the remote request.
    timeout: Duration,
    /// Freshness window for the cache.
    ttl: Duration,
    /// Bundled local document location.
    fallback_path: Option<PathBuf>,
}

impl<R: RemoteSource, C: CatalogCache> CatalogFetcher<R, C> {
    /// Fetcher with the default 10 s timeout and 5 min TTL and no bundled fallback.
    pub fn new(remote: R, cache: C, url: impl Into<String>) -> Self {
        Self {
            remote,
            cache,
            url: url.into(),
            timeout: Duration::from_secs(10),
            ttl: Duration::from_secs(300),
            fallback_path: None,
        }
    }

    /// Override the remote request bound.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Override the cache freshness window.
    #[must_use]
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Use the document at `path` as the last-resort tier.
    #[must_use]
    pub fn with_fallback(mut self, path: Option<PathBuf>) -> Self {
        self.fallback_path = path;
        self
    }

    /// Access the cache, e.g. for inspection in tools.
    pub const fn cache(&self) -> &C {
        &self.cache
    }

    /// What: Load the catalog, preferring a fresh cache.
    ///
    /// Output:
    /// - Document with provenance, or `CatalogUnavailable` when every tier fails.
    ///
    /// # Errors
    /// - `StoreError::CatalogUnavailable` carrying the remote failure description.
    pub async fn load_catalog(&self) -> Result<LoadedCatalog, StoreError> {
        self.load(false).await
    }

    /// What: Load the catalog, skipping the fresh-cache tier.
    ///
    /// Details:
    /// - Stale-cache and bundled tiers still apply when the remote fails, so a forced refresh
    ///   never loses a catalog that was already displayable.
    ///
    /// # Errors
    /// - `StoreError::CatalogUnavailable` carrying the remote failure description.
    pub async fn refresh_catalog(&self) -> Result<LoadedCatalog, StoreError> {
        self.load(true).await
    }

    /// Walk the tiers in priority order.
    async fn load(&self, skip_fresh: bool) -> Result<LoadedCatalog, StoreError> {
        let cached = self.cache.read();
        let now = now_millis();
        if !skip_fresh
            && let Some(record) = cached.as_ref()
            && record.is_fresh(now, self.ttl)
        {
            info!(
                entries = record.document.entries.len(),
                age_secs = record.age_millis(now) / 1000,
                "catalog served from fresh cache"
            );
            return Ok(LoadedCatalog {
                document: record.document.clone(),
                provenance: Provenance::FreshCache,
                fetched_at_millis: Some(record.fetched_at_millis),
            });
        }

        let remote_err = match self.fetch_remote().await {
            Ok(document) => {
                let fetched_at = now_millis();
                self.cache
                    .write(&CacheRecord::new(document.clone(), fetched_at));
                info!(entries = document.entries.len(), "catalog fetched from remote");
                return Ok(LoadedCatalog {
                    document,
                    provenance: Provenance::Remote,
                    fetched_at_millis: Some(fetched_at),
                });
            }
            Err(e) => e,
        };
        warn!(url = %self.url, error = %remote_err, kind = remote_err.kind(), "catalog fetch failed");

        if let Some(record) = cached {
            info!(
                entries = record.document.entries.len(),
                age_secs = record.age_millis(now) / 1000,
                "catalog served from stale cache"
            );
            return Ok(LoadedCatalog {
                document: record.document,
                provenance: Provenance::StaleCache,
                fetched_at_millis: Some(record.fetched_at_millis),
            });
        }

        if let Some(document) = self.load_fallback() {
            info!(entries = document.entries.len(), "catalog served from bundled fallback");
            return Ok(LoadedCatalog {
                document,
                provenance: Provenance::Bundled,
                fetched_at_millis: None,
            });
        }

        Err(StoreError::CatalogUnavailable {
            cause: remote_err.to_string(),
        })
    }

    /// Bounded GET plus status and body validation.
    async fn fetch_remote(&self) -> Result<CatalogDocument, StoreError> {
        let response = self.remote.get(&self.url, self.timeout).await?;
        if !response.is_success() {
            return Err(StoreError::HttpStatus {
                code: response.status,
            });
        }
        CatalogDocument::from_json_slice(&response.body)
    }

    /// Read and decode the bundled document, if configured and valid.
    fn load_fallback(&self) -> Option<CatalogDocument> {
        let path = self.fallback_path.as_ref()?;
        let body = match std::fs::read(path) {
            Ok(b) => b,
            Err(e) => {
                debug!(path = %path.display(), error = %e, "no bundled catalog");
                return None;
            }
        };
        match CatalogDocument::from_json_slice(&body) {
            Ok(doc) => Some(doc),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "bundled catalog is invalid");
                None
            }
        }
    }
}
