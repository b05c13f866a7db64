//! Integration tests for the tiered catalog loader.
//!
//! The remote is replaced by a scripted fake; caches are real (memory or disk in a tempdir).

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tvstore::catalog::{
    CacheRecord, CatalogCache, CatalogDocument, CatalogEntry, CatalogFetcher, DiskCatalogCache,
    MemoryCatalogCache, Provenance,
};
use tvstore::error::StoreError;
use tvstore::net::{RemoteResponse, RemoteSource};
use tvstore::util::now_millis;

/// Remote that always gives the same answer and counts calls.
struct FakeRemote {
    answer: Result<RemoteResponse, StoreError>,
    hits: AtomicUsize,
}

impl FakeRemote {
    fn status(status: u16) -> Self {
        Self {
            answer: Ok(RemoteResponse {
                status,
                body: Vec::new(),
            }),
            hits: AtomicUsize::new(0),
        }
    }

    fn json(body: &str) -> Self {
        Self {
            answer: Ok(RemoteResponse {
                status: 200,
                body: body.as_bytes().to_vec(),
            }),
            hits: AtomicUsize::new(0),
        }
    }

    fn unreachable() -> Self {
        Self {
            answer: Err(StoreError::NetworkUnavailable("connection refused".into())),
            hits: AtomicUsize::new(0),
        }
    }
}

impl RemoteSource for FakeRemote {
    async fn get(&self, _url: &str, _timeout: Duration) -> Result<RemoteResponse, StoreError> {
        self.hits.fetch_add(1, Ordering::SeqCst);
        self.answer.clone()
    }
}

fn entry(package: &str) -> CatalogEntry {
    CatalogEntry {
        id: package.to_string(),
        display_name: package.to_uppercase(),
        description: format!("{package} description"),
        version_label: "1.0".into(),
        icon_uri: format!("https://cdn/{package}.png"),
        package_identifier: package.to_string(),
        artifact_uri: format!("https://cdn/{package}.apk"),
    }
}

const REMOTE_BODY: &str = r#"{
    "apps": [
        {"id": "1", "name": "Live TV", "description": "Channels", "version": "2.0",
         "icon": "https://cdn/tv.png", "apkUrl": "https://cdn/tv.apk", "packageName": "org.example.tv"},
        {"id": "2", "name": "Radio", "description": "Stations", "version": "1.4",
         "icon": "https://cdn/radio.png", "apkUrl": "https://cdn/radio.apk", "packageName": "org.example.radio"}
    ],
    "headerImage": "https://cdn/banner.png"
}"#;

#[tokio::test]
/// What: HTTP 500 with only an hour-old cache record.
///
/// Inputs:
/// - Remote answering 500; cache record fetched one hour ago (TTL 5 min).
///
/// Output:
/// - The stale document, flagged as served from cache.
async fn stale_cache_served_when_remote_returns_500() {
    let doc = CatalogDocument {
        entries: vec![entry("org.example.tv")],
        banner_image: None,
    };
    let fetched_at = now_millis() - 60 * 60 * 1000;
    let cache = MemoryCatalogCache::with_record(CacheRecord::new(doc.clone(), fetched_at));
    let fetcher = CatalogFetcher::new(FakeRemote::status(500), cache, "https://catalog/apps.json");

    let loaded = fetcher.load_catalog().await.expect("stale cache is a success");
    assert_eq!(loaded.provenance, Provenance::StaleCache);
    assert!(loaded.provenance.is_from_cache());
    assert_eq!(loaded.document, doc);
    assert_eq!(loaded.fetched_at_millis, Some(fetched_at));
}

#[tokio::test]
/// What: Remote and cache unavailable with a two-entry bundled document.
///
/// Output:
/// - Both bundled entries, provenance `Bundled`, no error.
async fn bundled_fallback_served_when_everything_else_fails() {
    let dir = tempfile::tempdir().expect("tempdir");
    let fallback = dir.path().join("catalog.fallback.json");
    std::fs::write(&fallback, REMOTE_BODY).expect("write fallback");

    let fetcher = CatalogFetcher::new(
        FakeRemote::unreachable(),
        MemoryCatalogCache::default(),
        "https://catalog/apps.json",
    )
    .with_fallback(Some(fallback));

    let loaded = fetcher.load_catalog().await.expect("fallback is a success");
    assert_eq!(loaded.provenance, Provenance::Bundled);
    assert_eq!(loaded.document.entries.len(), 2);
    assert_eq!(loaded.document.entries[0].package_identifier, "org.example.tv");
    assert_eq!(loaded.document.entries[1].display_name, "Radio");
    assert!(loaded.fetched_at_millis.is_none());
}

#[tokio::test]
/// What: Every tier failing surfaces `CatalogUnavailable` with the remote cause.
async fn catalog_unavailable_when_no_tier_answers() {
    let dir = tempfile::tempdir().expect("tempdir");
    let fetcher = CatalogFetcher::new(
        FakeRemote::status(503),
        MemoryCatalogCache::default(),
        "https://catalog/apps.json",
    )
    .with_fallback(Some(dir.path().join("missing.json")));

    match fetcher.load_catalog().await {
        Err(StoreError::CatalogUnavailable { cause }) => assert!(cause.contains("503")),
        other => panic!("expected CatalogUnavailable, got {other:?}"),
    }
}

#[tokio::test]
/// What: A record written after a successful fetch reproduces the document within the TTL.
///
/// Inputs:
/// - Disk cache in a tempdir; first load hits the remote, second load happens right after.
///
/// Output:
/// - Second load is `FreshCache`, identical document, remote not called again.
async fn disk_cache_round_trip_within_ttl() {
    let dir = tempfile::tempdir().expect("tempdir");
    let remote = FakeRemote::json(REMOTE_BODY);
    let fetcher = CatalogFetcher::new(remote, DiskCatalogCache::in_dir(dir.path()), "u");

    let first = fetcher.load_catalog().await.expect("remote load");
    assert_eq!(first.provenance, Provenance::Remote);
    assert!(dir.path().join(DiskCatalogCache::FILE_NAME).is_file());

    let second = fetcher.load_catalog().await.expect("cached load");
    assert_eq!(second.provenance, Provenance::FreshCache);
    assert_eq!(second.document, first.document);

    let reopened = DiskCatalogCache::in_dir(dir.path())
        .read()
        .expect("record on disk");
    assert_eq!(reopened.document, first.document);
    assert_eq!(Some(reopened.fetched_at_millis), first.fetched_at_millis);
}

#[tokio::test]
/// What: A forced refresh goes to the remote even with a fresh cache, and overwrites it.
async fn refresh_bypasses_fresh_cache() {
    let old = CatalogDocument {
        entries: vec![entry("org.example.old")],
        banner_image: None,
    };
    let cache = MemoryCatalogCache::with_record(CacheRecord::new(old, now_millis()));
    let fetcher = CatalogFetcher::new(FakeRemote::json(REMOTE_BODY), cache, "u")
        .with_ttl(Duration::from_secs(3600));

    let fresh = fetcher.load_catalog().await.expect("fresh");
    assert_eq!(fresh.provenance, Provenance::FreshCache);

    let refreshed = fetcher.refresh_catalog().await.expect("refresh");
    assert_eq!(refreshed.provenance, Provenance::Remote);
    assert_eq!(refreshed.document.entries.len(), 2);
    let stored = fetcher.cache().read().expect("overwritten record");
    assert_eq!(stored.document, refreshed.document);
}

#[tokio::test]
/// What: A document without `apps` is an empty catalog, not an error.
async fn missing_apps_is_empty_catalog() {
    let fetcher = CatalogFetcher::new(
        FakeRemote::json(r#"{"headerImage": "https://cdn/b.png"}"#),
        MemoryCatalogCache::default(),
        "u",
    );
    let loaded = fetcher.load_catalog().await.expect("empty catalog");
    assert!(loaded.document.entries.is_empty());
    assert!(loaded.document.has_banner());
}
