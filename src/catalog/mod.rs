//! Catalog document model, cache, and tiered fetcher.
//!
//! The document is immutable once loaded and replaced wholesale on refresh.
//! Loading goes through [`CatalogFetcher`], which walks fresh cache, remote,
//! stale cache, and the bundled fallback in that order.

use std::collections::HashSet;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::StoreError;

mod cache;
mod fetch;

pub use cache::{CacheRecord, CatalogCache, DiskCatalogCache, MemoryCatalogCache};
pub use fetch::{CatalogFetcher, LoadedCatalog, Provenance};

/// What: Full catalog as published remotely.
///
/// Inputs:
/// - Deserialised from `{ "apps": [...], "headerImage": "..." }`.
///
/// Output:
/// - Ordered entries plus an optional banner image shown above the grid.
///
/// Details:
/// - A missing or `null` `apps` field yields an empty catalog, not an error.
/// - An empty `headerImage` string is treated as absent.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogDocument {
    /// Entries in display order.
    #[serde(rename = "apps", default, deserialize_with = "null_as_empty")]
    pub entries: Vec<CatalogEntry>,
    /// Optional non-interactive banner image URI.
    #[serde(
        rename = "headerImage",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub banner_image: Option<String>,
}

/// What: One installable package in the catalog.
///
/// Details:
/// - `package_identifier` is the stable join key between the catalog, download jobs, and the
///   installed set.
/// - Text fields default to empty strings when missing from the document.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// Unique entry id; falls back to the package identifier when missing.
    #[serde(default)]
    pub id: String,
    /// Name shown on the card.
    #[serde(rename = "name", default)]
    pub display_name: String,
    /// Short description shown under the name.
    #[serde(default)]
    pub description: String,
    /// Version label, displayed verbatim.
    #[serde(rename = "version", default)]
    pub version_label: String,
    /// Icon image URI.
    #[serde(rename = "icon", default)]
    pub icon_uri: String,
    /// Stable package identifier used by the system installer.
    #[serde(rename = "packageName", default)]
    pub package_identifier: String,
    /// URI of the installable artifact.
    #[serde(rename = "apkUrl", default)]
    pub artifact_uri: String,
}

/// Treat an explicit `null` list like a missing one.
fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<CatalogEntry>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<CatalogEntry>>::deserialize(deserializer)?.unwrap_or_default())
}

impl CatalogDocument {
    /// What: Decode a catalog body and enforce the entry invariants.
    ///
    /// Inputs:
    /// - `body`: Raw JSON bytes from the remote source, cache, or fallback file.
    ///
    /// Output:
    /// - Normalised document, or `StoreError::MalformedCatalog` when the JSON does not match.
    ///
    /// # Errors
    /// - Returns `MalformedCatalog` for invalid JSON or a non-object top level.
    pub fn from_json_slice(body: &[u8]) -> Result<Self, StoreError> {
        let doc: Self = serde_json::from_slice(body)?;
        Ok(doc.normalized())
    }

    /// What: Drop unusable or duplicate entries and tidy optional fields.
    ///
    /// Output:
    /// - Document whose entries all carry a package identifier and artifact URI, with unique
    ///   ids and package identifiers (first occurrence wins).
    #[must_use]
    pub fn normalized(mut self) -> Self {
        let mut seen_ids: HashSet<String> = HashSet::new();
        let mut seen_packages: HashSet<String> = HashSet::new();
        self.entries.retain_mut(|entry| {
            entry.package_identifier = entry.package_identifier.trim().to_string();
            entry.artifact_uri = entry.artifact_uri.trim().to_string();
            if entry.package_identifier.is_empty() || entry.artifact_uri.is_empty() {
                tracing::warn!(
                    id = %entry.id,
                    name = %entry.display_name,
                    "dropping catalog entry without packageName or apkUrl"
                );
                return false;
            }
            if entry.id.trim().is_empty() {
                entry.id.clone_from(&entry.package_identifier);
            }
            if !seen_packages.insert(entry.package_identifier.clone())
                || !seen_ids.insert(entry.id.clone())
            {
                tracing::warn!(
                    id = %entry.id,
                    package = %entry.package_identifier,
                    "dropping duplicate catalog entry"
                );
                return false;
            }
            true
        });
        if self
            .banner_image
            .as_deref()
            .is_some_and(|b| b.trim().is_empty())
        {
            self.banner_image = None;
        }
        self
    }

    /// `true` when the document has a banner above the grid.
    #[must_use]
    pub const fn has_banner(&self) -> bool {
        self.banner_image.is_some()
    }

    /// Look up an entry by package identifier.
    #[must_use]
    pub fn entry(&self, package: &str) -> Option<&CatalogEntry> {
        self.entries
            .iter()
            .find(|e| e.package_identifier == package)
    }
}
