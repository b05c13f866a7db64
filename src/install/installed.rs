//! Set of packages believed installed, with optional JSON persistence.

use std::collections::BTreeSet;
use std::path::Path;

use tracing::{debug, warn};

/// What: Package identifiers confirmed by probing.
///
/// Details:
/// - An approximation, never ground truth: entries come only from positive probes.
/// - `dirty` tracks unsaved changes so the shell can flush on its tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstalledSet {
    /// Confirmed package identifiers.
    packages: BTreeSet<String>,
    /// Changed since the last save.
    dirty: bool,
}

impl InstalledSet {
    /// File name used inside the cache directory.
    pub const FILE_NAME: &'static str = "installed.json";

    /// `true` when `package` is believed installed.
    #[must_use]
    pub fn contains(&self, package: &str) -> bool {
        self.packages.contains(package)
    }

    /// Record a positive probe. Returns `true` if the package was new.
    pub fn insert(&mut self, package: &str) -> bool {
        let added = self.packages.insert(package.to_string());
        self.dirty |= added;
        added
    }

    /// Number of packages in the set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.packages.len()
    }

    /// `true` when nothing is believed installed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    /// Iterate in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.packages.iter().map(String::as_str)
    }

    /// `true` when there are unsaved changes.
    #[must_use]
    pub const fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// What: Load a persisted set.
    ///
    /// Output:
    /// - The stored set, or empty when the file is missing or corrupt.
    #[must_use]
    pub fn load(path: &Path) -> Self {
        let Ok(content) = std::fs::read_to_string(path) else {
            debug!(path = %path.display(), "no persisted installed set");
            return Self::default();
        };
        match serde_json::from_str::<BTreeSet<String>>(&content) {
            Ok(packages) => Self {
                packages,
                dirty: false,
            },
            Err(e) => {
                warn!(path = %path.display(), error = %e, "ignoring corrupt installed set");
                Self::default()
            }
        }
    }

    /// What: Write the set if it changed since the last save.
    ///
    /// Details:
    /// - Failures are logged and the set stays dirty so the next flush retries.
    pub fn flush(&mut self, path: &Path) {
        if !self.dirty {
            return;
        }
        if let Some(parent) = path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        match serde_json::to_string(&self.packages) {
            Ok(json) => match std::fs::write(path, json) {
                Ok(()) => {
                    self.dirty = false;
                    debug!(path = %path.display(), count = self.packages.len(), "saved installed set");
                }
                Err(e) => warn!(path = %path.display(), error = %e, "failed to save installed set"),
            },
            Err(e) => warn!(error = %e, "failed to serialize installed set"),
        }
    }
}
