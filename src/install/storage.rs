//! Filesystem collaborator for saving downloaded artifacts.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::StoreError;
use crate::transfer::TransferOutput;
use crate::util::file_stem_for;

/// What: Storage operations the install flow needs.
///
/// Details:
/// - `mkdir` is recursive and tolerates an existing directory.
/// - `write` and `adopt` return the final location of the artifact.
pub trait Storage: Send + Sync {
    /// Create `path` and its parents.
    ///
    /// # Errors
    /// - `StoreError::Storage` when the directory cannot be created.
    fn mkdir(&self, path: &Path) -> Result<(), StoreError>;

    /// Write `bytes` to `path`, replacing any existing file.
    ///
    /// # Errors
    /// - `StoreError::Storage` on any write failure.
    fn write(&self, path: &Path, bytes: &[u8]) -> Result<PathBuf, StoreError>;

    /// Move an already-downloaded file from `from` to `to`.
    ///
    /// # Errors
    /// - `StoreError::Storage` when the file cannot be moved.
    fn adopt(&self, from: &Path, to: &Path) -> Result<PathBuf, StoreError>;
}

/// Deterministic artifact file name for `package`.
#[must_use]
pub fn artifact_file_name(package: &str) -> String {
    format!("{}.apk", file_stem_for(package))
}

/// Deterministic artifact path for `package` under `root`.
#[must_use]
pub fn artifact_path(root: &Path, package: &str) -> PathBuf {
    root.join(artifact_file_name(package))
}

/// What: Persist a finished transfer under the package's deterministic path.
///
/// Inputs:
/// - `storage`: Filesystem collaborator.
/// - `root`: Storage root (downloads directory).
/// - `package`: Package identifier keying the path.
/// - `output`: In-memory payload or completed file.
///
/// Output:
/// - Final artifact path.
///
/// # Errors
/// - `StoreError::Storage` from `mkdir`, `write`, or `adopt`.
pub fn save_artifact(
    storage: &dyn Storage,
    root: &Path,
    package: &str,
    output: &TransferOutput,
) -> Result<PathBuf, StoreError> {
    storage.mkdir(root)?;
    let target = artifact_path(root, package);
    match output {
        TransferOutput::Payload(bytes) => storage.write(&target, bytes),
        TransferOutput::File(from) => storage.adopt(from, &target),
    }
}

/// Local-disk [`Storage`].
#[derive(Debug, Clone, Copy, Default)]
pub struct DiskStorage;

impl Storage for DiskStorage {
    fn mkdir(&self, path: &Path) -> Result<(), StoreError> {
        match std::fs::create_dir_all(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::AlreadyExists && path.is_dir() => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, path: &Path, bytes: &[u8]) -> Result<PathBuf, StoreError> {
        let tmp = path.with_extension("apk.tmp");
        std::fs::write(&tmp, bytes)?;
        std::fs::rename(&tmp, path)?;
        debug!(path = %path.display(), bytes = bytes.len(), "artifact written");
        Ok(path.to_path_buf())
    }

    fn adopt(&self, from: &Path, to: &Path) -> Result<PathBuf, StoreError> {
        if from == to {
            return Ok(to.to_path_buf());
        }
        if std::fs::rename(from, to).is_err() {
            // Cross-device moves need a copy.
            std::fs::copy(from, to)?;
            if let Err(e) = std::fs::remove_file(from) {
                debug!(path = %from.display(), error = %e, "could not remove source after copy");
            }
        }
        debug!(from = %from.display(), to = %to.display(), "artifact adopted");
        Ok(to.to_path_buf())
    }
}
