//! System installer handoff.

use std::path::Path;
use std::process::{Command, Stdio};

use tracing::{debug, info};

use crate::error::StoreError;
use crate::util::expand_command;

/// Content type passed to the installer for package archives.
pub const PACKAGE_MIME: &str = "application/vnd.android.package-archive";

/// What: Opens a saved artifact with the operating system's installer.
///
/// Details:
/// - Fire-and-forget: success means the installer was launched, not that the package was
///   installed. Confirmation happens by probing.
pub trait Installer: Send + Sync {
    /// Hand `path` with content type `mime` to the installer.
    ///
    /// # Errors
    /// - `StoreError::InstallerHandoff` when the installer cannot be launched.
    fn open(&self, path: &Path, mime: &str) -> Result<(), StoreError>;
}

/// What: [`Installer`] that spawns a configured command.
///
/// Details:
/// - The template is split on whitespace; `{path}` and `{mime}` are substituted per word.
/// - The child is reaped on a detached thread so no zombie is left behind.
#[derive(Debug, Clone)]
pub struct CommandInstaller {
    /// Command template, e.g. `xdg-open {path}`.
    template: String,
}

impl CommandInstaller {
    /// Installer running `template`.
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }
}

impl Installer for CommandInstaller {
    fn open(&self, path: &Path, mime: &str) -> Result<(), StoreError> {
        let path_str = path.to_string_lossy();
        let (program, args) =
            expand_command(&self.template, &[("path", path_str.as_ref()), ("mime", mime)])
                .ok_or_else(|| StoreError::InstallerHandoff("installer command is empty".into()))?;
        if which::which(&program).is_err() {
            return Err(StoreError::InstallerHandoff(format!(
                "{program} not found on PATH"
            )));
        }
        debug!(program = %program, args = ?args, "launching installer");
        let mut child = Command::new(&program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| StoreError::InstallerHandoff(format!("{program}: {e}")))?;
        info!(program = %program, path = %path.display(), pid = child.id(), "installer launched");
        std::thread::spawn(move || {
            let _ = child.wait();
        });
        Ok(())
    }
}
