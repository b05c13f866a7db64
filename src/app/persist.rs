use super::services::installed_path;
use crate::state::AppState;

/// What: Persist the installed set if it changed.
///
/// Inputs:
/// - `app`: Application state; nothing is written when `persist_installed` is off.
///
/// Output:
/// - Writes `installed.json` under the cache directory and clears the dirty flag on success.
pub fn maybe_flush_installed(app: &mut AppState) {
    if !app.settings.persist_installed || !app.orchestrator.installed().is_dirty() {
        return;
    }
    let path = installed_path();
    tracing::trace!(path = %path.display(), "[Persist] Writing installed set");
    app.orchestrator.installed_mut().flush(&path);
}
