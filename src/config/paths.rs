use std::env;
use std::path::{Path, PathBuf};

/// Application directory name under the user's config base.
const APP_DIR: &str = "tvstore";

/// What: Resolve the config base directory from explicit environment values.
///
/// Inputs:
/// - `override_dir`: Value of `TVSTORE_CONFIG_DIR`, used verbatim when non-empty.
/// - `home`: Value of `HOME`.
/// - `xdg_config`: Value of `XDG_CONFIG_HOME`.
///
/// Output:
/// - Directory path (not created).
///
/// Details:
/// - Priority: override, `$HOME/.config/tvstore`, `$XDG_CONFIG_HOME/tvstore`, `./.tvstore`.
#[must_use]
pub fn resolve_config_dir(
    override_dir: Option<&str>,
    home: Option<&str>,
    xdg_config: Option<&str>,
) -> PathBuf {
    if let Some(dir) = override_dir.filter(|d| !d.trim().is_empty()) {
        return PathBuf::from(dir);
    }
    if let Some(h) = home.filter(|h| !h.trim().is_empty()) {
        return Path::new(h).join(".config").join(APP_DIR);
    }
    if let Some(x) = xdg_config.filter(|x| !x.trim().is_empty()) {
        return Path::new(x).join(APP_DIR);
    }
    PathBuf::from(".").join(format!(".{APP_DIR}"))
}

/// What: Create `dir` if needed and return it.
///
/// Details:
/// - Creation failures are logged; callers discover unusable directories on first write.
fn ensured(dir: PathBuf) -> PathBuf {
    if let Err(e) = std::fs::create_dir_all(&dir) {
        tracing::warn!(path = %dir.display(), error = %e, "failed to create directory");
    }
    dir
}

/// Config directory for tvstore (ensured to exist).
pub fn config_dir() -> PathBuf {
    let override_dir = env::var("TVSTORE_CONFIG_DIR").ok();
    let home = env::var("HOME").ok();
    let xdg = env::var("XDG_CONFIG_HOME").ok();
    ensured(resolve_config_dir(
        override_dir.as_deref(),
        home.as_deref(),
        xdg.as_deref(),
    ))
}

/// Logs directory under config: `<config>/logs` (ensured to exist)
pub fn logs_dir() -> PathBuf {
    ensured(config_dir().join("logs"))
}

/// Cache directory under config: `<config>/cache` (ensured to exist).
/// Holds the catalog cache record and the confirmed-installed set.
pub fn cache_dir() -> PathBuf {
    ensured(config_dir().join("cache"))
}

/// Default download root: `<config>/downloads` (ensured to exist)
pub fn downloads_dir() -> PathBuf {
    ensured(config_dir().join("downloads"))
}

/// Path of the settings file, `<config>/settings.conf`.
pub fn settings_path() -> PathBuf {
    config_dir().join("settings.conf")
}

/// Default location of the bundled fallback catalog.
pub fn default_fallback_catalog_path() -> PathBuf {
    config_dir().join("catalog.fallback.json")
}
