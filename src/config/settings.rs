use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::transfer::Strategy;
use crate::util::config::{parse_bool, parse_key_value, skip_comment_or_empty};

/// Default remote catalog location.
pub const DEFAULT_CATALOG_URL: &str = "https://gitlab.com/vlb1/apps/-/raw/main/apps.json";

/// Default confirmation probe offsets (seconds after installer handoff).
pub const DEFAULT_PROBE_SCHEDULE_SECS: [u64; 6] = [3, 6, 10, 15, 20, 30];

/// Skeleton written on first run so the available keys are discoverable.
pub const SKELETON_SETTINGS_CONTENT: &str = "# tvstore settings\n\
#\n\
# Format: key = value. Lines starting with #, // or ; are comments.\n\
#\n\
# Remote catalog document ({ apps: [...], headerImage? })\n\
catalog_url = https://gitlab.com/vlb1/apps/-/raw/main/apps.json\n\
# Seconds before a catalog request gives up\n\
catalog_timeout_secs = 10\n\
# A cached catalog younger than this is used without touching the network\n\
catalog_cache_ttl_secs = 300\n\
# Local document used when both network and cache are unavailable\n\
# fallback_catalog_path = /etc/tvstore/catalog.json\n\
#\n\
# managed: background download with real progress (cancellable)\n\
# blocking: single request, synthesized progress\n\
download_strategy = managed\n\
download_timeout_secs = 600\n\
download_retries = 2\n\
# downloads_dir = /data/tvstore/downloads\n\
#\n\
# Installer handoff; {path} and {mime} are substituted\n\
installer_command = xdg-open {path}\n\
# Exit status 0 means the package is installed; {package} is substituted\n\
probe_command = pm path {package}\n\
probe_schedule_secs = 3,6,10,15,20,30\n\
#\n\
# Approximate card width in terminal cells, drives the column count\n\
card_width = 30\n\
# Remember confirmed installs across restarts\n\
persist_installed = true\n";

/// What: User-tunable settings loaded from `settings.conf`.
///
/// Details:
/// - Unknown keys are ignored; unparsable values keep their defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// URL of the remote catalog document.
    pub catalog_url: String,
    /// Time bound for the catalog request.
    pub catalog_timeout: Duration,
    /// Age below which a cached catalog is considered fresh.
    pub catalog_cache_ttl: Duration,
    /// Explicit bundled fallback document; `None` uses the config-dir default.
    pub fallback_catalog_path: Option<PathBuf>,
    /// Transfer strategy used for artifact downloads.
    pub download_strategy: Strategy,
    /// Time bound for one artifact transfer attempt.
    pub download_timeout: Duration,
    /// Additional attempts after a transient transfer failure.
    pub download_retries: u32,
    /// Override for the artifact storage root.
    pub downloads_dir: Option<PathBuf>,
    /// Command template that hands a saved artifact to the system installer.
    pub installer_command: String,
    /// Command template whose success means a package is installed.
    pub probe_command: String,
    /// Probe offsets measured from the installer handoff.
    pub probe_schedule: Vec<Duration>,
    /// Approximate width of one grid card in terminal cells.
    pub card_width: u16,
    /// Persist the confirmed-installed set between runs.
    pub persist_installed: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            catalog_url: DEFAULT_CATALOG_URL.to_string(),
            catalog_timeout: Duration::from_secs(10),
            catalog_cache_ttl: Duration::from_secs(300),
            fallback_catalog_path: None,
            download_strategy: Strategy::Managed,
            download_timeout: Duration::from_secs(600),
            download_retries: 2,
            downloads_dir: None,
            installer_command: "xdg-open {path}".to_string(),
            probe_command: "pm path {package}".to_string(),
            probe_schedule: DEFAULT_PROBE_SCHEDULE_SECS
                .iter()
                .map(|s| Duration::from_secs(*s))
                .collect(),
            card_width: 30,
            persist_installed: true,
        }
    }
}

/// What: Parse a comma-separated list of second offsets.
///
/// Output:
/// - `Some(durations)` sorted ascending, or `None` if any item fails to parse or the list is empty.
fn parse_schedule(value: &str) -> Option<Vec<Duration>> {
    let mut secs = value
        .split(',')
        .map(|s| s.trim().parse::<u64>().ok())
        .collect::<Option<Vec<u64>>>()?;
    if secs.is_empty() {
        return None;
    }
    secs.sort_unstable();
    Some(secs.into_iter().map(Duration::from_secs).collect())
}

/// What: Parse settings text into a [`Settings`] value.
///
/// Inputs:
/// - `content`: Full text of a `settings.conf` file.
///
/// Output:
/// - Settings with every recognised key applied on top of the defaults.
///
/// Details:
/// - Invalid values are logged at warn level and skipped.
/// - Zero timeouts and a zero card width are rejected.
#[must_use]
pub fn parse_settings(content: &str) -> Settings {
    let mut out = Settings::default();
    for line in content.lines() {
        if skip_comment_or_empty(line) {
            continue;
        }
        let Some((key, val)) = parse_key_value(line) else {
            continue;
        };
        if !apply_setting(&mut out, &key, &val) {
            tracing::warn!(key = %key, value = %val, "invalid settings value; keeping default");
        }
    }
    out
}

/// What: Apply one `key = value` pair to `out`.
///
/// Output:
/// - `false` when the key is known but the value is rejected; `true` otherwise.
fn apply_setting(out: &mut Settings, key: &str, val: &str) -> bool {
    match key {
        "catalog_url" => set_non_empty(&mut out.catalog_url, val),
        "catalog_timeout_secs" => set_some(&mut out.catalog_timeout, positive_secs(val)),
        "catalog_cache_ttl_secs" => set_some(
            &mut out.catalog_cache_ttl,
            val.parse::<u64>().ok().map(Duration::from_secs),
        ),
        "fallback_catalog_path" => {
            set_some(&mut out.fallback_catalog_path, non_empty_path(val).map(Some))
        }
        "download_strategy" => set_some(&mut out.download_strategy, Strategy::from_config_key(val)),
        "download_timeout_secs" => set_some(&mut out.download_timeout, positive_secs(val)),
        "download_retries" => set_some(&mut out.download_retries, val.parse::<u32>().ok()),
        "downloads_dir" => set_some(&mut out.downloads_dir, non_empty_path(val).map(Some)),
        "installer_command" => set_non_empty(&mut out.installer_command, val),
        "probe_command" => set_non_empty(&mut out.probe_command, val),
        "probe_schedule_secs" => set_some(&mut out.probe_schedule, parse_schedule(val)),
        "card_width" => set_some(
            &mut out.card_width,
            val.parse::<u16>().ok().filter(|w| *w > 0),
        ),
        "persist_installed" => {
            out.persist_installed = parse_bool(val);
            true
        }
        _ => {
            tracing::debug!(key = %key, "ignoring unknown settings key");
            true
        }
    }
}

/// Store `value` into `slot` when present.
fn set_some<T>(slot: &mut T, value: Option<T>) -> bool {
    value.map(|v| *slot = v).is_some()
}

/// Store a non-empty string value.
fn set_non_empty(slot: &mut String, val: &str) -> bool {
    if val.is_empty() {
        return false;
    }
    val.clone_into(slot);
    true
}

/// Non-empty value as a path.
fn non_empty_path(val: &str) -> Option<PathBuf> {
    (!val.is_empty()).then(|| PathBuf::from(val))
}

/// Parse a strictly positive number of seconds.
fn positive_secs(val: &str) -> Option<Duration> {
    val.parse::<u64>()
        .ok()
        .filter(|s| *s > 0)
        .map(Duration::from_secs)
}

/// What: Load settings from `path`, writing the skeleton first if the file is missing.
///
/// Inputs:
/// - `path`: Location of `settings.conf`.
///
/// Output:
/// - Parsed settings, or defaults when the file cannot be read.
pub fn load_settings(path: &Path) -> Settings {
    if !path.is_file() {
        if let Some(dir) = path.parent() {
            let _ = fs::create_dir_all(dir);
        }
        match fs::write(path, SKELETON_SETTINGS_CONTENT) {
            Ok(()) => tracing::info!(path = %path.display(), "wrote settings skeleton"),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "failed to write settings skeleton");
            }
        }
    }
    match fs::read_to_string(path) {
        Ok(content) => parse_settings(&content),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "failed to read settings; using defaults");
            Settings::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    /// What: The skeleton parses back to the defaults.
    ///
    /// Inputs:
    /// - `SKELETON_SETTINGS_CONTENT`.
    ///
    /// Output:
    /// - Equal to `Settings::default()`.
    fn skeleton_round_trips_to_defaults() {
        assert_eq!(parse_settings(SKELETON_SETTINGS_CONTENT), Settings::default());
    }

    #[test]
    /// What: Recognised keys override defaults and bad values are ignored.
    ///
    /// Inputs:
    /// - A mix of valid and invalid assignments.
    ///
    /// Output:
    /// - Valid values applied; invalid ones leave defaults in place.
    fn overrides_and_invalid_values() {
        let s = parse_settings(
            "download_strategy = blocking\n\
             download_retries = 5\n\
             catalog_timeout_secs = 0\n\
             probe_schedule_secs = 10, 2, 5\n\
             card_width = wide\n\
             persist_installed = off\n\
             fallback_catalog_path = /srv/catalog.json\n",
        );
        assert_eq!(s.download_strategy, Strategy::Blocking);
        assert_eq!(s.download_retries, 5);
        assert_eq!(s.catalog_timeout, Duration::from_secs(10));
        assert_eq!(
            s.probe_schedule,
            vec![
                Duration::from_secs(2),
                Duration::from_secs(5),
                Duration::from_secs(10)
            ]
        );
        assert_eq!(s.card_width, 30);
        assert!(!s.persist_installed);
        assert_eq!(
            s.fallback_catalog_path,
            Some(PathBuf::from("/srv/catalog.json"))
        );
    }

    #[test]
    /// What: Missing settings files are created from the skeleton.
    fn load_writes_skeleton_when_missing() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("settings.conf");
        let s = load_settings(&path);
        assert_eq!(s, Settings::default());
        let body = fs::read_to_string(&path).expect("skeleton written");
        assert!(body.contains("download_strategy = managed"));
    }
}
