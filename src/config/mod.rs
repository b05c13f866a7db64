//! Configuration: on-disk locations and `settings.conf` parsing.

mod paths;
mod settings;

pub use paths::{
    cache_dir, config_dir, default_fallback_catalog_path, downloads_dir, logs_dir,
    resolve_config_dir, settings_path,
};
pub use settings::{
    DEFAULT_CATALOG_URL, DEFAULT_PROBE_SCHEDULE_SECS, SKELETON_SETTINGS_CONTENT, Settings,
    load_settings, parse_settings,
};
