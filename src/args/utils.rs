//! Shared utilities for argument processing.

use crate::config::Settings;
use crate::transfer::Strategy;

/// What: Determine the log level based on command-line arguments.
///
/// Inputs:
/// - `args`: Parsed command-line arguments.
///
/// Output:
/// - Log level string (trace, debug, info, warn, error).
///
/// Details:
/// - Verbose flag overrides the `--log-level` argument.
pub fn determine_log_level(args: &crate::args::Args) -> String {
    if args.verbose {
        "debug".to_string()
    } else {
        args.log_level.clone()
    }
}

/// What: Apply CLI overrides on top of the file settings.
///
/// Details:
/// - An unknown strategy name is logged and ignored.
pub fn apply_overrides(args: &crate::args::Args, settings: &mut Settings) {
    if let Some(url) = &args.catalog_url {
        settings.catalog_url.clone_from(url);
    }
    if let Some(name) = &args.strategy {
        match Strategy::from_config_key(name) {
            Some(s) => settings.download_strategy = s,
            None => tracing::warn!(strategy = %name, "unknown download strategy; keeping settings value"),
        }
    }
}
