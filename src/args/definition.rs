//! Command-line argument definition and processing.

use clap::Parser;

use crate::app::headless;
use crate::config::Settings;

/// tvstore - A remote-controlled application catalog for TV and set-top boxes
#[derive(Parser, Debug, Default)]
#[command(name = "tvstore")]
#[command(version)]
#[command(about = "A remote-controlled application catalog for TV and set-top boxes", long_about = None)]
pub struct Args {
    /// Set the logging level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Enable verbose output (equivalent to --log-level debug)
    #[arg(short, long)]
    pub verbose: bool,

    /// Catalog document URL (overrides `catalog_url` in settings.conf)
    #[arg(long)]
    pub catalog_url: Option<String>,

    /// Download strategy: managed (streamed, cancellable) or blocking
    #[arg(long)]
    pub strategy: Option<String>,

    /// Ignore a fresh cached catalog and fetch from the remote
    #[arg(long)]
    pub refresh: bool,

    /// Print the catalog and exit
    #[arg(short, long)]
    pub list: bool,

    /// Install one package by identifier or id, then exit
    #[arg(short, long, value_name = "PACKAGE")]
    pub install: Option<String>,
}

/// What: Handle headless flags.
///
/// Inputs:
/// - `args`: Parsed command-line arguments.
/// - `settings`: Effective settings after overrides.
///
/// Output:
/// - `Some(exit_code)` when a headless mode ran; `None` to continue into the UI.
///
/// Details:
/// - `--install` wins over `--list` when both are given.
pub async fn process_args(args: &Args, settings: &Settings) -> Option<i32> {
    if let Some(package) = &args.install {
        tracing::info!(package = %package, "install requested from CLI");
        return Some(headless::install_package(settings, package, args.refresh).await);
    }
    if args.list {
        tracing::info!("catalog listing requested from CLI");
        return Some(headless::list_catalog(settings, args.refresh).await);
    }
    None
}
