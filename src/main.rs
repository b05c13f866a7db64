//! tvstore binary entrypoint kept minimal. The full runtime lives in `app`.

use std::sync::OnceLock;
use std::{fmt, time::SystemTime};

use clap::Parser;
use tvstore::{app, args, config};

struct TvstoreTimer;

impl tracing_subscriber::fmt::time::FormatTime for TvstoreTimer {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> fmt::Result {
        let secs = SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map_or(0, |d| i64::try_from(d.as_secs()).unwrap_or(i64::MAX));
        let s = tvstore::util::ts_to_date(Some(secs)); // "YYYY-MM-DD HH:MM:SS"
        let ts = s.replacen(' ', "-T", 1);
        w.write_str(&ts)
    }
}

static LOG_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();

/// Build the filter from `RUST_LOG`, falling back to the CLI level.
fn env_filter(level: &str) -> tracing_subscriber::EnvFilter {
    tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level))
}

/// Initialise tracing to `<config>/logs/tvstore.log`, or stderr if the file cannot be opened.
fn init_logging(level: &str) {
    let log_path = config::logs_dir().join("tvstore.log");
    match std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
    {
        Ok(file) => {
            let (non_blocking, guard) = tracing_appender::non_blocking(file);
            tracing_subscriber::fmt()
                .with_env_filter(env_filter(level))
                .with_target(false)
                .with_ansi(false)
                .with_writer(non_blocking)
                .with_timer(TvstoreTimer)
                .init();
            let _ = LOG_GUARD.set(guard);
            tracing::info!(path = %log_path.display(), "logging initialized");
        }
        Err(e) => {
            // Fallback: stderr logger so startup is never blocked
            tracing_subscriber::fmt()
                .with_env_filter(env_filter(level))
                .with_target(false)
                .with_ansi(true)
                .with_writer(std::io::stderr)
                .with_timer(TvstoreTimer)
                .init();
            tracing::warn!(error = %e, "failed to open log file; using stderr");
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = args::Args::parse();
    init_logging(&args::determine_log_level(&cli));

    let mut settings = config::load_settings(&config::settings_path());
    args::apply_overrides(&cli, &mut settings);
    tracing::info!(
        catalog = %settings.catalog_url,
        strategy = settings.download_strategy.as_config_key(),
        "tvstore starting"
    );

    if let Some(code) = args::process_args(&cli, &settings).await {
        tracing::info!(code, "headless run finished");
        std::process::exit(code);
    }
    if let Err(err) = app::run(settings, cli.refresh).await {
        tracing::error!(error = ?err, "Application error");
    }
    tracing::info!("tvstore exited");
}
