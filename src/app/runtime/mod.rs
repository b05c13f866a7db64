use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Instant;

use ratatui::{Terminal, backend::CrosstermBackend};
use tokio::select;
use tracing::{debug, info};

use super::persist::maybe_flush_installed;
use super::services::{catalog_fetcher, install_runner, load_installed, prober};
use super::terminal::{restore_terminal, setup_terminal};
use crate::catalog::CatalogEntry;
use crate::config::Settings;
use crate::events::{Effect, handle_event};
use crate::install::{InstallRunner, Notice, NoticeLevel, cancel_job, dispatch, start_job};
use crate::state::AppState;
use crate::ui::ui;

mod background;

use background::{
    Channels, spawn_catalog_load, spawn_event_thread, spawn_probe_sweep, spawn_tick_worker,
};

type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// What: Run the interactive catalog end-to-end.
///
/// Inputs:
/// - `settings`: Effective settings after CLI overrides.
/// - `force_refresh`: Skip the fresh-cache tier for the initial load.
///
/// Output:
/// - `Ok(())` when the user quits; `Err` on terminal setup failures.
///
/// Details:
/// - Background tasks (terminal input, catalog load, transfers, probes, ticks) report over
///   channels; only this loop mutates `AppState`.
/// - On exit running transfers and probe schedules are cancelled, the installed set is
///   flushed, and the terminal is restored.
pub async fn run(settings: Settings, force_refresh: bool) -> Result<()> {
    let headless = std::env::var("TVSTORE_TEST_HEADLESS").ok().as_deref() == Some("1");
    if !headless {
        setup_terminal()?;
    }
    let mut terminal = if headless {
        None
    } else {
        Some(Terminal::new(CrosstermBackend::new(std::io::stdout()))?)
    };

    let installed = load_installed(&settings);
    let fetcher = Arc::new(catalog_fetcher(&settings));
    let sweep_prober = prober(&settings);
    let mut channels = Channels::new();
    let mut runner = install_runner(&settings, channels.install_tx.clone());
    let mut app = AppState::new(settings, installed);
    if let Ok((width, _)) = crossterm::terminal::size() {
        app.set_viewport_width(width);
    }

    spawn_tick_worker(&channels.tick_tx);
    spawn_event_thread(
        headless,
        channels.event_tx.clone(),
        Arc::clone(&channels.event_thread_cancelled),
    );
    app.reloading = true;
    spawn_catalog_load(Arc::clone(&fetcher), force_refresh, channels.catalog_tx.clone());

    loop {
        if let Some(t) = terminal.as_mut() {
            let _ = t.draw(|f| ui(f, &app));
        }

        select! {
            Some(ev) = channels.event_rx.recv() => {
                match handle_event(&ev, &mut app) {
                    Effect::None => {}
                    Effect::Quit => break,
                    Effect::Install(entry) => start_install(&mut app, &mut runner, &entry),
                    Effect::Cancel(package) => cancel_install(&mut app, &mut runner, &package),
                    Effect::Reload => {
                        info!("catalog reload requested");
                        spawn_catalog_load(Arc::clone(&fetcher), true, channels.catalog_tx.clone());
                    }
                }
            }
            Some(result) = channels.catalog_rx.recv() => {
                app.apply_catalog(result, Instant::now());
                if let Some(doc) = app.document() {
                    let packages = doc
                        .entries
                        .iter()
                        .map(|e| e.package_identifier.clone())
                        .collect();
                    spawn_probe_sweep(Arc::clone(&sweep_prober), packages, channels.sweep_tx.clone());
                }
            }
            Some(ev) = channels.install_rx.recv() => {
                if let Some(notice) = dispatch(&mut app.orchestrator, &mut runner, ev) {
                    app.push_notice(notice, Instant::now());
                }
            }
            Some(results) = channels.sweep_rx.recv() => {
                let added = app.orchestrator.apply_probe_sweep(&results);
                debug!(probed = results.len(), added, "probe sweep finished");
            }
            Some(()) = channels.tick_rx.recv() => {
                app.expire_notices(Instant::now());
                maybe_flush_installed(&mut app);
            }
            else => break,
        }
    }

    channels.event_thread_cancelled.store(true, Ordering::Relaxed);
    runner.shutdown();
    maybe_flush_installed(&mut app);
    if !headless {
        restore_terminal()?;
    }
    Ok(())
}

/// Start a job for `entry` and announce the outcome.
fn start_install(app: &mut AppState, runner: &mut InstallRunner, entry: &CatalogEntry) {
    let now = Instant::now();
    let package = entry.package_identifier.as_str();
    let notice = match start_job(&mut app.orchestrator, runner, entry) {
        Ok(_) => {
            let name = if entry.display_name.is_empty() {
                package
            } else {
                entry.display_name.as_str()
            };
            Notice::new(NoticeLevel::Info, package, format!("Downloading {name}"))
        }
        Err(rejected) => Notice::new(NoticeLevel::Info, package, rejected.to_string()),
    };
    app.push_notice(notice, now);
}

/// Cancel the download of `package` if the strategy allows it.
fn cancel_install(app: &mut AppState, runner: &mut InstallRunner, package: &str) {
    let text = if !runner.strategy().supports_cancel() {
        "Downloads cannot be cancelled with the blocking strategy".to_string()
    } else if cancel_job(&mut app.orchestrator, runner, package) {
        format!("Download of {package} cancelled")
    } else {
        return;
    };
    app.push_notice(Notice::new(NoticeLevel::Info, package, text), Instant::now());
}

