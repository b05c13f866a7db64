use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crossterm::event::Event as CEvent;
use tokio::sync::mpsc;

use crate::app::services::{AppFetcher, probe_sweep};
use crate::catalog::LoadedCatalog;
use crate::error::StoreError;
use crate::install::{InstallEvent, Prober};

/// What: Channel ends shared between the event loop and its background tasks.
///
/// Details:
/// - Every receiver is drained only by the event loop, which is the single writer of
///   `AppState`.
pub struct Channels {
    pub event_tx: mpsc::UnboundedSender<CEvent>,
    pub event_rx: mpsc::UnboundedReceiver<CEvent>,
    pub event_thread_cancelled: Arc<AtomicBool>,
    pub catalog_tx: mpsc::UnboundedSender<Result<LoadedCatalog, StoreError>>,
    pub catalog_rx: mpsc::UnboundedReceiver<Result<LoadedCatalog, StoreError>>,
    pub install_tx: mpsc::UnboundedSender<InstallEvent>,
    pub install_rx: mpsc::UnboundedReceiver<InstallEvent>,
    pub sweep_tx: mpsc::UnboundedSender<Vec<(String, bool)>>,
    pub sweep_rx: mpsc::UnboundedReceiver<Vec<(String, bool)>>,
    pub tick_tx: mpsc::UnboundedSender<()>,
    pub tick_rx: mpsc::UnboundedReceiver<()>,
}

impl Channels {
    pub fn new() -> Self {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (catalog_tx, catalog_rx) = mpsc::unbounded_channel();
        let (install_tx, install_rx) = mpsc::unbounded_channel();
        let (sweep_tx, sweep_rx) = mpsc::unbounded_channel();
        let (tick_tx, tick_rx) = mpsc::unbounded_channel();
        Self {
            event_tx,
            event_rx,
            event_thread_cancelled: Arc::new(AtomicBool::new(false)),
            catalog_tx,
            catalog_rx,
            install_tx,
            install_rx,
            sweep_tx,
            sweep_rx,
            tick_tx,
            tick_rx,
        }
    }
}

/// What: Spawn the thread that reads terminal events.
///
/// Details:
/// - Polls every 50ms so the cancel flag is honoured promptly on exit.
/// - Does nothing in headless mode.
pub fn spawn_event_thread(
    headless: bool,
    event_tx: mpsc::UnboundedSender<CEvent>,
    cancelled: Arc<AtomicBool>,
) {
    if headless {
        return;
    }
    std::thread::spawn(move || {
        loop {
            if cancelled.load(Ordering::Relaxed) {
                break;
            }
            match crossterm::event::poll(Duration::from_millis(50)) {
                Ok(true) => {
                    if let Ok(ev) = crossterm::event::read()
                        && (cancelled.load(Ordering::Relaxed) || event_tx.send(ev).is_err())
                    {
                        break;
                    }
                }
                // Timeout or poll error: loop around to re-check the flag.
                Ok(false) | Err(_) => {}
            }
        }
    });
}

/// What: Spawn the tick worker driving notice expiry and persistence.
///
/// Details:
/// - Sends a tick every 200ms until the receiver is dropped.
pub fn spawn_tick_worker(tick_tx: &mpsc::UnboundedSender<()>) {
    let tx = tick_tx.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_millis(200));
        loop {
            interval.tick().await;
            if tx.send(()).is_err() {
                break;
            }
        }
    });
}

/// What: Load the catalog in the background.
///
/// Inputs:
/// - `force`: Skip the fresh-cache tier (user-requested reload).
pub fn spawn_catalog_load(
    fetcher: Arc<AppFetcher>,
    force: bool,
    tx: mpsc::UnboundedSender<Result<LoadedCatalog, StoreError>>,
) {
    tokio::spawn(async move {
        let result = if force {
            fetcher.refresh_catalog().await
        } else {
            fetcher.load_catalog().await
        };
        let _ = tx.send(result);
    });
}

/// Run the startup probe sweep for `packages` in the background.
pub fn spawn_probe_sweep(
    prober: Arc<dyn Prober>,
    packages: Vec<String>,
    tx: mpsc::UnboundedSender<Vec<(String, bool)>>,
) {
    tokio::spawn(async move {
        let results = probe_sweep(prober, packages).await;
        let _ = tx.send(results);
    });
}
