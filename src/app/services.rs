//! Construction of the catalog fetcher and install collaborators from settings.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::catalog::{CatalogFetcher, DiskCatalogCache};
use crate::config::{Settings, cache_dir, default_fallback_catalog_path, downloads_dir, logs_dir};
use crate::install::{
    Collaborators, CommandInstaller, CommandProber, DiskStorage, InstallEvent, InstallRunner,
    InstalledSet, ProbeSchedule, Prober, RunnerOptions,
};
use crate::net::HttpRemote;
use crate::transfer::driver_for;

/// Fetcher type used by the application.
pub type AppFetcher = CatalogFetcher<HttpRemote, DiskCatalogCache>;

/// What: Catalog fetcher for the configured URL, cache directory and fallback document.
#[must_use]
pub fn catalog_fetcher(settings: &Settings) -> AppFetcher {
    let fallback = settings
        .fallback_catalog_path
        .clone()
        .unwrap_or_else(default_fallback_catalog_path);
    CatalogFetcher::new(
        HttpRemote::new(),
        DiskCatalogCache::in_dir(&cache_dir()),
        settings.catalog_url.clone(),
    )
    .with_timeout(settings.catalog_timeout)
    .with_ttl(settings.catalog_cache_ttl)
    .with_fallback(Some(fallback))
}

/// Effective download root.
#[must_use]
pub fn artifact_root(settings: &Settings) -> PathBuf {
    settings.downloads_dir.clone().unwrap_or_else(downloads_dir)
}

/// Location of the persisted installed set.
#[must_use]
pub fn installed_path() -> PathBuf {
    cache_dir().join(InstalledSet::FILE_NAME)
}

/// Persisted installed set, or empty when persistence is off.
#[must_use]
pub fn load_installed(settings: &Settings) -> InstalledSet {
    if settings.persist_installed {
        InstalledSet::load(&installed_path())
    } else {
        InstalledSet::default()
    }
}

/// What: Wire the install runner for `settings`.
///
/// Details:
/// - The strategy decides the transfer driver; storage, installer and prober are the
///   command-backed host implementations.
#[must_use]
pub fn install_runner(
    settings: &Settings,
    events: mpsc::UnboundedSender<InstallEvent>,
) -> InstallRunner {
    let root = artifact_root(settings);
    let parts = Collaborators {
        driver: driver_for(settings.download_strategy, &root.join("partial")),
        storage: Arc::new(DiskStorage),
        installer: Arc::new(CommandInstaller::new(settings.installer_command.clone())),
        prober: prober(settings),
    };
    let options = RunnerOptions {
        downloads_dir: root,
        download_timeout: settings.download_timeout,
        download_retries: settings.download_retries,
        probe_schedule: ProbeSchedule::new(settings.probe_schedule.clone()),
        audit_dir: Some(logs_dir()),
    };
    InstallRunner::new(parts, options, events)
}

/// Prober for the startup sweep and the confirmation schedule.
#[must_use]
pub fn prober(settings: &Settings) -> Arc<dyn Prober> {
    Arc::new(CommandProber::new(settings.probe_command.clone()))
}

/// What: Probe every package once on the blocking pool.
///
/// Output:
/// - `(package, installed)` pairs in input order.
pub async fn probe_sweep(prober: Arc<dyn Prober>, packages: Vec<String>) -> Vec<(String, bool)> {
    tokio::task::spawn_blocking(move || {
        packages
            .into_iter()
            .map(|p| {
                let installed = prober.can_open(&p);
                (p, installed)
            })
            .collect()
    })
    .await
    .unwrap_or_default()
}
