//! Non-interactive modes: print the catalog, or install one package and exit.

use tokio::sync::mpsc;

use super::services::{catalog_fetcher, install_runner, installed_path, load_installed};
use crate::catalog::{LoadedCatalog, Provenance};
use crate::config::Settings;
use crate::install::{InstallPhase, NoticeLevel, Orchestrator, dispatch, start_job};
use crate::util::ts_to_date;

/// Exit code when the installer was opened but the install was never confirmed.
pub const EXIT_UNCONFIRMED: i32 = 3;

async fn load(settings: &Settings, refresh: bool) -> Result<LoadedCatalog, i32> {
    let fetcher = catalog_fetcher(settings);
    let result = if refresh {
        fetcher.refresh_catalog().await
    } else {
        fetcher.load_catalog().await
    };
    result.map_err(|e| {
        eprintln!("{e}");
        tracing::error!(error = %e, "catalog load failed");
        1
    })
}

fn provenance_label(loaded: &LoadedCatalog) -> String {
    let source = match loaded.provenance {
        Provenance::FreshCache => "cache",
        Provenance::Remote => "remote",
        Provenance::StaleCache => "cache (stale, remote unavailable)",
        Provenance::Bundled => "bundled fallback",
    };
    loaded.fetched_at_millis.map_or_else(
        || source.to_string(),
        |ms| format!("{source}, fetched {}", ts_to_date(Some(ms / 1000))),
    )
}

/// What: Print the catalog, one entry per line.
///
/// Output:
/// - Process exit code: 0 on success, 1 when no catalog could be loaded.
///
/// Details:
/// - The first line names the tier the document came from.
pub async fn list_catalog(settings: &Settings, refresh: bool) -> i32 {
    let loaded = match load(settings, refresh).await {
        Ok(l) => l,
        Err(code) => return code,
    };
    let installed = load_installed(settings);
    println!("# source: {}", provenance_label(&loaded));
    for e in &loaded.document.entries {
        let mark = if installed.contains(&e.package_identifier) {
            "*"
        } else {
            " "
        };
        println!(
            "{mark} {}\t{}\t{}",
            e.package_identifier, e.version_label, e.display_name
        );
    }
    0
}

/// What: Install one package without the UI.
///
/// Inputs:
/// - `package`: Package identifier or entry id.
///
/// Output:
/// - 0 when confirmed, 1 on failure or unknown package, [`EXIT_UNCONFIRMED`] when the probe
///   window elapsed without confirmation.
///
/// Details:
/// - Runs the same orchestrator and runner as the interactive mode, printing progress and
///   notices to stdout until the job settles.
pub async fn install_package(settings: &Settings, package: &str, refresh: bool) -> i32 {
    let loaded = match load(settings, refresh).await {
        Ok(l) => l,
        Err(code) => return code,
    };
    let Some(entry) = loaded
        .document
        .entries
        .iter()
        .find(|e| e.package_identifier == package || e.id == package)
        .cloned()
    else {
        eprintln!("{package} is not in the catalog");
        return 1;
    };

    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut runner = install_runner(settings, tx);
    let mut orchestrator = Orchestrator::with_installed(load_installed(settings));
    let key = match start_job(&mut orchestrator, &mut runner, &entry) {
        Ok(key) => key,
        Err(rejected) => {
            eprintln!("{rejected}");
            return 1;
        }
    };
    println!("Downloading {} from {}", key.package, entry.artifact_uri);

    let mut last_shown: Option<(InstallPhase, u8)> = None;
    while let Some(ev) = rx.recv().await {
        if let Some(notice) = dispatch(&mut orchestrator, &mut runner, ev) {
            match notice.level {
                NoticeLevel::Error => eprintln!("{}", notice.text),
                NoticeLevel::Info | NoticeLevel::Success => println!("{}", notice.text),
            }
        }
        match orchestrator.job(&key.package) {
            Some(job) => {
                let shown = (job.phase, job.progress / 10);
                if last_shown != Some(shown) {
                    if job.phase == InstallPhase::Downloading {
                        println!("{}: {}%", job.phase, job.progress);
                    } else {
                        println!("{}", job.phase);
                    }
                    last_shown = Some(shown);
                }
            }
            None => break,
        }
    }
    runner.shutdown();
    if settings.persist_installed {
        orchestrator.installed_mut().flush(&installed_path());
    }

    match orchestrator.settled(&key.package) {
        Some(job) if job.phase == InstallPhase::Confirmed => 0,
        Some(job) if job.abandoned => {
            println!("{}: the installer was opened but the install was not confirmed", key.package);
            EXIT_UNCONFIRMED
        }
        _ => 1,
    }
}
