//! Executes orchestrator actions against the transfer driver and the host collaborators.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::installer::{Installer, PACKAGE_MIME};
use super::job::JobKey;
use super::logging::log_installed;
use super::orchestrator::{InstallEvent, JobTicket, NextAction, Notice, Orchestrator};
use super::prober::{ProbeSchedule, Prober};
use super::storage::{Storage, artifact_file_name, save_artifact};
use crate::error::StoreError;
use crate::transfer::{JobHandle, Strategy, TransferDriver, TransferEvent, TransferRequest};

/// Everything the runner talks to.
#[derive(Clone)]
pub struct Collaborators {
    /// Download strategy.
    pub driver: Arc<dyn TransferDriver>,
    /// Artifact persistence.
    pub storage: Arc<dyn Storage>,
    /// System installer handoff.
    pub installer: Arc<dyn Installer>,
    /// Installed-package check.
    pub prober: Arc<dyn Prober>,
}

/// Runner tunables, usually derived from `Settings`.
#[derive(Debug, Clone)]
pub struct RunnerOptions {
    /// Storage root for saved artifacts.
    pub downloads_dir: PathBuf,
    /// Bound for one transfer attempt.
    pub download_timeout: Duration,
    /// Extra attempts after transient transfer failures.
    pub download_retries: u32,
    /// Confirmation probe offsets.
    pub probe_schedule: ProbeSchedule,
    /// Directory for the install audit log; `None` disables it.
    pub audit_dir: Option<PathBuf>,
}

/// What: Side-effect executor for [`NextAction`]s.
///
/// Details:
/// - Every background result comes back as an [`InstallEvent`] on the channel given to
///   [`InstallRunner::new`], so all state changes stay on the caller's event loop.
/// - Blocking collaborators (storage, installer, prober) run on the blocking pool.
pub struct InstallRunner {
    /// Collaborators.
    parts: Collaborators,
    /// Tunables.
    options: RunnerOptions,
    /// Channel back to the event loop.
    events: mpsc::UnboundedSender<InstallEvent>,
    /// Running transfers by package.
    transfers: HashMap<String, (u64, JobHandle)>,
    /// Probe cancel flags by package.
    probes: HashMap<String, Arc<AtomicBool>>,
}

impl InstallRunner {
    /// Runner reporting to `events`.
    #[must_use]
    pub fn new(
        parts: Collaborators,
        options: RunnerOptions,
        events: mpsc::UnboundedSender<InstallEvent>,
    ) -> Self {
        Self {
            parts,
            options,
            events,
            transfers: HashMap::new(),
            probes: HashMap::new(),
        }
    }

    /// Strategy of the configured driver.
    #[must_use]
    pub fn strategy(&self) -> Strategy {
        self.parts.driver.strategy()
    }

    /// What: Begin the transfer for an accepted start.
    ///
    /// Details:
    /// - Driver events are forwarded as `InstallEvent::Transfer` tagged with the job key.
    /// - A lingering probe schedule for the same package (reinstall) is cancelled.
    pub fn begin(&mut self, ticket: &JobTicket) {
        let key = ticket.key.clone();
        self.stop_probes(&key.package);
        let request = TransferRequest {
            source_uri: ticket.artifact_uri.clone(),
            destination_name: artifact_file_name(&key.package),
            job_id: key.job_id,
            timeout: self.options.download_timeout,
            retries: self.options.download_retries,
        };
        let (tx, mut rx) = mpsc::unbounded_channel::<TransferEvent>();
        let handle = self.parts.driver.start(request, tx);
        let out = self.events.clone();
        let fwd_key = key.clone();
        tokio::spawn(async move {
            while let Some(ev) = rx.recv().await {
                let terminal = !matches!(ev, TransferEvent::Progress { .. });
                if out.send(InstallEvent::Transfer(fwd_key.clone(), ev)).is_err() || terminal {
                    break;
                }
            }
        });
        debug!(job = %key, strategy = self.strategy().as_config_key(), "transfer started");
        self.transfers.insert(key.package, (key.job_id, handle));
    }

    /// What: Perform the side effect of a transition.
    pub fn execute(&mut self, action: NextAction) {
        match action {
            NextAction::None => {}
            NextAction::Save(key, output) => {
                self.forget_transfer(&key);
                let storage = Arc::clone(&self.parts.storage);
                let root = self.options.downloads_dir.clone();
                self.on_blocking_pool(key, InstallEvent::Saved, move |k| {
                    save_artifact(storage.as_ref(), &root, &k.package, &output)
                });
            }
            NextAction::HandOff(key, path) => {
                let installer = Arc::clone(&self.parts.installer);
                self.on_blocking_pool(key, InstallEvent::HandedOff, move |_| {
                    installer.open(&path, PACKAGE_MIME)
                });
            }
            NextAction::StartProbes(key) => {
                let cancel = Arc::new(AtomicBool::new(false));
                self.stop_probes(&key.package);
                self.probes.insert(key.package.clone(), Arc::clone(&cancel));
                let _ = self.options.probe_schedule.spawn(
                    Arc::clone(&self.parts.prober),
                    key,
                    cancel,
                    self.events.clone(),
                );
            }
            NextAction::RecordInstalled(key) => {
                self.probes.remove(&key.package);
                if let Some(dir) = &self.options.audit_dir
                    && let Err(e) = log_installed(dir, std::slice::from_ref(&key.package))
                {
                    warn!(job = %key, error = %e, "failed to append install log");
                }
            }
        }
    }

    /// What: Stop the transfer of a cancelled job.
    ///
    /// Output:
    /// - `true` when the driver accepted the cancel request.
    pub fn cancel(&mut self, package: &str, job_id: u64) -> bool {
        match self.transfers.remove(package) {
            Some((id, handle)) if id == job_id => handle.cancel(),
            Some(other) => {
                self.transfers.insert(package.to_string(), other);
                false
            }
            None => false,
        }
    }

    /// Cancel every probe schedule and cancellable transfer.
    pub fn shutdown(&mut self) {
        for (_, flag) in self.probes.drain() {
            flag.store(true, Ordering::Relaxed);
        }
        for (_, (_, handle)) in self.transfers.drain() {
            let _ = handle.cancel();
        }
    }

    /// Cancel the probe schedule for `package`, if any.
    fn stop_probes(&mut self, package: &str) {
        if let Some(flag) = self.probes.remove(package) {
            flag.store(true, Ordering::Relaxed);
        }
    }

    /// Drop the transfer handle once its job moved past `Downloading`.
    fn forget_transfer(&mut self, key: &JobKey) {
        if self
            .transfers
            .get(&key.package)
            .is_some_and(|(id, _)| *id == key.job_id)
        {
            self.transfers.remove(&key.package);
        }
    }

    /// Run `work` on the blocking pool and report its result as `wrap(key, result)`.
    fn on_blocking_pool<T, F>(
        &self,
        key: JobKey,
        wrap: fn(JobKey, Result<T, StoreError>) -> InstallEvent,
        work: F,
    ) where
        T: Send + 'static,
        F: FnOnce(&JobKey) -> Result<T, StoreError> + Send + 'static,
    {
        let out = self.events.clone();
        tokio::spawn(async move {
            let k = key.clone();
            let result = tokio::task::spawn_blocking(move || work(&k))
                .await
                .unwrap_or_else(|e| Err(StoreError::Storage(format!("worker panicked: {e}"))));
            let _ = out.send(wrap(key, result));
        });
    }
}

/// What: Start a job for `entry` and begin its transfer.
///
/// Output:
/// - `Ok(key)` of the new job, or the rejection notice text.
///
/// # Errors
/// - The orchestrator's `StartRejected` reason.
pub fn start_job(
    orchestrator: &mut Orchestrator,
    runner: &mut InstallRunner,
    entry: &crate::catalog::CatalogEntry,
) -> Result<JobKey, super::orchestrator::StartRejected> {
    let ticket = orchestrator.start(entry)?;
    runner.begin(&ticket);
    Ok(ticket.key)
}

/// What: Feed one event through the orchestrator and execute the resulting action.
///
/// Output:
/// - The notice to show, if any.
pub fn dispatch(
    orchestrator: &mut Orchestrator,
    runner: &mut InstallRunner,
    event: InstallEvent,
) -> Option<Notice> {
    let transition = orchestrator.handle(event);
    runner.execute(transition.action);
    transition.notice
}

/// What: Cancel the downloading job for `package`.
///
/// Output:
/// - `true` when a job was cancelled.
///
/// Details:
/// - Blocking transfers cannot be cancelled; the job is left untouched.
pub fn cancel_job(orchestrator: &mut Orchestrator, runner: &mut InstallRunner, package: &str) -> bool {
    if !runner.strategy().supports_cancel() {
        return false;
    }
    match orchestrator.cancel(package) {
        Some(job_id) => runner.cancel(package, job_id),
        None => false,
    }
}
