//! Pure install state machine, keyed by package identifier.
//!
//! The orchestrator owns every job and the installed set. It never performs I/O: each
//! transition returns the [`NextAction`] the runner must execute and, optionally, a
//! [`Notice`] for the user.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

use tracing::{debug, info, warn};

use super::installed::InstalledSet;
use super::job::{DownloadJob, InstallPhase, JobKey};
use crate::catalog::CatalogEntry;
use crate::error::StoreError;
use crate::transfer::{FailureCause, TransferEvent, TransferOutput};

/// Severity of a transient notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    /// Neutral information.
    Info,
    /// A package was confirmed installed.
    Success,
    /// A job failed.
    Error,
}

/// Transient message scoped to one package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    /// Severity.
    pub level: NoticeLevel,
    /// Package the notice is about.
    pub package: String,
    /// Text shown to the user.
    pub text: String,
}

impl Notice {
    /// Notice with `level` about `package`.
    pub fn new(level: NoticeLevel, package: &str, text: impl Into<String>) -> Self {
        Self {
            level,
            package: package.to_string(),
            text: text.into(),
        }
    }
}

/// Input to the state machine, produced by the runner's background tasks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallEvent {
    /// Event forwarded from the transfer driver.
    Transfer(JobKey, TransferEvent),
    /// Outcome of persisting the artifact.
    Saved(JobKey, Result<PathBuf, StoreError>),
    /// Outcome of invoking the system installer.
    HandedOff(JobKey, Result<(), StoreError>),
    /// One scheduled probe finished.
    Probed(JobKey, bool),
    /// The probe window elapsed without a positive probe.
    ProbesExhausted(JobKey),
}

impl InstallEvent {
    /// Job the event belongs to.
    #[must_use]
    pub const fn key(&self) -> &JobKey {
        match self {
            Self::Transfer(k, _)
            | Self::Saved(k, _)
            | Self::HandedOff(k, _)
            | Self::Probed(k, _)
            | Self::ProbesExhausted(k) => k,
        }
    }
}

/// Side effect the runner must perform after a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NextAction {
    /// Nothing to do.
    None,
    /// Persist the transfer output under the package's deterministic path.
    Save(JobKey, TransferOutput),
    /// Open the system installer on the saved artifact.
    HandOff(JobKey, PathBuf),
    /// Begin the confirmation probe schedule.
    StartProbes(JobKey),
    /// Stop the probe schedule and append the install to the audit log.
    RecordInstalled(JobKey),
}

/// Result of applying one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    /// Side effect to execute.
    pub action: NextAction,
    /// Message to show, if any.
    pub notice: Option<Notice>,
}

impl Transition {
    /// No action, no notice.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            action: NextAction::None,
            notice: None,
        }
    }

    /// Action without a notice.
    const fn act(action: NextAction) -> Self {
        Self {
            action,
            notice: None,
        }
    }

    /// Notice without an action.
    const fn notify(notice: Notice) -> Self {
        Self {
            action: NextAction::None,
            notice: Some(notice),
        }
    }
}

/// Accepted start: the runner should begin transferring `artifact_uri`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobTicket {
    /// Key of the new job.
    pub key: JobKey,
    /// Artifact to download.
    pub artifact_uri: String,
}

/// Why a start was refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartRejected {
    /// A non-terminal job already exists for the package.
    AlreadyActive {
        /// Package identifier.
        package: String,
        /// Phase of the existing job.
        phase: InstallPhase,
    },
    /// The entry has no artifact to download.
    NoArtifact {
        /// Package identifier.
        package: String,
    },
}

impl fmt::Display for StartRejected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyActive { package, phase } => {
                write!(f, "{package} is already in progress ({phase})")
            }
            Self::NoArtifact { package } => write!(f, "{package} has no downloadable artifact"),
        }
    }
}

impl std::error::Error for StartRejected {}

/// What: Install state machine for every package.
///
/// Details:
/// - `active` holds at most one non-terminal job per package; this is the start guard.
/// - `settled` keeps the last finished job per package (confirmed, failed, abandoned) for
///   presentation. It never blocks a new start.
/// - Events whose `job_id` does not match the active job are ignored.
#[derive(Debug, Default)]
pub struct Orchestrator {
    /// Last id handed out.
    last_job_id: u64,
    /// Non-terminal jobs by package.
    active: HashMap<String, DownloadJob>,
    /// Most recent finished job by package.
    settled: HashMap<String, DownloadJob>,
    /// Packages confirmed by probing.
    installed: InstalledSet,
}

impl Orchestrator {
    /// Orchestrator seeded with a previously persisted installed set.
    #[must_use]
    pub fn with_installed(installed: InstalledSet) -> Self {
        Self {
            installed,
            ..Self::default()
        }
    }

    /// What: Start (or restart) the install job for `entry`.
    ///
    /// Inputs:
    /// - `entry`: Catalog entry whose artifact should be installed.
    ///
    /// Output:
    /// - `Ok(ticket)` with the new job in `Downloading`; `Err` when a non-terminal job exists.
    ///
    /// # Errors
    /// - `StartRejected::AlreadyActive` for a duplicate start.
    /// - `StartRejected::NoArtifact` for an entry without an artifact URI.
    ///
    /// Details:
    /// - Starting a confirmed package is a reinstall and always allowed.
    pub fn start(&mut self, entry: &CatalogEntry) -> Result<JobTicket, StartRejected> {
        let package = entry.package_identifier.as_str();
        if let Some(job) = self.active.get(package) {
            debug!(package, phase = %job.phase, "start rejected: job already active");
            return Err(StartRejected::AlreadyActive {
                package: package.to_string(),
                phase: job.phase,
            });
        }
        if entry.artifact_uri.trim().is_empty() {
            return Err(StartRejected::NoArtifact {
                package: package.to_string(),
            });
        }
        self.last_job_id += 1;
        let job = DownloadJob::new(self.last_job_id, package, &entry.artifact_uri);
        let ticket = JobTicket {
            key: job.key(),
            artifact_uri: job.artifact_uri.clone(),
        };
        self.settled.remove(package);
        self.active.insert(package.to_string(), job);
        info!(job = %ticket.key, uri = %ticket.artifact_uri, "install job started");
        Ok(ticket)
    }

    /// What: Apply one event to its job.
    ///
    /// Output:
    /// - The action to run next and an optional notice; [`Transition::none`] for stale or
    ///   out-of-phase events.
    pub fn handle(&mut self, event: InstallEvent) -> Transition {
        let key = event.key().clone();
        let Some(job) = self.active.get_mut(&key.package) else {
            debug!(job = %key, "ignoring event for inactive job");
            return Transition::none();
        };
        if job.job_id != key.job_id {
            debug!(job = %key, current = job.job_id, "ignoring event for superseded job");
            return Transition::none();
        }
        match (job.phase, event) {
            (InstallPhase::Downloading, InstallEvent::Transfer(_, ev)) => self.on_transfer(key, ev),
            (InstallPhase::Saving, InstallEvent::Saved(_, Ok(path))) => {
                job.local_path = Some(path.clone());
                job.phase = InstallPhase::AwaitingInstallerHandoff;
                debug!(job = %key, path = %path.display(), "artifact saved");
                Transition::act(NextAction::HandOff(key, path))
            }
            (InstallPhase::Saving, InstallEvent::Saved(_, Err(e)))
            | (InstallPhase::AwaitingInstallerHandoff, InstallEvent::HandedOff(_, Err(e))) => {
                self.fail(&key, e.to_string())
            }
            (InstallPhase::AwaitingInstallerHandoff, InstallEvent::HandedOff(_, Ok(()))) => {
                job.phase = InstallPhase::ConfirmPending;
                info!(job = %key, "installer opened; awaiting confirmation");
                Transition {
                    action: NextAction::StartProbes(key.clone()),
                    notice: Some(Notice::new(
                        NoticeLevel::Info,
                        &key.package,
                        format!("Follow the installer prompt for {}", key.package),
                    )),
                }
            }
            (InstallPhase::ConfirmPending, InstallEvent::Probed(_, true)) => self.confirm(&key),
            (InstallPhase::ConfirmPending, InstallEvent::Probed(_, false)) => {
                debug!(job = %key, "probe negative");
                Transition::none()
            }
            (InstallPhase::ConfirmPending, InstallEvent::ProbesExhausted(_)) => {
                self.abandon(&key);
                Transition::none()
            }
            (phase, other) => {
                warn!(job = %key, phase = %phase, event = ?other, "event does not apply in current phase");
                Transition::none()
            }
        }
    }

    /// Downloading-phase transfer events.
    fn on_transfer(&mut self, key: JobKey, event: TransferEvent) -> Transition {
        let Some(job) = self.active.get_mut(&key.package) else {
            return Transition::none();
        };
        match event {
            TransferEvent::Progress {
                percent,
                bytes,
                total,
            } => {
                job.record_progress(percent, bytes, total);
                Transition::none()
            }
            TransferEvent::Completed(output) => {
                job.record_progress(100, job.bytes_transferred, job.total_bytes);
                job.phase = InstallPhase::Saving;
                debug!(job = %key, "transfer completed");
                Transition::act(NextAction::Save(key, output))
            }
            TransferEvent::Failed(failure) => {
                if failure.cause == FailureCause::Cancelled {
                    self.settle(&key.package, |job| {
                        job.phase = InstallPhase::Failed;
                        job.failure = Some(failure.to_string());
                    });
                    return Transition::notify(Notice::new(
                        NoticeLevel::Info,
                        &key.package,
                        format!("Download of {} cancelled", key.package),
                    ));
                }
                self.fail(&key, failure.to_string())
            }
        }
    }

    /// Move the job to `Failed` and emit an error notice.
    fn fail(&mut self, key: &JobKey, reason: String) -> Transition {
        warn!(job = %key, reason = %reason, "install job failed");
        let text = format!("{}: {reason}", key.package);
        self.settle(&key.package, |job| {
            job.phase = InstallPhase::Failed;
            job.failure = Some(reason);
        });
        Transition::notify(Notice::new(NoticeLevel::Error, &key.package, text))
    }

    /// Move the job to `Confirmed` and record the package as installed.
    fn confirm(&mut self, key: &JobKey) -> Transition {
        self.installed.insert(&key.package);
        self.settle(&key.package, |job| job.phase = InstallPhase::Confirmed);
        info!(job = %key, "install confirmed");
        Transition {
            action: NextAction::RecordInstalled(key.clone()),
            notice: Some(Notice::new(
                NoticeLevel::Success,
                &key.package,
                format!("{} installed", key.package),
            )),
        }
    }

    /// Clear bookkeeping for a job whose probe window elapsed; it stays `ConfirmPending`.
    fn abandon(&mut self, key: &JobKey) {
        debug!(job = %key, "no positive probe within window; abandoning confirmation");
        self.settle(&key.package, |job| job.abandoned = true);
    }

    /// Remove the active job for `package`, apply `finish`, and keep it as settled.
    fn settle(&mut self, package: &str, finish: impl FnOnce(&mut DownloadJob)) {
        if let Some(mut job) = self.active.remove(package) {
            finish(&mut job);
            self.settled.insert(package.to_string(), job);
        }
    }

    /// What: Cancel the downloading job for `package`.
    ///
    /// Output:
    /// - `Some(job_id)` of the cancelled job, so the runner can stop its transfer; `None` when
    ///   no job is downloading.
    ///
    /// Details:
    /// - The job is settled as `Failed` immediately; the driver's own `Cancelled` event that
    ///   follows is stale and ignored.
    pub fn cancel(&mut self, package: &str) -> Option<u64> {
        let job = self.active.get(package)?;
        if job.phase != InstallPhase::Downloading {
            return None;
        }
        let job_id = job.job_id;
        self.settle(package, |job| {
            job.phase = InstallPhase::Failed;
            job.failure = Some("Download cancelled".to_string());
        });
        info!(package, job_id, "install job cancelled");
        Some(job_id)
    }

    /// Active (non-terminal) job for `package`.
    #[must_use]
    pub fn job(&self, package: &str) -> Option<&DownloadJob> {
        self.active.get(package)
    }

    /// Iterate all active jobs.
    pub fn active_jobs(&self) -> impl Iterator<Item = &DownloadJob> {
        self.active.values()
    }

    /// Number of active jobs.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// Most recently finished job for `package`.
    #[must_use]
    pub fn settled(&self, package: &str) -> Option<&DownloadJob> {
        self.settled.get(package)
    }

    /// Active job if any, otherwise the settled one.
    #[must_use]
    pub fn latest(&self, package: &str) -> Option<&DownloadJob> {
        self.job(package).or_else(|| self.settled(package))
    }

    /// Packages believed installed.
    #[must_use]
    pub const fn installed(&self) -> &InstalledSet {
        &self.installed
    }

    /// Mutable access for persistence flushing.
    pub const fn installed_mut(&mut self) -> &mut InstalledSet {
        &mut self.installed
    }

    /// What: Merge a startup probe sweep.
    ///
    /// Inputs:
    /// - `results`: `(package, installed)` pairs.
    ///
    /// Output:
    /// - Number of packages newly marked installed.
    ///
    /// Details:
    /// - Negative results never remove entries: the prober is best-effort and a missing probe
    ///   tool reads as "not installed".
    pub fn apply_probe_sweep(&mut self, results: &[(String, bool)]) -> usize {
        results
            .iter()
            .filter(|(_, installed)| *installed)
            .filter(|(package, _)| self.installed.insert(package))
            .count()
    }
}
