//! Download job record and lifecycle phases.

use std::fmt;
use std::path::PathBuf;

/// What: Lifecycle phase of one install job.
///
/// Details:
/// - `Idle → Downloading → Saving → AwaitingInstallerHandoff → ConfirmPending → Confirmed`.
/// - `Failed` is reachable from every non-terminal phase and is absorbing.
/// - `ConfirmPending` may also end silently when the probe window elapses (abandonment).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InstallPhase {
    /// No job exists yet.
    Idle,
    /// Artifact bytes are being transferred.
    Downloading,
    /// Transferred bytes are being persisted under the deterministic path.
    Saving,
    /// The system installer is about to be invoked.
    AwaitingInstallerHandoff,
    /// The installer was opened; waiting for a positive probe.
    ConfirmPending,
    /// A probe reported the package as installed.
    Confirmed,
    /// The job stopped with an error or cancellation.
    Failed,
}

impl InstallPhase {
    /// `true` for `Confirmed` and `Failed`.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Confirmed | Self::Failed)
    }

    /// Short label for cards and logs.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Downloading => "downloading",
            Self::Saving => "saving",
            Self::AwaitingInstallerHandoff => "opening installer",
            Self::ConfirmPending => "waiting for install",
            Self::Confirmed => "installed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for InstallPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Identifies one job instance; events carrying an older `job_id` are stale.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JobKey {
    /// Package identifier the job installs.
    pub package: String,
    /// Monotonic id assigned at `start`.
    pub job_id: u64,
}

impl JobKey {
    /// Key for `package` and `job_id`.
    pub fn new(package: impl Into<String>, job_id: u64) -> Self {
        Self {
            package: package.into(),
            job_id,
        }
    }
}

impl fmt::Display for JobKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.package, self.job_id)
    }
}

/// What: One package's download/install job.
///
/// Details:
/// - `progress` is percent 0..=100 and never decreases over the job's lifetime.
/// - `failure` is set only in `Failed`; `abandoned` only for a `ConfirmPending` job whose probe
///   window elapsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadJob {
    /// Monotonic id assigned at `start`.
    pub job_id: u64,
    /// Package identifier.
    pub package: String,
    /// Artifact URI being downloaded.
    pub artifact_uri: String,
    /// Current phase.
    pub phase: InstallPhase,
    /// Displayed progress percent.
    pub progress: u8,
    /// Bytes received so far, when the driver reports them.
    pub bytes_transferred: u64,
    /// Expected size, when known.
    pub total_bytes: Option<u64>,
    /// Saved artifact location once `Saving` succeeded.
    pub local_path: Option<PathBuf>,
    /// Human-readable failure description.
    pub failure: Option<String>,
    /// Probe window elapsed without confirmation.
    pub abandoned: bool,
}

impl DownloadJob {
    /// Fresh job entering `Downloading`.
    pub(crate) fn new(job_id: u64, package: &str, artifact_uri: &str) -> Self {
        Self {
            job_id,
            package: package.to_string(),
            artifact_uri: artifact_uri.to_string(),
            phase: InstallPhase::Downloading,
            progress: 0,
            bytes_transferred: 0,
            total_bytes: None,
            local_path: None,
            failure: None,
            abandoned: false,
        }
    }

    /// Key identifying this job instance.
    #[must_use]
    pub fn key(&self) -> JobKey {
        JobKey::new(self.package.clone(), self.job_id)
    }

    /// What: Apply a progress report without ever moving backwards.
    ///
    /// Inputs:
    /// - `percent`: Reported percent; values above 100 are clamped.
    /// - `bytes`/`total`: Byte counters from the driver.
    pub(crate) fn record_progress(&mut self, percent: u8, bytes: u64, total: Option<u64>) {
        self.progress = self.progress.max(percent.min(100));
        self.bytes_transferred = self.bytes_transferred.max(bytes);
        if total.is_some() {
            self.total_bytes = total;
        }
    }
}
