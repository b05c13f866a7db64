//! Artifact transfer behind two interchangeable strategies.
//!
//! Drivers run on spawned tokio tasks and report through an unbounded channel, so the event
//! loop never waits on a download. [`BlockingDriver`] reads the whole body in one call and
//! synthesises progress; [`ManagedDriver`] streams to disk with real progress and honours
//! cancellation.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

mod blocking;
mod managed;

pub use blocking::BlockingDriver;
pub use managed::ManagedDriver;

/// Download strategy selected from settings or the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// One atomic request with synthesised progress; not cancellable.
    Blocking,
    /// Background streaming download with real progress; cancellable.
    Managed,
}

impl Strategy {
    /// What: Parse a settings/CLI value.
    ///
    /// Output:
    /// - `Some(strategy)` for `blocking`/`managed` (case-insensitive), `None` otherwise.
    #[must_use]
    pub fn from_config_key(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "blocking" | "atomic" => Some(Self::Blocking),
            "managed" | "background" => Some(Self::Managed),
            _ => None,
        }
    }

    /// Canonical settings value.
    #[must_use]
    pub const fn as_config_key(self) -> &'static str {
        match self {
            Self::Blocking => "blocking",
            Self::Managed => "managed",
        }
    }

    /// Only managed transfers accept a cancel request.
    #[must_use]
    pub const fn supports_cancel(self) -> bool {
        matches!(self, Self::Managed)
    }
}

/// What to download and under which name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRequest {
    /// Remote artifact URI.
    pub source_uri: String,
    /// File name for the finished artifact (managed strategy).
    pub destination_name: String,
    /// Job the transfer belongs to; keys the managed staging file.
    pub job_id: u64,
    /// Bound for one attempt; long by default since artifacts can be large.
    pub timeout: Duration,
    /// Extra attempts after a transient failure.
    pub retries: u32,
}

/// Finished transfer: bytes in memory or a file already on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferOutput {
    /// Whole body, produced by the blocking strategy.
    Payload(Vec<u8>),
    /// Completed file, produced by the managed strategy.
    File(PathBuf),
}

/// Classified reason a transfer stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureCause {
    /// Connection, DNS, or mid-body transport failure.
    Network,
    /// Server answered with a non-success status.
    HttpStatus(u16),
    /// Local storage ran out of space or quota.
    StorageFull,
    /// Any other local file error (permissions, missing directory, rename).
    LocalIo,
    /// The attempt exceeded its time bound.
    Timeout,
    /// Cancelled on request.
    Cancelled,
}

impl FailureCause {
    /// What: Decide whether another attempt could succeed.
    ///
    /// Output:
    /// - `true` for network errors, timeouts, and 5xx statuses.
    #[must_use]
    pub const fn is_retryable(self) -> bool {
        match self {
            Self::Network | Self::Timeout => true,
            Self::HttpStatus(code) => code >= 500,
            Self::StorageFull | Self::LocalIo | Self::Cancelled => false,
        }
    }

    /// Short label for logs.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::HttpStatus(_) => "http_status",
            Self::StorageFull => "storage_full",
            Self::LocalIo => "local_io",
            Self::Timeout => "timeout",
            Self::Cancelled => "cancelled",
        }
    }
}

/// Failure cause plus a human-readable detail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferFailure {
    /// Classified cause.
    pub cause: FailureCause,
    /// Underlying error text.
    pub detail: String,
}

impl TransferFailure {
    /// Failure with `cause` and `detail`.
    pub fn new(cause: FailureCause, detail: impl Into<String>) -> Self {
        Self {
            cause,
            detail: detail.into(),
        }
    }

    /// Cancellation failure.
    #[must_use]
    pub fn cancelled() -> Self {
        Self::new(FailureCause::Cancelled, "cancelled")
    }
}

impl fmt::Display for TransferFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.cause {
            FailureCause::Network => write!(f, "Download failed: {}", self.detail),
            FailureCause::HttpStatus(code) => write!(f, "Download failed with HTTP {code}"),
            FailureCause::StorageFull => write!(f, "Not enough storage: {}", self.detail),
            FailureCause::LocalIo => write!(f, "Could not save the download: {}", self.detail),
            FailureCause::Timeout => write!(f, "Download timed out"),
            FailureCause::Cancelled => write!(f, "Download cancelled"),
        }
    }
}

impl std::error::Error for TransferFailure {}

/// Events a driver sends for one transfer; exactly one terminal event ends the stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferEvent {
    /// Progress update.
    Progress {
        /// Percent complete, 0..=100.
        percent: u8,
        /// Bytes received so far in the current attempt.
        bytes: u64,
        /// Expected size when the server announced one.
        total: Option<u64>,
    },
    /// Transfer finished.
    Completed(TransferOutput),
    /// Transfer stopped with a classified cause.
    Failed(TransferFailure),
}

/// What: Handle to a running transfer.
///
/// Details:
/// - Dropping the handle does not stop the transfer; the task reports its terminal event
///   regardless.
#[derive(Debug)]
pub struct JobHandle {
    /// Cancel flag shared with the task; `None` when the strategy cannot cancel.
    cancel: Option<Arc<AtomicBool>>,
    /// Spawned task.
    task: JoinHandle<()>,
}

impl JobHandle {
    /// Wrap a spawned task.
    #[must_use]
    pub fn new(cancel: Option<Arc<AtomicBool>>, task: JoinHandle<()>) -> Self {
        Self { cancel, task }
    }

    /// What: Request cancellation.
    ///
    /// Output:
    /// - `true` when the request was accepted; `false` for non-cancellable strategies.
    pub fn cancel(&self) -> bool {
        match &self.cancel {
            Some(flag) => {
                flag.store(true, Ordering::Relaxed);
                true
            }
            None => false,
        }
    }

    /// `true` once the task has sent its terminal event.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

/// What: Strategy-neutral download contract.
///
/// Inputs:
/// - `request`: Source, destination name, and time bound.
/// - `events`: Channel receiving progress and exactly one terminal event.
///
/// Output:
/// - [`JobHandle`] for cancellation.
///
/// Details:
/// - Must be called from within a tokio runtime.
pub trait TransferDriver: Send + Sync {
    /// Strategy this driver implements.
    fn strategy(&self) -> Strategy;

    /// Begin a transfer on a background task.
    fn start(
        &self,
        request: TransferRequest,
        events: mpsc::UnboundedSender<TransferEvent>,
    ) -> JobHandle;
}

/// Default pause before the first retry; later retries wait proportionally longer.
pub const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_secs(2);

/// Build the driver for `strategy`, streaming managed downloads into `downloads_dir`.
#[must_use]
pub fn driver_for(strategy: Strategy, downloads_dir: &Path) -> Arc<dyn TransferDriver> {
    let client = crate::net::http_client();
    match strategy {
        Strategy::Blocking => Arc::new(BlockingDriver::new(client)),
        Strategy::Managed => Arc::new(ManagedDriver::new(client, downloads_dir.to_path_buf())),
    }
}

/// What: Map a `reqwest` error onto a failure cause.
pub(crate) fn classify_reqwest(err: &reqwest::Error) -> TransferFailure {
    if err.is_timeout() {
        return TransferFailure::new(FailureCause::Timeout, err.to_string());
    }
    if let Some(status) = err.status() {
        return TransferFailure::new(FailureCause::HttpStatus(status.as_u16()), err.to_string());
    }
    TransferFailure::new(FailureCause::Network, err.to_string())
}

/// What: Map a local I/O error onto a failure cause.
///
/// Details:
/// - Out-of-space and quota errors are `StorageFull`; everything else is `LocalIo`.
pub(crate) fn classify_io(err: &std::io::Error) -> TransferFailure {
    let cause = match err.kind() {
        std::io::ErrorKind::StorageFull | std::io::ErrorKind::QuotaExceeded => {
            FailureCause::StorageFull
        }
        _ => FailureCause::LocalIo,
    };
    TransferFailure::new(cause, err.to_string())
}

/// What: Decide whether to retry after `failure` on 1-based `attempt`.
pub(crate) fn should_retry(failure: &TransferFailure, attempt: u32, retries: u32) -> bool {
    failure.cause.is_retryable() && attempt <= retries
}

/// Linear backoff: `base × attempt`.
pub(crate) fn retry_delay(base: Duration, attempt: u32) -> Duration {
    base.saturating_mul(attempt)
}
