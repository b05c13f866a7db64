//! Best-effort installed-package probing and the post-handoff confirmation schedule.

use std::process::{Command, Stdio};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use super::job::JobKey;
use super::orchestrator::InstallEvent;
use crate::config::DEFAULT_PROBE_SCHEDULE_SECS;
use crate::util::expand_command;

/// Longest a single probe may run before it counts as negative.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Interval between exit checks on a running probe command.
const CHILD_POLL: Duration = Duration::from_millis(20);

/// What: Capability check standing in for an install receipt.
///
/// Details:
/// - Best-effort: `false` can mean "not installed" or "could not tell".
pub trait Prober: Send + Sync {
    /// `true` when `package` appears to be installed.
    fn can_open(&self, package: &str) -> bool;
}

/// What: [`Prober`] that runs a configured command and checks its exit status.
///
/// Details:
/// - `{package}` is substituted per whitespace-separated word.
/// - A missing program or spawn failure reads as `false`.
/// - A command still running after the timeout is killed and reads as `false`.
#[derive(Debug, Clone)]
pub struct CommandProber {
    /// Command template, e.g. `pm path {package}`.
    template: String,
    /// Kill the command after this long.
    timeout: Duration,
}

impl CommandProber {
    /// Prober running `template`.
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            timeout: DEFAULT_PROBE_TIMEOUT,
        }
    }

    /// Replace the per-command time limit.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Prober for CommandProber {
    fn can_open(&self, package: &str) -> bool {
        let Some((program, args)) = expand_command(&self.template, &[("package", package)]) else {
            return false;
        };
        if which::which(&program).is_err() {
            debug!(program = %program, "probe command not found");
            return false;
        }
        let mut child = match Command::new(&program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
        {
            Ok(child) => child,
            Err(e) => {
                debug!(program = %program, error = %e, "probe command failed to start");
                return false;
            }
        };
        let deadline = Instant::now() + self.timeout;
        loop {
            match child.try_wait() {
                Ok(Some(status)) => return status.success(),
                Ok(None) if Instant::now() < deadline => std::thread::sleep(CHILD_POLL),
                Ok(None) => {
                    debug!(program = %program, package, "probe command timed out; killing");
                    if let Err(e) = child.kill() {
                        debug!(program = %program, error = %e, "could not kill probe command");
                    }
                    let _ = child.wait();
                    return false;
                }
                Err(e) => {
                    debug!(program = %program, error = %e, "could not poll probe command");
                    return false;
                }
            }
        }
    }
}

/// What: Increasing probe offsets measured from the installer handoff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeSchedule {
    /// Sorted offsets.
    offsets: Vec<Duration>,
    /// Limit on one probe; a probe that overruns counts as negative.
    probe_timeout: Duration,
}

impl Default for ProbeSchedule {
    fn default() -> Self {
        Self::new(
            DEFAULT_PROBE_SCHEDULE_SECS
                .iter()
                .map(|s| Duration::from_secs(*s))
                .collect(),
        )
    }
}

impl ProbeSchedule {
    /// Schedule probing at `offsets` (sorted on construction).
    #[must_use]
    pub fn new(mut offsets: Vec<Duration>) -> Self {
        offsets.sort_unstable();
        Self {
            offsets,
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
        }
    }

    /// Replace the per-probe time limit.
    #[must_use]
    pub const fn with_probe_timeout(mut self, probe_timeout: Duration) -> Self {
        self.probe_timeout = probe_timeout;
        self
    }

    /// Per-probe time limit.
    #[must_use]
    pub const fn probe_timeout(&self) -> Duration {
        self.probe_timeout
    }

    /// Offsets in ascending order.
    #[must_use]
    pub fn offsets(&self) -> &[Duration] {
        &self.offsets
    }

    /// Time from handoff to the last probe.
    #[must_use]
    pub fn window(&self) -> Duration {
        self.offsets.last().copied().unwrap_or_default()
    }

    /// What: Run the schedule for `key` on a background task.
    ///
    /// Inputs:
    /// - `prober`: Capability check, run on the blocking pool.
    /// - `cancel`: Checked before every probe; set it to stop early.
    /// - `events`: Receives `Probed` per probe and `ProbesExhausted` when the window ends.
    ///
    /// Output:
    /// - Handle of the spawned task.
    ///
    /// Details:
    /// - Stops after the first positive probe.
    /// - Each probe runs under the per-probe limit, and no probe outlives
    ///   `window() + probe_timeout()`; an overrun counts as negative. Unless cancelled, the
    ///   task therefore always ends with `ProbesExhausted` or a positive `Probed`.
    pub fn spawn(
        &self,
        prober: Arc<dyn Prober>,
        key: JobKey,
        cancel: Arc<AtomicBool>,
        events: mpsc::UnboundedSender<InstallEvent>,
    ) -> JoinHandle<()> {
        let offsets = self.offsets.clone();
        let probe_timeout = self.probe_timeout;
        let window = self.window();
        tokio::spawn(async move {
            let origin = tokio::time::Instant::now();
            let hard_stop = origin + window + probe_timeout;
            for (attempt, offset) in offsets.iter().enumerate() {
                tokio::time::sleep_until(origin + *offset).await;
                if cancel.load(Ordering::Relaxed) {
                    debug!(job = %key, "probe schedule cancelled");
                    return;
                }
                let p = Arc::clone(&prober);
                let package = key.package.clone();
                let deadline = (tokio::time::Instant::now() + probe_timeout).min(hard_stop);
                let probe = tokio::task::spawn_blocking(move || p.can_open(&package));
                let installed = match tokio::time::timeout_at(deadline, probe).await {
                    Ok(joined) => joined.unwrap_or(false),
                    Err(_) => {
                        debug!(job = %key, attempt = attempt + 1, "probe timed out");
                        false
                    }
                };
                debug!(job = %key, attempt = attempt + 1, installed, "probe finished");
                if events.send(InstallEvent::Probed(key.clone(), installed)).is_err() || installed {
                    return;
                }
            }
            if !cancel.load(Ordering::Relaxed) {
                let _ = events.send(InstallEvent::ProbesExhausted(key));
            }
        })
    }
}
