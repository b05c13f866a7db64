//! Background streaming transfer with real progress and cancellation.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::{
    DEFAULT_RETRY_BACKOFF, FailureCause, JobHandle, Strategy, TransferDriver, TransferEvent,
    TransferFailure, TransferOutput, TransferRequest, classify_io, classify_reqwest, retry_delay,
    should_retry,
};
use crate::util::file_stem_for;

/// Byte step used to report progress when the server sends no length.
const UNKNOWN_TOTAL_STEP: u64 = 1024 * 1024;

/// What: Throttle for progress events.
///
/// Details:
/// - With a known total, reports only when the integer percent increases.
/// - Without one, reports once per [`UNKNOWN_TOTAL_STEP`] bytes, keeping the last percent.
/// - Survives across retries so reported percent never drops.
#[derive(Debug, Default)]
struct ProgressGate {
    /// Highest percent reported so far.
    percent: u8,
    /// Whether anything has been reported.
    started: bool,
    /// Last reported megabyte step for unknown totals.
    step: u64,
}

impl ProgressGate {
    /// Return the event to send for `bytes` received out of `total`, if any.
    fn observe(&mut self, bytes: u64, total: Option<u64>) -> Option<TransferEvent> {
        match total.filter(|t| *t > 0) {
            Some(total) => {
                let pct = u8::try_from((bytes.saturating_mul(100) / total).min(100)).unwrap_or(100);
                if self.started && pct <= self.percent {
                    return None;
                }
                self.started = true;
                self.percent = self.percent.max(pct);
            }
            None => {
                let step = bytes / UNKNOWN_TOTAL_STEP;
                if self.started && step <= self.step {
                    return None;
                }
                self.started = true;
                self.step = step;
            }
        }
        Some(TransferEvent::Progress {
            percent: self.percent,
            bytes,
            total,
        })
    }
}

/// What: Driver that streams the artifact into the downloads directory.
///
/// Details:
/// - Writes to `<dir>/<name>.<job_id>.part` and renames to `<dir>/<name>` once complete. Each
///   job stages into its own file, so a cancelled task cleaning up never touches a restart's
///   data.
/// - The task outlives UI navigation; only [`JobHandle::cancel`] stops it early.
/// - Partial files are removed on failure.
#[derive(Debug, Clone)]
pub struct ManagedDriver {
    /// HTTP client.
    client: reqwest::Client,
    /// Directory receiving finished files.
    dir: PathBuf,
    /// Base retry delay.
    retry_backoff: Duration,
}

impl ManagedDriver {
    /// Driver writing into `dir`.
    #[must_use]
    pub const fn new(client: reqwest::Client, dir: PathBuf) -> Self {
        Self {
            client,
            dir,
            retry_backoff: DEFAULT_RETRY_BACKOFF,
        }
    }

    /// Override the base retry delay.
    #[must_use]
    pub fn with_retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = backoff;
        self
    }

    /// Directory receiving finished files.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl TransferDriver for ManagedDriver {
    fn strategy(&self) -> Strategy {
        Strategy::Managed
    }

    fn start(
        &self,
        request: TransferRequest,
        events: mpsc::UnboundedSender<TransferEvent>,
    ) -> JobHandle {
        let cancel = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&cancel);
        let driver = self.clone();
        let task = tokio::spawn(async move {
            let terminal = match driver.run(&request, &flag, &events).await {
                Ok(path) => TransferEvent::Completed(TransferOutput::File(path)),
                Err(failure) => TransferEvent::Failed(failure),
            };
            let _ = events.send(terminal);
        });
        JobHandle::new(Some(cancel), task)
    }
}

impl ManagedDriver {
    /// Attempt loop with retry and cancellation checks between attempts.
    async fn run(
        &self,
        request: &TransferRequest,
        cancel: &AtomicBool,
        events: &mpsc::UnboundedSender<TransferEvent>,
    ) -> Result<PathBuf, TransferFailure> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| classify_io(&e))?;
        let name = file_stem_for(&request.destination_name);
        let target = self.dir.join(&name);
        let part = self.dir.join(format!("{name}.{}.part", request.job_id));
        let mut gate = ProgressGate::default();
        let mut attempt: u32 = 0;
        loop {
            if cancel.load(Ordering::Relaxed) {
                return Err(TransferFailure::cancelled());
            }
            attempt += 1;
            let result = self
                .stream_once(request, &part, cancel, &mut gate, events)
                .await;
            match result {
                Ok(()) => {
                    tokio::fs::rename(&part, &target)
                        .await
                        .map_err(|e| classify_io(&e))?;
                    info!(uri = %request.source_uri, path = %target.display(), attempt, "managed transfer finished");
                    return Ok(target);
                }
                Err(failure) => {
                    if let Err(e) = tokio::fs::remove_file(&part).await {
                        debug!(path = %part.display(), error = %e, "no partial file to remove");
                    }
                    if !should_retry(&failure, attempt, request.retries) {
                        return Err(failure);
                    }
                    let delay = retry_delay(self.retry_backoff, attempt);
                    warn!(
                        uri = %request.source_uri,
                        cause = failure.cause.label(),
                        attempt,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        "transfer attempt failed; retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    /// One GET streamed chunk by chunk into `part`.
    async fn stream_once(
        &self,
        request: &TransferRequest,
        part: &Path,
        cancel: &AtomicBool,
        gate: &mut ProgressGate,
        events: &mpsc::UnboundedSender<TransferEvent>,
    ) -> Result<(), TransferFailure> {
        let mut response = self
            .client
            .get(&request.source_uri)
            .timeout(request.timeout)
            .send()
            .await
            .map_err(|e| classify_reqwest(&e))?;
        let status = response.status();
        if !status.is_success() {
            return Err(TransferFailure::new(
                FailureCause::HttpStatus(status.as_u16()),
                format!("{} answered {status}", request.source_uri),
            ));
        }
        let total = response.content_length();
        let mut file = tokio::fs::File::create(part)
            .await
            .map_err(|e| classify_io(&e))?;
        let mut received: u64 = 0;
        if let Some(ev) = gate.observe(0, total) {
            let _ = events.send(ev);
        }
        while let Some(chunk) = response.chunk().await.map_err(|e| classify_reqwest(&e))? {
            if cancel.load(Ordering::Relaxed) {
                return Err(TransferFailure::cancelled());
            }
            file.write_all(&chunk).await.map_err(|e| classify_io(&e))?;
            received += chunk.len() as u64;
            if let Some(ev) = gate.observe(received, total) {
                let _ = events.send(ev);
            }
        }
        file.flush().await.map_err(|e| classify_io(&e))?;
        if let Some(expected) = total
            && received < expected
        {
            return Err(TransferFailure::new(
                FailureCause::Network,
                format!("connection closed after {received} of {expected} bytes"),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{CannedResponse, serve};

    fn request(uri: String) -> TransferRequest {
        TransferRequest {
            source_uri: uri,
            destination_name: "com.example.player.apk".into(),
            job_id: 1,
            timeout: Duration::from_secs(10),
            retries: 0,
        }
    }

    #[test]
    /// What: Known totals report on each new integer percent only.
    fn gate_reports_percent_changes() {
        let mut gate = ProgressGate::default();
        let total = Some(1000);
        assert!(gate.observe(0, total).is_some());
        assert!(gate.observe(5, total).is_none());
        assert!(matches!(
            gate.observe(10, total),
            Some(TransferEvent::Progress { percent: 1, .. })
        ));
        assert!(matches!(
            gate.observe(1000, total),
            Some(TransferEvent::Progress { percent: 100, .. })
        ));
        // A restarted attempt never moves the percent backwards.
        assert!(gate.observe(10, total).is_none());
    }

    #[test]
    /// What: Unknown totals report once per megabyte.
    fn gate_reports_megabyte_steps() {
        let mut gate = ProgressGate::default();
        assert!(gate.observe(0, None).is_some());
        assert!(gate.observe(UNKNOWN_TOTAL_STEP - 1, None).is_none());
        assert!(gate.observe(UNKNOWN_TOTAL_STEP, None).is_some());
        assert!(gate.observe(UNKNOWN_TOTAL_STEP + 10, None).is_none());
    }

    #[tokio::test]
    /// What: A streamed download lands under its final name with monotonic progress.
    ///
    /// Inputs:
    /// - Loopback server answering 200 with a 300 KiB body.
    ///
    /// Output:
    /// - Progress ends at 100; `Completed(File)` points at the finished file; no `.part` remains.
    async fn streams_to_final_file() {
        let body: Vec<u8> = (0..300 * 1024).map(|i| (i % 251) as u8).collect();
        let server = serve(vec![CannedResponse::ok(body.clone())]).await;
        let dir = tempfile::tempdir().expect("tempdir");
        let driver = ManagedDriver::new(crate::test_utils::client(), dir.path().join("downloads"));
        let (tx, mut rx) = mpsc::unbounded_channel();
        let _handle = driver.start(request(server.url("player.apk")), tx);
        let mut percents = Vec::new();
        let terminal = loop {
            match rx.recv().await.expect("terminal event") {
                TransferEvent::Progress { percent, .. } => percents.push(percent),
                other => break other,
            }
        };
        assert!(percents.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(percents.last(), Some(&100));
        let TransferEvent::Completed(TransferOutput::File(path)) = terminal else {
            panic!("unexpected terminal {terminal:?}");
        };
        assert_eq!(path, driver.dir().join("com.example.player.apk"));
        assert_eq!(std::fs::read(&path).expect("final file"), body);
        assert!(!driver.dir().join("com.example.player.apk.1.part").exists());
    }

    #[tokio::test]
    /// What: Cancelling before the task runs ends the job as `Cancelled` without a request.
    async fn cancel_before_start() {
        let server = serve(vec![CannedResponse::ok(vec![1; 16])]).await;
        let dir = tempfile::tempdir().expect("tempdir");
        let driver = ManagedDriver::new(crate::test_utils::client(), dir.path().to_path_buf());
        let (tx, mut rx) = mpsc::unbounded_channel();
        let handle = driver.start(request(server.url("x.apk")), tx);
        assert!(handle.cancel());
        match rx.recv().await.expect("terminal event") {
            TransferEvent::Failed(f) => assert_eq!(f.cause, FailureCause::Cancelled),
            other => panic!("unexpected event {other:?}"),
        }
        assert_eq!(server.hits(), 0);
    }

    /// Wait for the terminal event, skipping progress.
    async fn terminal(rx: &mut mpsc::UnboundedReceiver<TransferEvent>) -> TransferEvent {
        loop {
            match tokio::time::timeout(Duration::from_secs(10), rx.recv())
                .await
                .expect("terminal event in time")
                .expect("channel open")
            {
                TransferEvent::Progress { .. } => {}
                other => return other,
            }
        }
    }

    #[tokio::test]
    /// What: Restarting a package right after cancelling its download completes cleanly.
    ///
    /// Inputs:
    /// - Job 1 streaming slowly is cancelled after its first progress event; job 2 for the same
    ///   destination starts immediately, also streaming slowly.
    ///
    /// Output:
    /// - Job 1 ends `Cancelled`; job 2 ends `Completed` with its full body; only the final file
    ///   is left in the directory.
    async fn cancel_then_restart_same_destination() {
        let first_body = vec![1u8; 64 * 1024];
        let second_body: Vec<u8> = (0..=u8::MAX).cycle().take(64 * 1024).collect();
        let first = serve(vec![CannedResponse::slow(
            first_body,
            4 * 1024,
            Duration::from_millis(20),
        )])
        .await;
        let second = serve(vec![CannedResponse::slow(
            second_body.clone(),
            8 * 1024,
            Duration::from_millis(15),
        )])
        .await;
        let dir = tempfile::tempdir().expect("tempdir");
        let driver = ManagedDriver::new(crate::test_utils::client(), dir.path().join("downloads"));

        let (tx1, mut rx1) = mpsc::unbounded_channel();
        let handle1 = driver.start(request(first.url("player.apk")), tx1);
        let first_event = rx1.recv().await.expect("first event");
        assert!(matches!(first_event, TransferEvent::Progress { .. }));
        assert!(handle1.cancel());

        let (tx2, mut rx2) = mpsc::unbounded_channel();
        let mut restart = request(second.url("player.apk"));
        restart.job_id = 2;
        let _handle2 = driver.start(restart, tx2);

        match terminal(&mut rx1).await {
            TransferEvent::Failed(f) => assert_eq!(f.cause, FailureCause::Cancelled),
            other => panic!("unexpected terminal for job 1 {other:?}"),
        }
        let TransferEvent::Completed(TransferOutput::File(path)) = terminal(&mut rx2).await else {
            panic!("job 2 did not complete");
        };
        assert_eq!(std::fs::read(&path).expect("final file"), second_body);
        let names: Vec<String> = std::fs::read_dir(driver.dir())
            .expect("read downloads")
            .filter_map(Result::ok)
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["com.example.player.apk".to_string()]);
    }
}
