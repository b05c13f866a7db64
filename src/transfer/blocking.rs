//! Single-request transfer with synthesised progress.

use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::{
    DEFAULT_RETRY_BACKOFF, JobHandle, Strategy, TransferDriver, TransferEvent, TransferFailure,
    TransferOutput, TransferRequest, classify_reqwest, retry_delay, should_retry,
};

/// Highest percent shown before the body has actually arrived.
pub const SYNTHETIC_CAP: u8 = 90;

/// What: Next value of the synthetic progress step function.
///
/// Output:
/// - `current + 10`, never above [`SYNTHETIC_CAP`]; never below `current`.
#[must_use]
pub const fn synthetic_step(current: u8) -> u8 {
    if current >= SYNTHETIC_CAP {
        return current;
    }
    let next = current.saturating_add(10);
    if next > SYNTHETIC_CAP {
        SYNTHETIC_CAP
    } else {
        next
    }
}

/// What: Driver that fetches the whole artifact in one call.
///
/// Details:
/// - While the request is in flight a ticker advances progress by [`synthetic_step`].
/// - On success it snaps to 100 and yields [`TransferOutput::Payload`].
/// - Cancellation is unsupported; the job runs until completion or transport timeout.
#[derive(Debug, Clone)]
pub struct BlockingDriver {
    /// HTTP client.
    client: reqwest::Client,
    /// Interval between synthetic progress steps.
    tick: Duration,
    /// Base retry delay.
    retry_backoff: Duration,
}

impl BlockingDriver {
    /// Driver using `client` with a 500 ms progress tick.
    #[must_use]
    pub const fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            tick: Duration::from_millis(500),
            retry_backoff: DEFAULT_RETRY_BACKOFF,
        }
    }

    /// Override the synthetic progress interval.
    #[must_use]
    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick;
        self
    }

    /// Override the base retry delay.
    #[must_use]
    pub fn with_retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = backoff;
        self
    }
}

impl TransferDriver for BlockingDriver {
    fn strategy(&self) -> Strategy {
        Strategy::Blocking
    }

    fn start(
        &self,
        request: TransferRequest,
        events: mpsc::UnboundedSender<TransferEvent>,
    ) -> JobHandle {
        let driver = self.clone();
        let task = tokio::spawn(async move {
            let terminal = match driver.run(&request, &events).await {
                Ok(body) => {
                    let _ = events.send(TransferEvent::Progress {
                        percent: 100,
                        bytes: body.len() as u64,
                        total: Some(body.len() as u64),
                    });
                    TransferEvent::Completed(TransferOutput::Payload(body))
                }
                Err(failure) => TransferEvent::Failed(failure),
            };
            let _ = events.send(terminal);
        });
        JobHandle::new(None, task)
    }
}

impl BlockingDriver {
    /// Attempt loop; progress never moves backwards across retries.
    async fn run(
        &self,
        request: &TransferRequest,
        events: &mpsc::UnboundedSender<TransferEvent>,
    ) -> Result<Vec<u8>, TransferFailure> {
        let mut percent: u8 = 0;
        let _ = events.send(TransferEvent::Progress {
            percent,
            bytes: 0,
            total: None,
        });
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            let fetch = fetch_all(&self.client, &request.source_uri, request.timeout);
            tokio::pin!(fetch);
            let mut ticker = tokio::time::interval(self.tick);
            ticker.tick().await;
            let result = loop {
                tokio::select! {
                    result = &mut fetch => break result,
                    _ = ticker.tick() => {
                        let next = synthetic_step(percent);
                        if next > percent {
                            percent = next;
                            let _ = events.send(TransferEvent::Progress { percent, bytes: 0, total: None });
                        }
                    }
                }
            };
            match result {
                Ok(body) => {
                    debug!(uri = %request.source_uri, bytes = body.len(), attempt, "blocking transfer finished");
                    return Ok(body);
                }
                Err(failure) if should_retry(&failure, attempt, request.retries) => {
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
                Err(failure) => return Err(failure),
            }
        }
    }
}

/// GET `uri` and read the full body, classifying failures.
async fn fetch_all(
    client: &reqwest::Client,
    uri: &str,
    timeout: Duration,
) -> Result<Vec<u8>, TransferFailure> {
    let response = client
        .get(uri)
        .timeout(timeout)
        .send()
        .await
        .map_err(|e| classify_reqwest(&e))?;
    let status = response.status();
    if !status.is_success() {
        return Err(TransferFailure::new(
            super::FailureCause::HttpStatus(status.as_u16()),
            format!("{uri} answered {status}"),
        ));
    }
    let body = response.bytes().await.map_err(|e| classify_reqwest(&e))?;
    Ok(body.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{CannedResponse, serve};
    use crate::transfer::FailureCause;

    fn request(uri: String, retries: u32) -> TransferRequest {
        TransferRequest {
            source_uri: uri,
            destination_name: "pkg.apk".into(),
            job_id: 1,
            timeout: Duration::from_secs(10),
            retries,
        }
    }

    /// Drain events until the terminal one.
    async fn drain(rx: &mut mpsc::UnboundedReceiver<TransferEvent>) -> (Vec<u8>, TransferEvent) {
        let mut seen = Vec::new();
        while let Some(ev) = rx.recv().await {
            match ev {
                TransferEvent::Progress { percent, .. } => seen.push(percent),
                terminal => return (seen, terminal),
            }
        }
        panic!("channel closed without terminal event");
    }

    #[test]
    /// What: Synthetic progress climbs in steps and stalls at the cap.
    fn step_function_caps_below_completion() {
        let mut p = 0;
        let mut steps = vec![p];
        for _ in 0..15 {
            p = synthetic_step(p);
            steps.push(p);
        }
        assert!(steps.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(*steps.last().expect("non-empty"), SYNTHETIC_CAP);
        assert_eq!(synthetic_step(95), 95);
    }

    #[tokio::test]
    /// What: A successful request ends at 100 with the payload.
    ///
    /// Inputs:
    /// - Loopback server answering 200 with a small body.
    ///
    /// Output:
    /// - Monotonic progress ending in 100, then `Completed(Payload)` with the same bytes.
    async fn completes_with_payload() {
        let server = serve(vec![CannedResponse::ok(b"apk-bytes".to_vec())]).await;
        let driver = BlockingDriver::new(crate::test_utils::client()).with_tick(Duration::from_millis(5));
        let (tx, mut rx) = mpsc::unbounded_channel();
        let handle = driver.start(request(server.url("a.apk"), 0), tx);
        assert!(!handle.cancel());
        let (progress, terminal) = drain(&mut rx).await;
        assert_eq!(progress.first(), Some(&0));
        assert_eq!(progress.last(), Some(&100));
        assert!(progress.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(
            terminal,
            TransferEvent::Completed(TransferOutput::Payload(b"apk-bytes".to_vec()))
        );
    }

    #[tokio::test]
    /// What: A 503 is retried and the second attempt succeeds.
    async fn retries_server_errors() {
        let server = serve(vec![
            CannedResponse::status(503),
            CannedResponse::ok(b"ok".to_vec()),
        ])
        .await;
        let driver = BlockingDriver::new(crate::test_utils::client())
            .with_retry_backoff(Duration::from_millis(1));
        let (tx, mut rx) = mpsc::unbounded_channel();
        let _handle = driver.start(request(server.url("a.apk"), 2), tx);
        let (_, terminal) = drain(&mut rx).await;
        assert!(matches!(terminal, TransferEvent::Completed(_)));
        assert_eq!(server.hits(), 2);
    }

    #[tokio::test]
    /// What: A 404 fails at once without retrying.
    async fn client_errors_are_not_retried() {
        let server = serve(vec![CannedResponse::status(404)]).await;
        let driver = BlockingDriver::new(crate::test_utils::client())
            .with_retry_backoff(Duration::from_millis(1));
        let (tx, mut rx) = mpsc::unbounded_channel();
        let _handle = driver.start(request(server.url("missing.apk"), 3), tx);
        let (_, terminal) = drain(&mut rx).await;
        match terminal {
            TransferEvent::Failed(f) => assert_eq!(f.cause, FailureCause::HttpStatus(404)),
            other => panic!("unexpected terminal {other:?}"),
        }
        assert_eq!(server.hits(), 1);
    }
}
