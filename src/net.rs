//! Shared HTTP client and the remote-fetch collaborator used for catalog requests.

use std::future::Future;
use std::sync::LazyLock;
use std::time::Duration;

use crate::error::StoreError;

/// Shared HTTP client with connection pooling; per-request timeouts are set by callers.
static HTTP_CLIENT: LazyLock<reqwest::Client> = LazyLock::new(|| {
    reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .user_agent(format!("tvstore/{}", env!("CARGO_PKG_VERSION")))
        .build()
        .unwrap_or_else(|e| {
            tracing::warn!(error = %e, "failed to build tuned HTTP client; using defaults");
            reqwest::Client::new()
        })
});

/// What: Access the process-wide HTTP client.
///
/// Output:
/// - Cheap clone of the pooled client.
#[must_use]
pub fn http_client() -> reqwest::Client {
    HTTP_CLIENT.clone()
}

/// Status and body of a completed GET.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteResponse {
    /// HTTP status code.
    pub status: u16,
    /// Raw response body.
    pub body: Vec<u8>,
}

impl RemoteResponse {
    /// `true` for 2xx statuses.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }
}

/// What: Bounded-timeout GET collaborator.
///
/// Details:
/// - Implementations must resolve within roughly `timeout`, returning `StoreError::Timeout`
///   when the bound is exceeded.
/// - Non-2xx answers are returned as `Ok` so the caller can classify them.
pub trait RemoteSource: Send + Sync {
    /// Fetch `url`, giving up after `timeout`.
    fn get(
        &self,
        url: &str,
        timeout: Duration,
    ) -> impl Future<Output = Result<RemoteResponse, StoreError>> + Send;
}

/// `reqwest`-backed [`RemoteSource`].
#[derive(Debug, Clone)]
pub struct HttpRemote {
    /// Pooled client.
    client: reqwest::Client,
}

impl HttpRemote {
    /// Remote backed by the shared client.
    #[must_use]
    pub fn new() -> Self {
        Self {
            client: http_client(),
        }
    }
}

impl Default for HttpRemote {
    fn default() -> Self {
        Self::new()
    }
}

impl RemoteSource for HttpRemote {
    async fn get(&self, url: &str, timeout: Duration) -> Result<RemoteResponse, StoreError> {
        let response = self.client.get(url).timeout(timeout).send().await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?.to_vec();
        tracing::debug!(url, status, bytes = body.len(), "remote GET finished");
        Ok(RemoteResponse { status, body })
    }
}
