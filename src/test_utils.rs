//! Test utilities for common test setup.
//!
//! A throwaway HTTP/1.1 server on the loopback interface, so transfer and catalog code can be
//! exercised against real sockets without external hosts.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// One canned response.
#[derive(Clone, Debug)]
pub struct CannedResponse {
    /// Status code written on the status line.
    pub status: u16,
    /// Response body.
    pub body: Vec<u8>,
    /// Send a `Content-Length` header.
    pub with_length: bool,
    /// Pause after each body chunk.
    pub chunk_delay: Duration,
    /// Body chunk size in bytes.
    pub chunk_size: usize,
}

impl CannedResponse {
    /// `200 OK` with a known length.
    pub fn ok(body: Vec<u8>) -> Self {
        Self {
            status: 200,
            body,
            with_length: true,
            chunk_delay: Duration::ZERO,
            chunk_size: 64 * 1024,
        }
    }

    /// `200 OK` trickled out in `chunk_size` pieces with `delay` between them.
    pub fn slow(body: Vec<u8>, chunk_size: usize, delay: Duration) -> Self {
        Self {
            chunk_delay: delay,
            chunk_size: chunk_size.max(1),
            ..Self::ok(body)
        }
    }

    /// Empty-bodied response with `status`.
    pub fn status(status: u16) -> Self {
        Self {
            status,
            body: Vec::new(),
            with_length: true,
            chunk_delay: Duration::ZERO,
            chunk_size: 64 * 1024,
        }
    }
}

/// Running test server.
pub struct TestServer {
    /// Base URL, e.g. `http://127.0.0.1:40123`.
    pub base_url: String,
    /// Requests answered so far.
    pub hits: Arc<AtomicUsize>,
}

impl TestServer {
    /// URL of `path` on this server.
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Number of requests answered.
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

/// What: Serve `responses` in order, repeating the last one once the list is exhausted.
///
/// Inputs:
/// - `responses`: At least one canned response.
///
/// Output:
/// - [`TestServer`] bound to an ephemeral loopback port.
///
/// Details:
/// - Every connection is answered once and closed (`Connection: close`).
pub async fn serve(responses: Vec<CannedResponse>) -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind loopback listener");
    let addr = listener.local_addr().expect("listener address");
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&hits);
    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                break;
            };
            let index = counter.fetch_add(1, Ordering::SeqCst);
            let response = responses
                .get(index)
                .or_else(|| responses.last())
                .cloned()
                .expect("at least one canned response");
            tokio::spawn(async move {
                let mut buf = vec![0u8; 4096];
                let mut seen = Vec::new();
                while !seen.windows(4).any(|w| w == b"\r\n\r\n") {
                    match socket.read(&mut buf).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => seen.extend_from_slice(&buf[..n]),
                    }
                }
                let mut head = format!(
                    "HTTP/1.1 {} Test\r\nConnection: close\r\nContent-Type: application/octet-stream\r\n",
                    response.status
                );
                if response.with_length {
                    head.push_str(&format!("Content-Length: {}\r\n", response.body.len()));
                }
                head.push_str("\r\n");
                let _ = socket.write_all(head.as_bytes()).await;
                for chunk in response.body.chunks(response.chunk_size) {
                    if socket.write_all(chunk).await.is_err() {
                        return;
                    }
                    if !response.chunk_delay.is_zero() {
                        let _ = socket.flush().await;
                        tokio::time::sleep(response.chunk_delay).await;
                    }
                }
                let _ = socket.shutdown().await;
            });
        }
    });
    TestServer {
        base_url: format!("http://{addr}"),
        hits,
    }
}

/// Client that talks to the loopback server directly, ignoring proxy environment variables.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .no_proxy()
        .build()
        .expect("build test client")
}
