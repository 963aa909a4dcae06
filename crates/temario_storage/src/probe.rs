//! Reachability checks for stored PDF URLs.

use std::time::Duration;
use temario_interface::{ProbeOutcome, UrlProbe};
use tracing::{debug, instrument};

/// Probe over HTTP HEAD.
///
/// Any non-2xx answer, transport error or elapsed deadline is unreachable.
/// `file://` URLs produced by [`crate::FileSystemObjectStorage`] are checked
/// on disk instead.
#[derive(Debug, Clone, Default)]
pub struct HttpUrlProbe {
    client: reqwest::Client,
}

impl HttpUrlProbe {
    /// Create a probe with a default client.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a probe sharing an existing client.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    async fn probe_http(&self, url: &str, timeout: Duration) -> ProbeOutcome {
        let request = self.client.head(url).timeout(timeout).send();
        match tokio::time::timeout(timeout, request).await {
            Err(_) => ProbeOutcome::Unreachable(format!(
                "HEAD timed out after {}ms",
                timeout.as_millis()
            )),
            Ok(Err(e)) if e.is_timeout() => ProbeOutcome::Unreachable(format!(
                "HEAD timed out after {}ms",
                timeout.as_millis()
            )),
            Ok(Err(e)) => ProbeOutcome::Unreachable(format!("HEAD failed: {}", e)),
            Ok(Ok(response)) if response.status().is_success() => ProbeOutcome::Reachable,
            Ok(Ok(response)) => {
                ProbeOutcome::Unreachable(format!("HEAD returned HTTP {}", response.status()))
            }
        }
    }

    async fn probe_file(path: &str) -> ProbeOutcome {
        match tokio::fs::metadata(path).await {
            Ok(meta) if meta.is_file() && meta.len() > 0 => ProbeOutcome::Reachable,
            Ok(_) => ProbeOutcome::Unreachable(format!("{} is empty or not a file", path)),
            Err(e) => ProbeOutcome::Unreachable(format!("{}: {}", path, e)),
        }
    }
}

#[async_trait::async_trait]
impl UrlProbe for HttpUrlProbe {
    #[instrument(skip(self), fields(timeout_ms = timeout.as_millis() as u64))]
    async fn probe(&self, url: &str, timeout: Duration) -> ProbeOutcome {
        let outcome = match url.strip_prefix("file://") {
            Some(path) => Self::probe_file(path).await,
            None if url.starts_with("http://") || url.starts_with("https://") => {
                self.probe_http(url, timeout).await
            }
            None => ProbeOutcome::Unreachable(format!("unsupported URL scheme: {}", url)),
        };
        debug!(reachable = outcome.is_reachable(), "Probed URL");
        outcome
    }
}
