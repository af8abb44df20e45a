//! # Reachability Probe
//!
//! Answers "is the remote backend answering right now?" with one cheap
//! request. The resolver owns caching; a probe only ever performs I/O.

use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

use crate::config::RemoteSettings;
use crate::error::{SyncError, SyncResult};

/// A single reachability check against the remote backend.
#[async_trait]
pub trait ReachabilityProbe: Send + Sync {
    /// Returns false when the endpoint or credentials are missing. An
    /// unconfigured probe is never called.
    fn is_configured(&self) -> bool;

    /// Base URL of the remote, for status reporting.
    fn endpoint(&self) -> Option<String>;

    /// Performs the check. `Ok(false)` means the remote answered with a
    /// non-success status; `Err` means no usable answer.
    async fn probe(&self) -> SyncResult<bool>;
}

// =============================================================================
// HTTP Probe
// =============================================================================

/// `HEAD {url}{health_path}` with the anon key in an `apikey` header.
#[derive(Debug, Clone)]
pub struct HttpReachabilityProbe {
    client: reqwest::Client,
    base_url: Option<String>,
    anon_key: Option<String>,
    health_path: String,
    timeout: Duration,
}

impl HttpReachabilityProbe {
    pub fn new(settings: &RemoteSettings) -> SyncResult<Self> {
        let timeout = settings.probe_timeout();
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        let non_empty = |v: &Option<String>| {
            v.as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };

        Ok(HttpReachabilityProbe {
            client,
            base_url: non_empty(&settings.url),
            anon_key: non_empty(&settings.anon_key),
            health_path: settings.health_path.clone(),
            timeout,
        })
    }

    fn probe_url(&self, base: &str) -> String {
        format!(
            "{}/{}",
            base.trim_end_matches('/'),
            self.health_path.trim_start_matches('/')
        )
    }
}

#[async_trait]
impl ReachabilityProbe for HttpReachabilityProbe {
    fn is_configured(&self) -> bool {
        self.base_url.is_some() && self.anon_key.is_some()
    }

    fn endpoint(&self) -> Option<String> {
        self.base_url.clone()
    }

    async fn probe(&self) -> SyncResult<bool> {
        let (Some(base), Some(key)) = (&self.base_url, &self.anon_key) else {
            return Err(SyncError::RemoteUnconfigured);
        };

        let url = self.probe_url(base);
        debug!(url = %url, "Probing remote availability");

        let response = self
            .client
            .head(&url)
            .header("apikey", key)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    SyncError::Timeout(self.timeout.as_secs())
                } else {
                    SyncError::ProbeFailed(e.to_string())
                }
            })?;

        let status = response.status();
        debug!(status = %status, "Probe answered");
        Ok(status.is_success())
    }
}
