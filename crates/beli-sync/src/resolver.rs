//! # Provider Resolver
//!
//! Decides per call whether reads go to the remote backend or to local data.
//!
//! ## Availability Decision
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    is_remote_available()                                │
//! │                                                                         │
//! │  offline? ──yes──► false                    (no probe, nothing cached)  │
//! │     │ no                                                                │
//! │  fresh record? ──yes──► cached verdict      (TTL, default 30s)          │
//! │     │ no                                                                │
//! │  url + key set? ──no──► record false                                    │
//! │     │ yes                                                               │
//! │  poor link? ──yes──► record true            (assume reachable)          │
//! │     │ no                                                                │
//! │  HEAD probe ──► record 2xx ? true : false   (errors record false)       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

use beli_core::{ConnectionQuality, DataProviderStatus, Provider, ProviderMode};

use crate::connectivity::ConnectivityMonitor;
use crate::probe::ReachabilityProbe;

/// Outcome of the latest availability check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AvailabilityRecord {
    pub available: bool,
    pub checked_at: Instant,
}

impl AvailabilityRecord {
    fn now(available: bool) -> Self {
        AvailabilityRecord {
            available,
            checked_at: Instant::now(),
        }
    }

    /// Returns true while the record is younger than `ttl`.
    pub fn is_fresh(&self, ttl: Duration) -> bool {
        self.checked_at.elapsed() < ttl
    }
}

/// Remote/local routing with a TTL-cached reachability verdict.
pub struct ProviderResolver {
    mode: ProviderMode,
    ttl: Duration,
    monitor: Arc<ConnectivityMonitor>,
    probe: Arc<dyn ReachabilityProbe>,
    record: Mutex<Option<AvailabilityRecord>>,
}

impl ProviderResolver {
    pub fn new(
        mode: ProviderMode,
        ttl: Duration,
        monitor: Arc<ConnectivityMonitor>,
        probe: Arc<dyn ReachabilityProbe>,
    ) -> Self {
        ProviderResolver {
            mode,
            ttl,
            monitor,
            probe,
            record: Mutex::new(None),
        }
    }

    pub fn mode(&self) -> ProviderMode {
        self.mode
    }

    pub fn monitor(&self) -> &Arc<ConnectivityMonitor> {
        &self.monitor
    }

    /// The latest record, fresh or not.
    pub fn record(&self) -> Option<AvailabilityRecord> {
        match self.record.lock() {
            Ok(slot) => *slot,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    fn store(&self, record: Option<AvailabilityRecord>) {
        match self.record.lock() {
            Ok(mut slot) => *slot = record,
            Err(poisoned) => *poisoned.into_inner() = record,
        }
    }

    fn remember(&self, available: bool) -> bool {
        self.store(Some(AvailabilityRecord::now(available)));
        available
    }

    /// Checks whether the remote backend can be used right now.
    ///
    /// Never fails: every error path resolves to `false`.
    pub async fn is_remote_available(&self) -> bool {
        if !self.monitor.is_online() {
            debug!("Offline, remote unavailable");
            return false;
        }

        if let Some(record) = self.record().filter(|r| r.is_fresh(self.ttl)) {
            return record.available;
        }

        if !self.probe.is_configured() {
            debug!("Remote not configured");
            return self.remember(false);
        }

        // Probing on a poor link mostly measures the link; assume reachable
        if self.monitor.quality() == ConnectionQuality::Poor {
            debug!("Poor connection, assuming remote is reachable");
            return self.remember(true);
        }

        let available = match self.probe.probe().await {
            Ok(available) => available,
            Err(e) => {
                warn!(error = %e, "Remote availability check failed");
                false
            }
        };

        debug!(available, "Remote availability checked");
        self.remember(available)
    }

    /// Picks the provider for the next call.
    pub async fn resolve_provider(&self) -> Provider {
        match self.mode {
            ProviderMode::Local => Provider::Local,
            ProviderMode::Remote => Provider::Remote,
            ProviderMode::Auto => {
                if !self.monitor.is_online() {
                    Provider::Local
                } else if self.is_remote_available().await {
                    Provider::Remote
                } else {
                    Provider::Local
                }
            }
        }
    }

    /// Forgets the cached verdict.
    pub fn invalidate(&self) {
        self.store(None);
    }

    /// Records the remote as unavailable as of now.
    pub fn mark_unavailable(&self) {
        self.remember(false);
    }

    /// Best guess without any I/O: mode, connectivity and the cached
    /// verdict regardless of age.
    pub fn prefers_local(&self) -> bool {
        match self.mode {
            ProviderMode::Local => true,
            ProviderMode::Remote => false,
            ProviderMode::Auto => {
                if !self.monitor.is_online() {
                    return true;
                }
                self.record().is_some_and(|r| !r.available)
            }
        }
    }

    /// Diagnostic snapshot. May probe.
    pub async fn status(&self) -> DataProviderStatus {
        let remote_available = self.is_remote_available().await;
        let active = self.resolve_provider().await;

        DataProviderStatus {
            configured: self.mode,
            active,
            is_online: self.monitor.is_online(),
            quality: self.monitor.quality(),
            remote_available,
            remote_url: self.probe.endpoint(),
        }
    }
}

impl std::fmt::Debug for ProviderResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderResolver")
            .field("mode", &self.mode)
            .field("ttl", &self.ttl)
            .field("record", &self.record())
            .finish()
    }
}
