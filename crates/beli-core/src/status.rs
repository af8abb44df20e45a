//! # Status DTOs
//!
//! Snapshots handed to UI layers (offline banners, sync indicators, debug
//! panels). Serialized camelCase to match the client code.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::network::ConnectionQuality;
use crate::provider::{Provider, ProviderMode};

/// Outcome of one replay cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SyncReport {
    /// Mutations whose handler succeeded and were removed.
    pub processed: u32,

    /// Mutations whose handler failed this cycle.
    pub failed: u32,
}

impl SyncReport {
    /// A cycle that did no work.
    pub const fn idle() -> Self {
        SyncReport {
            processed: 0,
            failed: 0,
        }
    }

    pub fn is_idle(&self) -> bool {
        self.processed == 0 && self.failed == 0
    }
}

/// Mutation queue status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SyncStatus {
    pub pending_count: usize,
    pub is_syncing: bool,
    #[ts(as = "Option<String>")]
    pub last_sync_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

/// Connectivity plus queue status, for offline indicators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct NetworkStatus {
    pub is_online: bool,
    pub connection_quality: ConnectionQuality,
    pub pending_mutations: usize,
    pub is_syncing: bool,
}

/// Data provider diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct DataProviderStatus {
    pub configured: ProviderMode,
    pub active: Provider,
    pub is_online: bool,
    pub quality: ConnectionQuality,
    pub remote_available: bool,
    pub remote_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_idle_report() {
        assert!(SyncReport::idle().is_idle());
        assert!(!SyncReport { processed: 1, failed: 0 }.is_idle());
    }

    #[test]
    fn test_status_serializes_camel_case() {
        let status = SyncStatus {
            pending_count: 2,
            is_syncing: false,
            last_sync_at: None,
            last_error: Some("1 mutations failed".into()),
        };
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["pendingCount"], 2);
        assert_eq!(json["lastError"], "1 mutations failed");
    }
}
