//! # Network Types
//!
//! Platform network events and the rules that turn them into a coarse
//! connection quality.
//!
//! ## Quality Classification
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Network Type → Connection Quality                    │
//! │                                                                         │
//! │  not connected ─────────────────────────────────────► OFFLINE           │
//! │  wifi ──────────────────────────────────────────────► EXCELLENT         │
//! │  ethernet ──────────────────────────────────────────► EXCELLENT         │
//! │  cellular ─┬─ 5g / 4g ──────────────────────────────► GOOD              │
//! │            ├─ 3g / 2g / unknown generation ─────────► POOR              │
//! │            └─ no details reported ──────────────────► GOOD              │
//! │  anything else ─────────────────────────────────────► GOOD              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;
use ts_rs::TS;

// =============================================================================
// Connection Quality
// =============================================================================

/// Coarse usability classification of the current connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionQuality {
    Excellent,
    Good,
    Poor,
    Offline,
}

impl std::fmt::Display for ConnectionQuality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionQuality::Excellent => write!(f, "excellent"),
            ConnectionQuality::Good => write!(f, "good"),
            ConnectionQuality::Poor => write!(f, "poor"),
            ConnectionQuality::Offline => write!(f, "offline"),
        }
    }
}

// =============================================================================
// Connection State
// =============================================================================

/// Reachability plus quality, as last reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ConnectionState {
    pub connected: bool,
    pub quality: ConnectionQuality,
}

impl ConnectionState {
    /// A disconnected state.
    pub const fn offline() -> Self {
        ConnectionState {
            connected: false,
            quality: ConnectionQuality::Offline,
        }
    }

    /// Derives the state from a platform event.
    pub fn from_event(event: &NetworkEvent) -> Self {
        ConnectionState {
            connected: event.is_connected,
            quality: event.quality(),
        }
    }
}

// =============================================================================
// Network Type
// =============================================================================

/// Connection type reported by the platform.
///
/// Unrecognized strings map to [`NetworkType::Other`] rather than failing:
/// the platform vocabulary is open-ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum NetworkType {
    None,
    Unknown,
    Cellular,
    Wifi,
    Bluetooth,
    Ethernet,
    Wimax,
    Vpn,
    Other,
}

impl NetworkType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NetworkType::None => "none",
            NetworkType::Unknown => "unknown",
            NetworkType::Cellular => "cellular",
            NetworkType::Wifi => "wifi",
            NetworkType::Bluetooth => "bluetooth",
            NetworkType::Ethernet => "ethernet",
            NetworkType::Wimax => "wimax",
            NetworkType::Vpn => "vpn",
            NetworkType::Other => "other",
        }
    }
}

impl From<&str> for NetworkType {
    fn from(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "none" => NetworkType::None,
            "unknown" => NetworkType::Unknown,
            "cellular" => NetworkType::Cellular,
            "wifi" => NetworkType::Wifi,
            "bluetooth" => NetworkType::Bluetooth,
            "ethernet" => NetworkType::Ethernet,
            "wimax" => NetworkType::Wimax,
            "vpn" => NetworkType::Vpn,
            _ => NetworkType::Other,
        }
    }
}

impl From<String> for NetworkType {
    fn from(s: String) -> Self {
        NetworkType::from(s.as_str())
    }
}

impl From<NetworkType> for String {
    fn from(t: NetworkType) -> Self {
        t.as_str().to_string()
    }
}

impl std::fmt::Display for NetworkType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cellular radio generation, read from event details.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellularGeneration {
    G2,
    G3,
    G4,
    G5,
}

impl CellularGeneration {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "2g" => Some(CellularGeneration::G2),
            "3g" => Some(CellularGeneration::G3),
            "4g" => Some(CellularGeneration::G4),
            "5g" => Some(CellularGeneration::G5),
            _ => None,
        }
    }
}

// =============================================================================
// Network Event
// =============================================================================

/// A network change event as delivered by the platform.
///
/// Shape on the wire: `{"isConnected": bool, "type": string, "details": any}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkEvent {
    pub is_connected: bool,

    #[serde(rename = "type")]
    pub network_type: NetworkType,

    /// Platform-specific details; only `cellularGeneration` is read.
    #[serde(default)]
    pub details: Value,
}

impl NetworkEvent {
    /// Creates an event with no details.
    pub fn new(is_connected: bool, network_type: NetworkType) -> Self {
        NetworkEvent {
            is_connected,
            network_type,
            details: Value::Null,
        }
    }

    /// A disconnected event.
    pub fn disconnected() -> Self {
        Self::new(false, NetworkType::None)
    }

    /// A connected cellular event reporting the given generation.
    pub fn cellular(generation: &str) -> Self {
        NetworkEvent {
            is_connected: true,
            network_type: NetworkType::Cellular,
            details: serde_json::json!({ "cellularGeneration": generation }),
        }
    }

    /// Replaces the details payload.
    pub fn with_details(mut self, details: Value) -> Self {
        self.details = details;
        self
    }

    /// Returns the cellular generation, if the details carry one.
    pub fn cellular_generation(&self) -> Option<CellularGeneration> {
        self.details
            .get("cellularGeneration")
            .and_then(Value::as_str)
            .and_then(CellularGeneration::parse)
    }

    /// Classifies this event's connection quality.
    pub fn quality(&self) -> ConnectionQuality {
        if !self.is_connected {
            return ConnectionQuality::Offline;
        }

        match self.network_type {
            NetworkType::Wifi | NetworkType::Ethernet => ConnectionQuality::Excellent,
            // A cellular event without details falls through to the default
            NetworkType::Cellular if !self.details.is_null() => match self.cellular_generation() {
                Some(CellularGeneration::G5) | Some(CellularGeneration::G4) => ConnectionQuality::Good,
                _ => ConnectionQuality::Poor,
            },
            _ => ConnectionQuality::Good,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wired_and_wifi_are_excellent() {
        assert_eq!(NetworkEvent::new(true, NetworkType::Wifi).quality(), ConnectionQuality::Excellent);
        assert_eq!(NetworkEvent::new(true, NetworkType::Ethernet).quality(), ConnectionQuality::Excellent);
    }

    #[test]
    fn test_cellular_generations() {
        assert_eq!(NetworkEvent::cellular("5g").quality(), ConnectionQuality::Good);
        assert_eq!(NetworkEvent::cellular("4g").quality(), ConnectionQuality::Good);
        assert_eq!(NetworkEvent::cellular("3g").quality(), ConnectionQuality::Poor);
        assert_eq!(NetworkEvent::cellular("2g").quality(), ConnectionQuality::Poor);
        assert_eq!(NetworkEvent::cellular("6g").quality(), ConnectionQuality::Poor);

        let no_details = NetworkEvent::new(true, NetworkType::Cellular);
        assert_eq!(no_details.quality(), ConnectionQuality::Good);
    }

    #[test]
    fn test_unknown_types_default_to_good() {
        assert_eq!(NetworkEvent::new(true, NetworkType::Unknown).quality(), ConnectionQuality::Good);
        assert_eq!(NetworkEvent::new(true, NetworkType::Vpn).quality(), ConnectionQuality::Good);
    }

    #[test]
    fn test_disconnected_is_offline_regardless_of_type() {
        assert_eq!(NetworkEvent::new(false, NetworkType::Wifi).quality(), ConnectionQuality::Offline);
        assert_eq!(ConnectionState::from_event(&NetworkEvent::disconnected()), ConnectionState::offline());
    }

    #[test]
    fn test_event_deserializes_from_platform_shape() {
        let json = r#"{"isConnected":true,"type":"cellular","details":{"cellularGeneration":"3g","carrier":"x"}}"#;
        let event: NetworkEvent = serde_json::from_str(json).unwrap();
        assert!(event.is_connected);
        assert_eq!(event.network_type, NetworkType::Cellular);
        assert_eq!(event.cellular_generation(), Some(CellularGeneration::G3));

        let json = r#"{"isConnected":false,"type":"something-new"}"#;
        let event: NetworkEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.network_type, NetworkType::Other);
        assert!(event.details.is_null());
    }
}
