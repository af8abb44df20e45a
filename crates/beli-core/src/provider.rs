//! # Data Provider Types
//!
//! Which backend an operation runs against.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                  ProviderMode (configured) → Provider (per call)        │
//! │                                                                         │
//! │  LOCAL  ──────────────────────────────────────────────► Local           │
//! │  REMOTE ──────────────────────────────────────────────► Remote          │
//! │  AUTO   ──┬─ offline ─────────────────────────────────► Local           │
//! │           ├─ remote reachable ────────────────────────► Remote          │
//! │           └─ remote unreachable ──────────────────────► Local           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::CoreError;

/// Configured provider mode, fixed for the process lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ProviderMode {
    /// Always use the remote backend, even when offline.
    Remote,

    /// Always use on-device data.
    Local,

    /// Prefer the remote backend when it is reachable.
    #[default]
    Auto,
}

impl std::fmt::Display for ProviderMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderMode::Remote => write!(f, "remote"),
            ProviderMode::Local => write!(f, "local"),
            ProviderMode::Auto => write!(f, "auto"),
        }
    }
}

impl std::str::FromStr for ProviderMode {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "remote" | "supabase" => Ok(ProviderMode::Remote),
            "local" | "mock" => Ok(ProviderMode::Local),
            "auto" => Ok(ProviderMode::Auto),
            other => Err(CoreError::UnknownProviderMode(other.to_string())),
        }
    }
}

/// The execution path chosen for a single operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum Provider {
    Remote,
    Local,
}

impl Provider {
    pub fn is_remote(&self) -> bool {
        matches!(self, Provider::Remote)
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Provider::Remote => write!(f, "remote"),
            Provider::Local => write!(f, "local"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_parsing() {
        assert_eq!("auto".parse::<ProviderMode>().unwrap(), ProviderMode::Auto);
        assert_eq!("remote".parse::<ProviderMode>().unwrap(), ProviderMode::Remote);
        assert_eq!("SUPABASE".parse::<ProviderMode>().unwrap(), ProviderMode::Remote);
        assert_eq!("mock".parse::<ProviderMode>().unwrap(), ProviderMode::Local);
        assert_eq!(" local ".parse::<ProviderMode>().unwrap(), ProviderMode::Local);
        assert!("cloud".parse::<ProviderMode>().is_err());
    }

    #[test]
    fn test_default_mode_is_auto() {
        assert_eq!(ProviderMode::default(), ProviderMode::Auto);
    }
}
