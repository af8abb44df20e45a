//! # Sync Error Types
//!
//! Error types for sync operations.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Sync Error Categories                             │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │  Configuration  │  │     Remote      │  │      Storage            │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  InvalidConfig  │  │  Unconfigured   │  │  StorageFailed          │ │
//! │  │  InvalidUrl     │  │  ProbeFailed    │  │  SerializationFailed    │ │
//! │  │  ConfigLoad/Save│  │  Http / Timeout │  │  DeserializationFailed  │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐                              │
//! │  │    Replay       │  │    Internal     │                              │
//! │  │                 │  │                 │                              │
//! │  │  HandlerFailed  │  │  NoRuntime      │                              │
//! │  │                 │  │                 │                              │
//! │  └─────────────────┘  └─────────────────┘                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! None of these are fatal to the host: the engine degrades to local data or
//! leaves work queued.

use thiserror::Error;

/// Result type alias for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Sync error type covering all sync failures.
#[derive(Debug, Error)]
pub enum SyncError {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Invalid sync configuration.
    #[error("Invalid sync configuration: {0}")]
    InvalidConfig(String),

    /// Invalid remote URL.
    #[error("Invalid remote URL: {0}")]
    InvalidUrl(String),

    /// Failed to load config file.
    #[error("Failed to load config: {0}")]
    ConfigLoadFailed(String),

    /// Failed to save config file.
    #[error("Failed to save config: {0}")]
    ConfigSaveFailed(String),

    /// A value failed to parse into a core type.
    #[error(transparent)]
    Core(#[from] beli_core::CoreError),

    // =========================================================================
    // Remote Errors
    // =========================================================================
    /// Remote URL or key is missing.
    #[error("Remote backend is not configured")]
    RemoteUnconfigured,

    /// Reachability probe failed.
    #[error("Reachability probe failed: {0}")]
    ProbeFailed(String),

    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(String),

    /// Request timeout.
    #[error("Request timeout after {0} seconds")]
    Timeout(u64),

    // =========================================================================
    // Storage Errors
    // =========================================================================
    /// Key-value store read or write failed.
    #[error("Storage error: {0}")]
    StorageFailed(String),

    /// Failed to serialize the queue snapshot.
    #[error("Serialization failed: {0}")]
    SerializationFailed(String),

    /// Failed to deserialize the queue snapshot.
    #[error("Deserialization failed: {0}")]
    DeserializationFailed(String),

    // =========================================================================
    // Replay Errors
    // =========================================================================
    /// A mutation handler reported failure.
    #[error("{0}")]
    HandlerFailed(String),

    // =========================================================================
    // Internal Errors
    // =========================================================================
    /// Background tasks need a Tokio runtime.
    #[error("No Tokio runtime available: {0}")]
    NoRuntime(String),
}

impl SyncError {
    /// Creates a handler failure from any message.
    pub fn handler(message: impl Into<String>) -> Self {
        SyncError::HandlerFailed(message.into())
    }
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<beli_db::DbError> for SyncError {
    fn from(err: beli_db::DbError) -> Self {
        SyncError::StorageFailed(err.to_string())
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        if err.is_data() || err.is_syntax() || err.is_eof() {
            SyncError::DeserializationFailed(err.to_string())
        } else {
            SyncError::SerializationFailed(err.to_string())
        }
    }
}

impl From<url::ParseError> for SyncError {
    fn from(err: url::ParseError) -> Self {
        SyncError::InvalidUrl(err.to_string())
    }
}

impl From<reqwest::Error> for SyncError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            SyncError::Timeout(0)
        } else {
            SyncError::Http(err.to_string())
        }
    }
}

impl From<std::io::Error> for SyncError {
    fn from(err: std::io::Error) -> Self {
        SyncError::StorageFailed(err.to_string())
    }
}

impl From<toml::de::Error> for SyncError {
    fn from(err: toml::de::Error) -> Self {
        SyncError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::ser::Error> for SyncError {
    fn from(err: toml::ser::Error) -> Self {
        SyncError::ConfigSaveFailed(err.to_string())
    }
}

// =============================================================================
// Error Categorization
// =============================================================================

impl SyncError {
    /// Returns true if a later attempt may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SyncError::ProbeFailed(_)
                | SyncError::Http(_)
                | SyncError::Timeout(_)
                | SyncError::HandlerFailed(_)
                | SyncError::StorageFailed(_)
        )
    }

    /// Returns true if this error indicates a configuration problem.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            SyncError::InvalidConfig(_)
                | SyncError::InvalidUrl(_)
                | SyncError::ConfigLoadFailed(_)
                | SyncError::ConfigSaveFailed(_)
                | SyncError::RemoteUnconfigured
                | SyncError::Core(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_errors() {
        assert!(SyncError::Http("503".into()).is_retryable());
        assert!(SyncError::Timeout(5).is_retryable());
        assert!(SyncError::handler("rate limited").is_retryable());

        assert!(!SyncError::RemoteUnconfigured.is_retryable());
        assert!(!SyncError::InvalidConfig("bad".into()).is_retryable());
    }

    #[test]
    fn test_config_errors() {
        assert!(SyncError::RemoteUnconfigured.is_config_error());
        assert!(SyncError::InvalidUrl("x".into()).is_config_error());
        assert!(!SyncError::Http("x".into()).is_config_error());
    }

    #[test]
    fn test_handler_error_displays_message_only() {
        assert_eq!(SyncError::handler("user not found").to_string(), "user not found");
    }

    #[test]
    fn test_json_errors_are_categorized() {
        let err: SyncError = serde_json::from_str::<serde_json::Value>("{not json")
            .unwrap_err()
            .into();
        assert!(matches!(err, SyncError::DeserializationFailed(_)));
    }
}
