//! # Error Types
//!
//! Domain errors for beli-core. These only arise when parsing values that
//! cross a text boundary (config files, persisted JSON, CLI arguments).

use thiserror::Error;

/// Core parsing and rule errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A mutation kind string did not match any known kind.
    #[error("Unknown mutation kind: '{0}'")]
    UnknownMutationKind(String),

    /// A data provider mode string did not match any known mode.
    #[error("Unknown data provider mode: '{0}'. Valid options: auto, remote, local")]
    UnknownProviderMode(String),

    /// Backoff bounds are inverted.
    #[error("Invalid backoff: base {base_ms}ms exceeds maximum {max_ms}ms")]
    InvalidBackoff { base_ms: u64, max_ms: u64 },
}

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::UnknownMutationKind("poke_user".to_string());
        assert_eq!(err.to_string(), "Unknown mutation kind: 'poke_user'");

        let err = CoreError::InvalidBackoff {
            base_ms: 5000,
            max_ms: 100,
        };
        assert!(err.to_string().contains("5000ms"));
    }
}
