//! # Retry Policy
//!
//! Backoff and retry ceiling for replayed mutations.
//!
//! ```text
//! retry_count:   0      1      2      3      4      5 ...
//! delay (ms):    -    2000   4000   8000  16000  30000 (capped)
//! ```
//!
//! A mutation with `retry_count == 0` is attempted without delay.

use std::time::Duration;

use crate::error::{CoreError, CoreResult};

/// Default retry ceiling (failed attempts before a mutation is dropped).
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default base delay in milliseconds.
pub const DEFAULT_BASE_BACKOFF_MS: u64 = 1_000;

/// Default delay cap in milliseconds.
pub const DEFAULT_MAX_BACKOFF_MS: u64 = 30_000;

/// Backoff and retry ceiling for the mutation queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Failed attempts after which a mutation is dropped.
    pub max_retries: u32,

    /// Delay unit; doubled per prior failure.
    pub base_delay: Duration,

    /// Upper bound on any single delay.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay: Duration::from_millis(DEFAULT_BASE_BACKOFF_MS),
            max_delay: Duration::from_millis(DEFAULT_MAX_BACKOFF_MS),
        }
    }
}

impl RetryPolicy {
    /// Builds a policy from millisecond bounds.
    pub fn from_millis(max_retries: u32, base_ms: u64, max_ms: u64) -> CoreResult<Self> {
        if base_ms > max_ms {
            return Err(CoreError::InvalidBackoff { base_ms, max_ms });
        }
        Ok(RetryPolicy {
            max_retries,
            base_delay: Duration::from_millis(base_ms),
            max_delay: Duration::from_millis(max_ms),
        })
    }

    /// Delay before attempting a mutation that has already failed
    /// `retry_count` times: `min(base * 2^retry_count, max)`.
    pub fn backoff_delay(&self, retry_count: u32) -> Duration {
        if retry_count == 0 {
            return Duration::ZERO;
        }

        let factor = 1u32.checked_shl(retry_count).unwrap_or(u32::MAX);
        self.base_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }

    /// Returns true once a mutation has used up its attempts.
    pub fn is_exhausted(&self, retry_count: u32) -> bool {
        retry_count >= self.max_retries
    }
}
