//! # beli-core: Pure Types for the Beli Offline Sync Engine
//!
//! This crate holds the data model of the sync engine as plain types and pure
//! functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   sync-cli ──► beli-sync ──► beli-db ──► beli-core (THIS CRATE)        │
//! │                    │                         ▲                          │
//! │                    └─────────────────────────┘                          │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`network`] - Platform network events and connection quality rules
//! - [`provider`] - Data provider mode and resolved provider
//! - [`mutation`] - Mutation kinds, pending mutations, persisted queue shape
//! - [`retry`] - Exponential backoff and retry ceiling
//! - [`status`] - Status DTOs shared with the clients
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use beli_core::network::{ConnectionQuality, NetworkEvent, NetworkType};
//! use beli_core::retry::RetryPolicy;
//!
//! let event = NetworkEvent::new(true, NetworkType::Wifi);
//! assert_eq!(event.quality(), ConnectionQuality::Excellent);
//!
//! let policy = RetryPolicy::default();
//! assert_eq!(policy.backoff_delay(1).as_millis(), 2_000);
//! assert_eq!(policy.backoff_delay(10).as_millis(), 30_000);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod mutation;
pub mod network;
pub mod provider;
pub mod retry;
pub mod status;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult};
pub use mutation::{MutationKind, Payload, PendingMutation, PersistedQueue};
pub use network::{CellularGeneration, ConnectionQuality, ConnectionState, NetworkEvent, NetworkType};
pub use provider::{Provider, ProviderMode};
pub use retry::RetryPolicy;
pub use status::{DataProviderStatus, NetworkStatus, SyncReport, SyncStatus};

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Storage key the mutation queue is persisted under.
pub const DEFAULT_STORAGE_KEY: &str = "beli-sync-store";

/// How long a remote availability probe result is trusted (seconds).
pub const AVAILABILITY_TTL_SECS: u64 = 30;
