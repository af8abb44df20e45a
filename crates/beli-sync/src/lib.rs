//! # beli-sync: Offline-First Sync Engine for Beli
//!
//! This crate keeps the Beli clients usable without a network: reads degrade
//! to local data and writes are queued, then replayed when connectivity
//! returns.
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Sync Engine Architecture                         │
//! │                                                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │                   SyncEngine (Orchestrator)                      │  │
//! │  └────────────────────────────┬─────────────────────────────────────┘  │
//! │                               │                                         │
//! │         ┌─────────────────────┼─────────────────────┐                  │
//! │         ▼                     ▼                     ▼                   │
//! │  ┌────────────────┐  ┌────────────────┐  ┌────────────────────────┐    │
//! │  │ Connectivity   │  │ Provider       │  │ MutationQueue          │    │
//! │  │ Monitor        │  │ Resolver       │  │                        │    │
//! │  │                │  │                │  │ Persisted FIFO         │    │
//! │  │ Last event,    │  │ Remote/local   │  │ Backoff + ceiling      │    │
//! │  │ subscriptions  │  │ TTL-cached     │  │ Kind-keyed handlers    │    │
//! │  └────────────────┘  └───────┬────────┘  └───────────┬────────────┘    │
//! │                              ▼                       ▼                  │
//! │                      ┌────────────────┐  ┌────────────────────────┐    │
//! │                      │ Fallback       │  │ KeyValueStore          │    │
//! │                      │ Executor       │  │ memory / file / SQLite │    │
//! │                      └────────────────┘  └────────────────────────┘    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`engine`] - `SyncEngine` orchestrator and event emitter
//! - [`config`] - Sync configuration (provider mode, remote, queue, storage)
//! - [`error`] - Sync error types
//! - [`connectivity`] - Connectivity monitor and subscriptions
//! - [`probe`] - Remote reachability probe
//! - [`resolver`] - Provider resolution with availability caching
//! - [`fallback`] - Remote-then-local read execution
//! - [`handler`] - Mutation handler trait and registry
//! - [`queue`] - Persisted mutation queue and replay loop
//! - [`store`] - Key-value persistence backends
//!
//! ## Usage
//!
//! ```rust,ignore
//! use beli_sync::{SyncConfig, SyncEngine, FallbackOptions};
//! use beli_core::{MutationKind, NetworkEvent, NetworkType};
//!
//! let engine = SyncEngine::open(SyncConfig::load(None)?).await?;
//! engine.queue().register_handler(MutationKind::FollowUser, |payload| async move {
//!     api.follow(payload).await
//! });
//! let _listener = engine.start()?;
//!
//! // Platform network callback
//! engine.monitor().update(NetworkEvent::new(true, NetworkType::Wifi));
//!
//! // Reads
//! let feed = engine
//!     .executor()
//!     .with_fallback(|| api.feed(), || async { mock::feed() }, FallbackOptions::named("getFeed"))
//!     .await;
//!
//! // Writes while offline
//! engine.queue().enqueue(MutationKind::FollowUser, payload).await;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod connectivity;
pub mod engine;
pub mod error;
pub mod fallback;
pub mod handler;
pub mod probe;
pub mod queue;
pub mod resolver;
pub mod store;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::{
    ProviderSettings, QueueConfig, RemoteSettings, StorageBackend, StorageSettings, SyncConfig,
};
pub use connectivity::{ConnectivityMonitor, NetworkSnapshot, Subscription};
pub use engine::{NoOpEmitter, SyncEngine, SyncEngineBuilder, SyncEventEmitter};
pub use error::{SyncError, SyncResult};
pub use fallback::{FallbackExecutor, FallbackOptions, Fetched};
pub use handler::{HandlerRegistry, MutationHandler};
pub use probe::{HttpReachabilityProbe, ReachabilityProbe};
pub use queue::{MutationQueue, QueueSettings};
pub use resolver::{AvailabilityRecord, ProviderResolver};
pub use store::{open_store, FileStore, KeyValueStore, MemoryStore};
