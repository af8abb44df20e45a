//! # Sync Engine
//!
//! Wires the monitor, resolver, fallback executor and mutation queue from one
//! [`SyncConfig`] and exposes their combined status.
//!
//! ## Engine Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        SyncEngine Architecture                          │
//! │                                                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │                         SyncEngine                               │  │
//! │  │                                                                  │  │
//! │  │  • Builds every component from SyncConfig                        │  │
//! │  │  • Shares one ConnectivityMonitor between them                   │  │
//! │  │  • Starts the reconnect listener                                 │  │
//! │  │  • Emits status events to the host UI                            │  │
//! │  └────────────────────────────┬─────────────────────────────────────┘  │
//! │                               │                                         │
//! │         ┌─────────────────────┼─────────────────────┐                  │
//! │         ▼                     ▼                     ▼                   │
//! │  ┌────────────────┐  ┌────────────────┐  ┌────────────────────────┐    │
//! │  │ Connectivity   │  │ Provider       │  │   MutationQueue        │    │
//! │  │ Monitor        │  │ Resolver +     │  │                        │    │
//! │  │                │  │ Fallback       │  │ Replays offline writes │    │
//! │  │ Fed by the     │  │                │  │ through registered     │    │
//! │  │ platform       │  │ Routes reads   │  │ handlers               │    │
//! │  └────────────────┘  └────────────────┘  └────────────────────────┘    │
//! │                                                                         │
//! │  STATUS EVENTS (to the host):                                          │
//! │  ──────────────────────────                                            │
//! │  emit_status   - { pendingCount, isSyncing, lastSyncAt, lastError }    │
//! │  emit_progress - (processed so far, remaining)                         │
//! │  emit_error    - (message, retryable)                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;
use tracing::{info, warn};

use beli_core::{DataProviderStatus, NetworkStatus, SyncStatus};

use crate::config::SyncConfig;
use crate::connectivity::{ConnectivityMonitor, Subscription};
use crate::error::SyncResult;
use crate::fallback::FallbackExecutor;
use crate::probe::{HttpReachabilityProbe, ReachabilityProbe};
use crate::queue::{MutationQueue, QueueSettings};
use crate::resolver::ProviderResolver;
use crate::store::{open_store, KeyValueStore};

// =============================================================================
// Event Emitter Trait
// =============================================================================

/// Receives queue events (implemented by the host UI integration).
pub trait SyncEventEmitter: Send + Sync {
    /// Queue status after an enqueue, a replay cycle or a clear.
    fn emit_status(&self, status: &SyncStatus);

    /// One mutation applied during replay.
    fn emit_progress(&self, processed: u32, remaining: usize);

    /// A mutation failed. `retryable` is false when it was dropped.
    fn emit_error(&self, message: &str, retryable: bool);
}

/// No-op event emitter.
pub struct NoOpEmitter;

impl SyncEventEmitter for NoOpEmitter {
    fn emit_status(&self, _status: &SyncStatus) {}
    fn emit_progress(&self, _processed: u32, _remaining: usize) {}
    fn emit_error(&self, _message: &str, _retryable: bool) {}
}

// =============================================================================
// Sync Engine
// =============================================================================

/// The assembled offline sync engine.
pub struct SyncEngine {
    config: Arc<SyncConfig>,
    monitor: Arc<ConnectivityMonitor>,
    resolver: Arc<ProviderResolver>,
    executor: FallbackExecutor,
    queue: MutationQueue,
}

impl SyncEngine {
    /// Builds an engine with the store and probe the config describes.
    pub async fn open(config: SyncConfig) -> SyncResult<Self> {
        SyncEngineBuilder::new(config).build().await
    }

    pub fn builder(config: SyncConfig) -> SyncEngineBuilder {
        SyncEngineBuilder::new(config)
    }

    /// Starts draining the queue on reconnect. Register handlers first.
    ///
    /// Dropping the returned subscription stops the listener.
    pub fn start(&self) -> SyncResult<Subscription> {
        let missing = self.queue.handlers().missing();
        if !missing.is_empty() {
            let kinds: Vec<&str> = missing.iter().map(|k| k.as_str()).collect();
            warn!(kinds = ?kinds, "No handler registered for some mutation kinds");
        }

        info!(
            mode = %self.config.mode(),
            remote_configured = self.config.is_remote_configured(),
            "Starting sync engine"
        );
        self.queue.initialize()
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn monitor(&self) -> &Arc<ConnectivityMonitor> {
        &self.monitor
    }

    pub fn resolver(&self) -> &Arc<ProviderResolver> {
        &self.resolver
    }

    pub fn executor(&self) -> &FallbackExecutor {
        &self.executor
    }

    pub fn queue(&self) -> &MutationQueue {
        &self.queue
    }

    /// Connectivity plus queue counters, for offline banners.
    pub async fn network_status(&self) -> NetworkStatus {
        NetworkStatus {
            is_online: self.monitor.is_online(),
            connection_quality: self.monitor.quality(),
            pending_mutations: self.queue.pending_count().await,
            is_syncing: self.queue.is_syncing(),
        }
    }

    /// Provider diagnostics. May probe the remote.
    pub async fn provider_status(&self) -> DataProviderStatus {
        self.resolver.status().await
    }

    pub async fn sync_status(&self) -> SyncStatus {
        self.queue.status().await
    }
}

impl std::fmt::Debug for SyncEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncEngine")
            .field("monitor", &self.monitor)
            .field("resolver", &self.resolver)
            .field("queue", &self.queue)
            .finish()
    }
}

// =============================================================================
// Builder Pattern
// =============================================================================

/// Builder for creating a SyncEngine with injected parts.
pub struct SyncEngineBuilder {
    config: SyncConfig,
    store: Option<Arc<dyn KeyValueStore>>,
    probe: Option<Arc<dyn ReachabilityProbe>>,
    monitor: Option<Arc<ConnectivityMonitor>>,
    emitter: Option<Arc<dyn SyncEventEmitter>>,
}

impl SyncEngineBuilder {
    pub fn new(config: SyncConfig) -> Self {
        SyncEngineBuilder {
            config,
            store: None,
            probe: None,
            monitor: None,
            emitter: None,
        }
    }

    /// Uses this store instead of the configured backend.
    pub fn with_store(mut self, store: Arc<dyn KeyValueStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Uses this probe instead of the HTTP probe.
    pub fn with_probe(mut self, probe: Arc<dyn ReachabilityProbe>) -> Self {
        self.probe = Some(probe);
        self
    }

    /// Shares an existing monitor, e.g. one the platform listener already feeds.
    pub fn with_monitor(mut self, monitor: Arc<ConnectivityMonitor>) -> Self {
        self.monitor = Some(monitor);
        self
    }

    pub fn with_emitter(mut self, emitter: Arc<dyn SyncEventEmitter>) -> Self {
        self.emitter = Some(emitter);
        self
    }

    /// Validates the config, opens the store and loads the queue.
    pub async fn build(self) -> SyncResult<SyncEngine> {
        self.config.validate()?;

        let store = match self.store {
            Some(store) => store,
            None => open_store(&self.config.storage).await?,
        };

        let probe: Arc<dyn ReachabilityProbe> = match self.probe {
            Some(probe) => probe,
            None => Arc::new(HttpReachabilityProbe::new(&self.config.remote)?),
        };

        let monitor = self
            .monitor
            .unwrap_or_else(|| Arc::new(ConnectivityMonitor::new()));

        let resolver = Arc::new(ProviderResolver::new(
            self.config.mode(),
            self.config.provider.availability_ttl(),
            monitor.clone(),
            probe,
        ));
        let executor = FallbackExecutor::new(resolver.clone());

        let settings = QueueSettings::from_config(&self.config.queue)?;
        let queue = MutationQueue::load(monitor.clone(), store, settings).await?;
        if let Some(emitter) = self.emitter {
            queue.set_emitter(emitter);
        }

        Ok(SyncEngine {
            config: Arc::new(self.config),
            monitor,
            resolver,
            executor,
            queue,
        })
    }
}
