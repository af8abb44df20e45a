//! # Mutation Queue
//!
//! Persisted FIFO of writes made while offline, replayed through registered
//! handlers once connectivity returns.
//!
//! ## Replay Cycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         process_pending()                               │
//! │                                                                         │
//! │  already syncing? ─┐                                                    │
//! │  offline?         ─┼──► {processed: 0, failed: 0}                       │
//! │  poor link?       ─┤                                                    │
//! │  nothing queued?  ─┘                                                    │
//! │         │                                                               │
//! │         ▼  snapshot pending list                                        │
//! │  ┌───────────────────────────────────────────────────────────────┐     │
//! │  │ for each mutation (FIFO):                                     │     │
//! │  │   retry_count > 0 ──► sleep min(1s * 2^retry_count, 30s)      │     │
//! │  │   offline now?    ──► stop                                    │     │
//! │  │   no handler?     ──► leave queued, not counted               │     │
//! │  │   handler Ok      ──► remove, persist, processed += 1         │     │
//! │  │   handler Err     ──► retry_count += 1, persist, failed += 1  │     │
//! │  │                       retry_count == ceiling ──► drop         │     │
//! │  └───────────────────────────────────────────────────────────────┘     │
//! │         │                                                               │
//! │         ▼  last_sync_at = now, clear syncing flag                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Per-Mutation Lifecycle
//! ```text
//!   enqueue ──► Queued ──► Applying ──► Removed
//!                 ▲            │
//!                 └─ retry+1 ──┤
//!                              └──► Dropped (ceiling reached)
//! ```
//!
//! Only `pendingMutations` and `lastSyncAt` are persisted. The syncing flag
//! and the last cycle error live in memory.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock, Weak};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use beli_core::{
    ConnectionQuality, MutationKind, Payload, PendingMutation, PersistedQueue, RetryPolicy,
    SyncReport, SyncStatus,
};

use crate::config::QueueConfig;
use crate::connectivity::{ConnectivityMonitor, Subscription};
use crate::engine::{NoOpEmitter, SyncEventEmitter};
use crate::error::{SyncError, SyncResult};
use crate::handler::{HandlerRegistry, MutationHandler};
use crate::store::KeyValueStore;

// =============================================================================
// Settings
// =============================================================================

/// Runtime queue parameters.
#[derive(Debug, Clone)]
pub struct QueueSettings {
    pub storage_key: String,
    pub retry: RetryPolicy,
    pub settle_delay: Duration,
    pub startup_delay: Duration,
}

impl Default for QueueSettings {
    fn default() -> Self {
        QueueSettings {
            storage_key: beli_core::DEFAULT_STORAGE_KEY.to_string(),
            retry: RetryPolicy::default(),
            settle_delay: Duration::from_millis(1_000),
            startup_delay: Duration::from_millis(2_000),
        }
    }
}

impl QueueSettings {
    pub fn from_config(config: &QueueConfig) -> SyncResult<Self> {
        Ok(QueueSettings {
            storage_key: config.storage_key.clone(),
            retry: config.retry_policy()?,
            settle_delay: Duration::from_millis(config.settle_delay_ms),
            startup_delay: Duration::from_millis(config.startup_delay_ms),
        })
    }
}

// =============================================================================
// Queue State
// =============================================================================

#[derive(Debug, Default)]
struct QueueData {
    pending: Vec<PendingMutation>,
    last_sync_at: Option<DateTime<Utc>>,
    last_sync_error: Option<String>,
}

impl QueueData {
    fn to_persisted(&self) -> PersistedQueue {
        PersistedQueue {
            pending_mutations: self.pending.clone(),
            last_sync_at: self.last_sync_at,
        }
    }
}

/// Clears the syncing flag when the cycle ends, on every exit path.
struct SyncGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> SyncGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| SyncGuard { flag })
    }
}

impl Drop for SyncGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

struct QueueInner {
    monitor: Arc<ConnectivityMonitor>,
    store: Arc<dyn KeyValueStore>,
    settings: QueueSettings,
    handlers: HandlerRegistry,
    data: Mutex<QueueData>,
    syncing: AtomicBool,
    initialized: AtomicBool,
    emitter: RwLock<Arc<dyn SyncEventEmitter>>,
}

// =============================================================================
// Mutation Queue
// =============================================================================

/// Offline write queue. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct MutationQueue {
    inner: Arc<QueueInner>,
}

impl MutationQueue {
    /// Creates an empty queue. Use [`MutationQueue::load`] to rehydrate.
    pub fn new(
        monitor: Arc<ConnectivityMonitor>,
        store: Arc<dyn KeyValueStore>,
        settings: QueueSettings,
    ) -> Self {
        MutationQueue {
            inner: Arc::new(QueueInner {
                monitor,
                store,
                settings,
                handlers: HandlerRegistry::new(),
                data: Mutex::new(QueueData::default()),
                syncing: AtomicBool::new(false),
                initialized: AtomicBool::new(false),
                emitter: RwLock::new(Arc::new(NoOpEmitter)),
            }),
        }
    }

    /// Creates a queue holding whatever snapshot the store has.
    pub async fn load(
        monitor: Arc<ConnectivityMonitor>,
        store: Arc<dyn KeyValueStore>,
        settings: QueueSettings,
    ) -> SyncResult<Self> {
        let queue = Self::new(monitor, store, settings);
        queue.rehydrate().await?;
        Ok(queue)
    }

    /// Replaces in-memory state with the stored snapshot.
    pub async fn rehydrate(&self) -> SyncResult<()> {
        let key = &self.inner.settings.storage_key;
        let persisted = match self.inner.store.get(key).await? {
            Some(raw) => serde_json::from_str::<PersistedQueue>(&raw)
                .map_err(|e| SyncError::DeserializationFailed(e.to_string()))?,
            None => PersistedQueue::default(),
        };

        info!(
            pending = persisted.pending_mutations.len(),
            key = %key,
            "Mutation queue loaded"
        );

        let mut data = self.inner.data.lock().await;
        data.pending = persisted.pending_mutations;
        data.last_sync_at = persisted.last_sync_at;
        Ok(())
    }

    pub fn settings(&self) -> &QueueSettings {
        &self.inner.settings
    }

    pub fn handlers(&self) -> &HandlerRegistry {
        &self.inner.handlers
    }

    pub fn set_emitter(&self, emitter: Arc<dyn SyncEventEmitter>) {
        match self.inner.emitter.write() {
            Ok(mut slot) => *slot = emitter,
            Err(poisoned) => *poisoned.into_inner() = emitter,
        }
    }

    fn emitter(&self) -> Arc<dyn SyncEventEmitter> {
        match self.inner.emitter.read() {
            Ok(slot) => slot.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    // =========================================================================
    // Handlers
    // =========================================================================

    /// Registers the handler for `kind`, replacing any previous one.
    pub fn register_handler<H>(&self, kind: MutationKind, handler: H)
    where
        H: MutationHandler + 'static,
    {
        debug!(kind = %kind, "Registering mutation handler");
        self.inner.handlers.register(kind, Arc::new(handler));
    }

    // =========================================================================
    // Enqueue
    // =========================================================================

    /// Appends a write and persists the queue. Returns the mutation id.
    pub async fn enqueue(&self, kind: MutationKind, payload: Payload) -> Uuid {
        let mutation = PendingMutation::new(kind, payload);
        let id = mutation.id;

        let pending = {
            let mut data = self.inner.data.lock().await;
            data.pending.push(mutation);
            self.persist(&data).await;
            data.pending.len()
        };

        info!(kind = %kind, id = %id, pending, "Queued mutation");
        self.emit_status().await;
        id
    }

    /// Writes the snapshot. Called with the data lock held so writes land in
    /// order. Failures are logged; the in-memory queue stays authoritative.
    async fn persist(&self, data: &QueueData) {
        let key = &self.inner.settings.storage_key;
        let result = match serde_json::to_string(&data.to_persisted()) {
            Ok(json) => self.inner.store.set(key, &json).await,
            Err(e) => Err(SyncError::SerializationFailed(e.to_string())),
        };

        if let Err(e) = result {
            error!(error = %e, key = %key, "Failed to persist mutation queue");
        }
    }

    // =========================================================================
    // Replay
    // =========================================================================

    /// Runs one replay cycle. Returns `{0, 0}` without touching any state when
    /// a cycle is already running, the device is offline or on a poor link, or
    /// nothing is queued.
    pub async fn process_pending(&self) -> SyncReport {
        let Some(guard) = SyncGuard::acquire(&self.inner.syncing) else {
            debug!("Replay already in progress");
            return SyncReport::idle();
        };

        let monitor = &self.inner.monitor;
        if !monitor.is_online() {
            debug!("Offline, skipping replay");
            return SyncReport::idle();
        }

        if monitor.quality() == ConnectionQuality::Poor {
            info!("Poor connection, skipping replay");
            return SyncReport::idle();
        }

        let snapshot = self.inner.data.lock().await.pending.clone();
        if snapshot.is_empty() {
            return SyncReport::idle();
        }
        info!(pending = snapshot.len(), "Processing pending mutations");

        let retry = self.inner.settings.retry;
        let mut report = SyncReport::idle();

        for mutation in snapshot {
            if mutation.retry_count > 0 {
                let delay = retry.backoff_delay(mutation.retry_count);
                debug!(id = %mutation.id, delay_ms = delay.as_millis() as u64, "Backing off");
                tokio::time::sleep(delay).await;
            }

            if !monitor.is_online() {
                info!("Connection lost, stopping replay");
                break;
            }

            let Some(handler) = self.inner.handlers.get(mutation.kind) else {
                warn!(kind = %mutation.kind, id = %mutation.id, "No handler registered, leaving queued");
                continue;
            };

            match handler.apply(mutation.payload.clone()).await {
                Ok(()) => {
                    let remaining = self.remove(mutation.id).await;
                    report.processed += 1;
                    debug!(kind = %mutation.kind, id = %mutation.id, "Mutation applied");
                    self.emitter().emit_progress(report.processed, remaining);
                }
                Err(e) => {
                    report.failed += 1;
                    self.record_failure(mutation.id, &e).await;
                }
            }
        }

        self.finish_cycle(&report).await;

        if report.processed > 0 || report.failed > 0 {
            info!(
                processed = report.processed,
                failed = report.failed,
                "Replay cycle finished"
            );
        }

        drop(guard);
        self.emit_status().await;
        report
    }

    /// Alias for [`MutationQueue::process_pending`].
    pub async fn trigger_sync(&self) -> SyncReport {
        self.process_pending().await
    }

    async fn remove(&self, id: Uuid) -> usize {
        let mut data = self.inner.data.lock().await;
        data.pending.retain(|m| m.id != id);
        self.persist(&data).await;
        data.pending.len()
    }

    async fn record_failure(&self, id: Uuid, err: &SyncError) {
        let retry = self.inner.settings.retry;
        let mut dropped = None;

        {
            let mut data = self.inner.data.lock().await;
            let Some(index) = data.pending.iter().position(|m| m.id == id) else {
                // Cleared while the handler ran
                return;
            };

            let mutation = &mut data.pending[index];
            mutation.record_failure(err.to_string());
            warn!(
                kind = %mutation.kind,
                id = %id,
                retry_count = mutation.retry_count,
                error = %err,
                "Mutation failed"
            );

            if retry.is_exhausted(mutation.retry_count) {
                dropped = Some(data.pending.remove(index));
            }
            self.persist(&data).await;
        }

        match dropped {
            Some(mutation) => {
                warn!(
                    kind = %mutation.kind,
                    id = %id,
                    attempts = mutation.retry_count,
                    "Mutation exceeded max retries, dropping"
                );
                self.emitter().emit_error(
                    &format!("{} dropped after {} attempts: {}", mutation.kind, mutation.retry_count, err),
                    false,
                );
            }
            None => self.emitter().emit_error(&err.to_string(), err.is_retryable()),
        }
    }

    async fn finish_cycle(&self, report: &SyncReport) {
        let mut data = self.inner.data.lock().await;
        data.last_sync_at = Some(Utc::now());
        data.last_sync_error =
            (report.failed > 0).then(|| format!("{} mutations failed", report.failed));
        self.persist(&data).await;
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Subscribes to connectivity so the queue drains on reconnect, and
    /// schedules a replay shortly after startup if online.
    ///
    /// Must be called from within a Tokio runtime. A second call while the
    /// first subscription is alive returns an inert subscription.
    pub fn initialize(&self) -> SyncResult<Subscription> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| SyncError::NoRuntime(e.to_string()))?;

        if self
            .inner
            .initialized
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("Mutation queue already initialized");
            return Ok(Subscription::inert());
        }

        info!("Initializing mutation queue listener");

        let weak: Weak<QueueInner> = Arc::downgrade(&self.inner);
        let handle = runtime.clone();
        let listener = self.inner.monitor.subscribe(move |state| {
            if !state.connected {
                return;
            }
            let Some(inner) = weak.upgrade() else {
                return;
            };
            let queue = MutationQueue { inner };
            handle.spawn(async move {
                queue.drain_after(queue.inner.settings.settle_delay, "Network connected").await;
            });
        });

        if self.inner.monitor.is_online() {
            let queue = self.clone();
            runtime.spawn(async move {
                queue.drain_after(queue.inner.settings.startup_delay, "Startup").await;
            });
        }

        let weak: Weak<QueueInner> = Arc::downgrade(&self.inner);
        Ok(Subscription::new(move || {
            listener.unsubscribe();
            if let Some(inner) = weak.upgrade() {
                inner.initialized.store(false, Ordering::Release);
            }
        }))
    }

    async fn drain_after(&self, delay: Duration, reason: &str) {
        tokio::time::sleep(delay).await;
        if !self.inner.monitor.is_online() {
            return;
        }

        debug!(reason, "Draining mutation queue");
        let report = self.process_pending().await;
        if report.processed > 0 {
            info!(processed = report.processed, reason, "Synced queued mutations");
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.inner.initialized.load(Ordering::Acquire)
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub fn is_syncing(&self) -> bool {
        self.inner.syncing.load(Ordering::Acquire)
    }

    pub async fn status(&self) -> SyncStatus {
        let data = self.inner.data.lock().await;
        SyncStatus {
            pending_count: data.pending.len(),
            is_syncing: self.is_syncing(),
            last_sync_at: data.last_sync_at,
            last_error: data.last_sync_error.clone(),
        }
    }

    /// Pending mutations in replay order.
    pub async fn pending(&self) -> Vec<PendingMutation> {
        self.inner.data.lock().await.pending.clone()
    }

    pub async fn pending_count(&self) -> usize {
        self.inner.data.lock().await.pending.len()
    }

    pub async fn has_pending(&self) -> bool {
        self.pending_count().await > 0
    }

    pub async fn mutations_by_kind(&self, kind: MutationKind) -> Vec<PendingMutation> {
        self.inner
            .data
            .lock()
            .await
            .pending
            .iter()
            .filter(|m| m.kind == kind)
            .cloned()
            .collect()
    }

    /// Discards every pending mutation and the last cycle error.
    pub async fn clear_all(&self) {
        let cleared = {
            let mut data = self.inner.data.lock().await;
            let cleared = data.pending.len();
            data.pending.clear();
            data.last_sync_error = None;
            self.persist(&data).await;
            cleared
        };

        info!(cleared, "Cleared mutation queue");
        self.emit_status().await;
    }

    async fn emit_status(&self) {
        let status = self.status().await;
        self.emitter().emit_status(&status);
    }
}

impl std::fmt::Debug for MutationQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MutationQueue")
            .field("settings", &self.inner.settings)
            .field("syncing", &self.is_syncing())
            .field("initialized", &self.is_initialized())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use beli_core::{NetworkEvent, NetworkType};
    use serde_json::json;
    use std::sync::atomic::AtomicUsize;

    fn payload(value: serde_json::Value) -> Payload {
        value.as_object().cloned().unwrap()
    }

    fn online() -> Arc<ConnectivityMonitor> {
        Arc::new(ConnectivityMonitor::with_event(NetworkEvent::new(true, NetworkType::Wifi)))
    }

    fn queue_with(monitor: Arc<ConnectivityMonitor>, store: Arc<MemoryStore>) -> MutationQueue {
        MutationQueue::new(monitor, store, QueueSettings::default())
    }

    #[tokio::test]
    async fn test_enqueue_assigns_ids_and_persists() {
        let store = Arc::new(MemoryStore::new());
        let queue = queue_with(online(), store.clone());

        let a = queue.enqueue(MutationKind::FollowUser, payload(json!({"targetUserId": "u-sam"}))).await;
        let b = queue.enqueue(MutationKind::FollowUser, payload(json!({"targetUserId": "u-sam"}))).await;
        assert_ne!(a, b);

        let pending = queue.pending().await;
        assert_eq!(pending.len(), 2);
        assert!(pending.iter().all(|m| m.retry_count == 0));

        let raw = store.get("beli-sync-store").await.unwrap().unwrap();
        let persisted: PersistedQueue = serde_json::from_str(&raw).unwrap();
        assert_eq!(persisted.pending_mutations.len(), 2);
        assert_eq!(persisted.pending_mutations[0].id, a);
    }

    #[tokio::test]
    async fn test_skips_when_offline_or_poor() {
        let monitor = Arc::new(ConnectivityMonitor::with_event(NetworkEvent::disconnected()));
        let queue = queue_with(monitor.clone(), Arc::new(MemoryStore::new()));
        queue.register_handler(MutationKind::MarkBeen, |_p: Payload| async { Ok::<_, SyncError>(()) });
        queue.enqueue(MutationKind::MarkBeen, Payload::new()).await;

        assert_eq!(queue.process_pending().await, SyncReport::idle());

        monitor.update(NetworkEvent::cellular("2g"));
        assert_eq!(queue.process_pending().await, SyncReport::idle());
        assert_eq!(queue.pending_count().await, 1);
        assert_eq!(queue.status().await.last_sync_at, None);
    }

    #[tokio::test]
    async fn test_success_removes_and_records_sync_time() {
        let queue = queue_with(online(), Arc::new(MemoryStore::new()));
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        queue.register_handler(MutationKind::LikePost, move |_p: Payload| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok::<_, SyncError>(())
            }
        });

        queue.enqueue(MutationKind::LikePost, payload(json!({"postId": "post-1"}))).await;
        queue.enqueue(MutationKind::LikePost, payload(json!({"postId": "post-2"}))).await;

        let report = queue.process_pending().await;
        assert_eq!(report, SyncReport { processed: 2, failed: 0 });
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(!queue.has_pending().await);

        let status = queue.status().await;
        assert!(status.last_sync_at.is_some());
        assert_eq!(status.last_error, None);
        assert!(!status.is_syncing);
    }

    #[tokio::test]
    async fn test_empty_queue_is_not_a_sync() {
        let store = Arc::new(MemoryStore::new());
        let queue = queue_with(online(), store.clone());

        assert_eq!(queue.process_pending().await, SyncReport::idle());
        assert_eq!(queue.status().await.last_sync_at, None);
        assert_eq!(store.get("beli-sync-store").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_drains_before_first_network_event() {
        let queue = queue_with(Arc::new(ConnectivityMonitor::new()), Arc::new(MemoryStore::new()));
        queue.register_handler(MutationKind::LikeActivity, |_p: Payload| async {
            Ok::<_, SyncError>(())
        });
        queue.enqueue(MutationKind::LikeActivity, Payload::new()).await;

        assert_eq!(queue.process_pending().await, SyncReport { processed: 1, failed: 0 });
    }

    #[tokio::test]
    async fn test_disconnect_mid_cycle_stops_and_new_work_waits() {
        let monitor = online();
        let queue = queue_with(monitor.clone(), Arc::new(MemoryStore::new()));
        let calls = Arc::new(AtomicUsize::new(0));

        let (counter, q, m) = (calls.clone(), queue.clone(), monitor.clone());
        queue.register_handler(MutationKind::MarkWantToTry, move |_p: Payload| {
            let call = counter.fetch_add(1, Ordering::SeqCst) + 1;
            let (q, m) = (q.clone(), m.clone());
            async move {
                match call {
                    1 => {
                        q.enqueue(MutationKind::MarkWantToTry, payload(json!({"late": true})))
                            .await;
                    }
                    2 => m.update(NetworkEvent::disconnected()),
                    _ => {}
                }
                Ok::<_, SyncError>(())
            }
        });

        for n in 0..3 {
            queue
                .enqueue(MutationKind::MarkWantToTry, payload(json!({"n": n})))
                .await;
        }

        let report = queue.process_pending().await;
        assert_eq!(report, SyncReport { processed: 2, failed: 0 });
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        let pending = queue.pending().await;
        assert_eq!(pending.len(), 2);
        assert_eq!(pending[0].payload["n"], 2);
        assert_eq!(pending[1].payload["late"], true);

        monitor.update(NetworkEvent::new(true, NetworkType::Wifi));
        let report = queue.process_pending().await;
        assert_eq!(report, SyncReport { processed: 2, failed: 0 });
        assert!(!queue.has_pending().await);
    }

    #[tokio::test]
    async fn test_missing_handler_leaves_mutation() {
        let queue = queue_with(online(), Arc::new(MemoryStore::new()));
        queue.enqueue(MutationKind::AddReview, Payload::new()).await;

        assert_eq!(queue.process_pending().await, SyncReport::idle());
        let pending = queue.pending().await;
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].retry_count, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_increments_then_drops_at_ceiling() {
        let queue = queue_with(online(), Arc::new(MemoryStore::new()));
        queue.register_handler(MutationKind::AddComment, |_p: Payload| async {
            Err::<(), _>(SyncError::handler("comment rejected"))
        });
        queue.enqueue(MutationKind::AddComment, Payload::new()).await;

        for attempt in 1..=2u32 {
            let report = queue.process_pending().await;
            assert_eq!(report, SyncReport { processed: 0, failed: 1 });

            let pending = queue.pending().await;
            assert_eq!(pending[0].retry_count, attempt);
            assert_eq!(pending[0].last_error.as_deref(), Some("comment rejected"));
            assert_eq!(queue.status().await.last_error.as_deref(), Some("1 mutations failed"));
        }

        let report = queue.process_pending().await;
        assert_eq!(report.failed, 1);
        assert!(!queue.has_pending().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_before_retry() {
        let queue = queue_with(online(), Arc::new(MemoryStore::new()));
        let fail = Arc::new(AtomicBool::new(true));
        let flag = fail.clone();
        queue.register_handler(MutationKind::UpdateRating, move |_p: Payload| {
            let fail = flag.load(Ordering::SeqCst);
            async move {
                if fail {
                    Err(SyncError::handler("timeout"))
                } else {
                    Ok(())
                }
            }
        });
        queue.enqueue(MutationKind::UpdateRating, Payload::new()).await;

        let started = tokio::time::Instant::now();
        queue.process_pending().await;
        assert!(started.elapsed() < Duration::from_millis(10));

        fail.store(false, Ordering::SeqCst);
        let started = tokio::time::Instant::now();
        let report = queue.process_pending().await;
        assert_eq!(report.processed, 1);
        assert!(started.elapsed() >= Duration::from_millis(2_000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_cycles_do_not_overlap() {
        let queue = queue_with(online(), Arc::new(MemoryStore::new()));
        queue.register_handler(MutationKind::BookmarkPost, |_p: Payload| async {
            tokio::time::sleep(Duration::from_millis(100)).await;
            Ok::<_, SyncError>(())
        });
        queue.enqueue(MutationKind::BookmarkPost, Payload::new()).await;

        let (first, second) = tokio::join!(queue.process_pending(), queue.process_pending());
        assert_eq!(first, SyncReport { processed: 1, failed: 0 });
        assert_eq!(second, SyncReport::idle());
        assert!(!queue.is_syncing());
    }

    #[tokio::test]
    async fn test_queries_and_clear() {
        let queue = queue_with(online(), Arc::new(MemoryStore::new()));
        queue.enqueue(MutationKind::MarkBeen, Payload::new()).await;
        queue.enqueue(MutationKind::MarkWantToTry, Payload::new()).await;
        queue.enqueue(MutationKind::MarkBeen, Payload::new()).await;

        assert_eq!(queue.mutations_by_kind(MutationKind::MarkBeen).await.len(), 2);
        assert_eq!(queue.mutations_by_kind(MutationKind::RemoveRelation).await.len(), 0);

        queue.clear_all().await;
        assert_eq!(queue.pending_count().await, 0);
        assert_eq!(queue.status().await.last_error, None);
    }

    #[tokio::test]
    async fn test_load_rehydrates_snapshot() {
        let store = Arc::new(MemoryStore::new());
        let first = queue_with(online(), store.clone());
        let id = first.enqueue(MutationKind::CreateList, payload(json!({"name": "Date nights"}))).await;

        let second = MutationQueue::load(online(), store, QueueSettings::default())
            .await
            .unwrap();
        let pending = second.pending().await;
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, id);
        assert_eq!(pending[0].payload["name"], "Date nights");
    }

    #[tokio::test]
    async fn test_load_rejects_corrupt_snapshot() {
        let store = Arc::new(MemoryStore::new());
        store.set("beli-sync-store", "{not json").await.unwrap();

        let err = MutationQueue::load(online(), store, QueueSettings::default())
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::DeserializationFailed(_)));
    }

    #[tokio::test]
    async fn test_initialize_is_single_shot() {
        let monitor = Arc::new(ConnectivityMonitor::with_event(NetworkEvent::disconnected()));
        let queue = queue_with(monitor.clone(), Arc::new(MemoryStore::new()));

        let first = queue.initialize().unwrap();
        assert!(first.is_active());
        assert!(queue.is_initialized());

        let second = queue.initialize().unwrap();
        assert!(!second.is_active());
        assert_eq!(monitor.subscriber_count(), 1);

        drop(first);
        assert!(!queue.is_initialized());
        assert_eq!(monitor.subscriber_count(), 0);
    }

    #[test]
    fn test_initialize_requires_runtime() {
        let queue = queue_with(online(), Arc::new(MemoryStore::new()));
        assert!(matches!(queue.initialize(), Err(SyncError::NoRuntime(_))));
        assert!(!queue.is_initialized());
    }
}
