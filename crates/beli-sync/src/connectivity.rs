//! # Connectivity Monitor
//!
//! Caches the last platform network event and fans state changes out to
//! subscribers.
//!
//! ## Event Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  Platform listener ──update(event)──► ┌──────────────────────────┐      │
//! │                                       │   ConnectivityMonitor    │      │
//! │                                       │                          │      │
//! │  is_online() / quality() ◄── sync ────│  last event (RwLock)     │      │
//! │                                       │  subscribers (Mutex)     │      │
//! │                                       └────────────┬─────────────┘      │
//! │                                                    │ ConnectionState    │
//! │                                  ┌─────────────────┼──────────────┐     │
//! │                                  ▼                 ▼              ▼     │
//! │                           MutationQueue       UI banner        ...      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The monitor never polls. Before the first event it reports online (so
//! reads are attempted) but `Offline` quality.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, RwLock, Weak};

use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use beli_core::{ConnectionQuality, ConnectionState, NetworkEvent, NetworkType};

type Callback = Arc<dyn Fn(ConnectionState) + Send + Sync>;

#[derive(Default)]
struct Subscribers {
    next_id: u64,
    callbacks: BTreeMap<u64, Callback>,
}

// =============================================================================
// Subscription
// =============================================================================

/// Handle for a registered callback. Dropping it unsubscribes.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    cancel: Mutex<Option<Box<dyn FnOnce() + Send>>>,
}

impl Subscription {
    pub(crate) fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Subscription {
            cancel: Mutex::new(Some(Box::new(cancel))),
        }
    }

    /// A subscription that is not attached to anything.
    pub fn inert() -> Self {
        Subscription {
            cancel: Mutex::new(None),
        }
    }

    /// Detaches the callback. Safe to call more than once.
    pub fn unsubscribe(&self) {
        let cancel = self.cancel.lock().ok().and_then(|mut slot| slot.take());
        if let Some(cancel) = cancel {
            cancel();
        }
    }

    /// Returns true until `unsubscribe` runs.
    pub fn is_active(&self) -> bool {
        self.cancel
            .lock()
            .map(|slot| slot.is_some())
            .unwrap_or(false)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.is_active())
            .finish()
    }
}

// =============================================================================
// Snapshot
// =============================================================================

/// Everything known about the current connection, for diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkSnapshot {
    pub connected: bool,
    #[serde(rename = "type")]
    pub network_type: Option<NetworkType>,
    pub quality: ConnectionQuality,
    pub is_wifi: bool,
    pub details: Value,
}

// =============================================================================
// Monitor
// =============================================================================

/// Last-known connectivity plus change subscription.
#[derive(Default)]
pub struct ConnectivityMonitor {
    last_event: RwLock<Option<NetworkEvent>>,
    subscribers: Arc<Mutex<Subscribers>>,
}

impl ConnectivityMonitor {
    /// Creates a monitor that has not seen any event yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a monitor seeded with an initial event.
    pub fn with_event(event: NetworkEvent) -> Self {
        let monitor = Self::new();
        if let Ok(mut slot) = monitor.last_event.write() {
            *slot = Some(event);
        }
        monitor
    }

    fn read<T>(&self, f: impl FnOnce(Option<&NetworkEvent>) -> T) -> T {
        match self.last_event.read() {
            Ok(guard) => f(guard.as_ref()),
            Err(poisoned) => f(poisoned.into_inner().as_ref()),
        }
    }

    /// Last known reachability. `true` before the first event.
    pub fn is_online(&self) -> bool {
        self.read(|event| event.map_or(true, |e| e.is_connected))
    }

    /// Last known quality. `Offline` before the first event.
    pub fn quality(&self) -> ConnectionQuality {
        self.read(|event| event.map_or(ConnectionQuality::Offline, NetworkEvent::quality))
    }

    pub fn state(&self) -> ConnectionState {
        ConnectionState {
            connected: self.is_online(),
            quality: self.quality(),
        }
    }

    pub fn is_wifi(&self) -> bool {
        self.network_type() == Some(NetworkType::Wifi)
    }

    pub fn network_type(&self) -> Option<NetworkType> {
        self.read(|event| event.map(|e| e.network_type))
    }

    pub fn snapshot(&self) -> NetworkSnapshot {
        self.read(|event| NetworkSnapshot {
            connected: event.map_or(true, |e| e.is_connected),
            network_type: event.map(|e| e.network_type),
            quality: event.map_or(ConnectionQuality::Offline, NetworkEvent::quality),
            is_wifi: event.is_some_and(|e| e.network_type == NetworkType::Wifi),
            details: event.map(|e| e.details.clone()).unwrap_or(Value::Null),
        })
    }

    /// Records a platform event and notifies every subscriber.
    ///
    /// Callbacks run on the caller's thread after the locks are released, so
    /// a callback may read the monitor or unsubscribe itself.
    pub fn update(&self, event: NetworkEvent) {
        let state = ConnectionState::from_event(&event);
        debug!(
            connected = state.connected,
            network_type = %event.network_type,
            quality = %state.quality,
            "Network state changed"
        );

        match self.last_event.write() {
            Ok(mut slot) => *slot = Some(event),
            Err(poisoned) => *poisoned.into_inner() = Some(event),
        }

        let callbacks: Vec<Callback> = match self.subscribers.lock() {
            Ok(subs) => subs.callbacks.values().cloned().collect(),
            Err(poisoned) => poisoned.into_inner().callbacks.values().cloned().collect(),
        };

        for callback in callbacks {
            callback(state);
        }
    }

    /// Registers a callback for every subsequent state change.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(ConnectionState) + Send + Sync + 'static,
    {
        let id = {
            let mut subs = match self.subscribers.lock() {
                Ok(subs) => subs,
                Err(poisoned) => poisoned.into_inner(),
            };
            let id = subs.next_id;
            subs.next_id += 1;
            subs.callbacks.insert(id, Arc::new(callback));
            id
        };

        let registry: Weak<Mutex<Subscribers>> = Arc::downgrade(&self.subscribers);
        Subscription::new(move || {
            if let Some(registry) = registry.upgrade() {
                if let Ok(mut subs) = registry.lock() {
                    subs.callbacks.remove(&id);
                }
            }
        })
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .lock()
            .map(|subs| subs.callbacks.len())
            .unwrap_or(0)
    }
}

impl std::fmt::Debug for ConnectivityMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectivityMonitor")
            .field("state", &self.state())
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}
