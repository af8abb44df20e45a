//! # Mutation Handlers
//!
//! One handler per [`MutationKind`], applied to a queued payload during
//! replay. Handlers must tolerate being applied more than once.

use async_trait::async_trait;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, RwLock};

use beli_core::{MutationKind, Payload};

use crate::error::SyncResult;

/// Applies one queued write to the remote backend.
#[async_trait]
pub trait MutationHandler: Send + Sync {
    async fn apply(&self, payload: Payload) -> SyncResult<()>;
}

#[async_trait]
impl<F, Fut> MutationHandler for F
where
    F: Fn(Payload) -> Fut + Send + Sync,
    Fut: Future<Output = SyncResult<()>> + Send + 'static,
{
    async fn apply(&self, payload: Payload) -> SyncResult<()> {
        (self)(payload).await
    }
}

/// Kind-keyed handler table. Registration replaces any previous handler.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: RwLock<HashMap<MutationKind, Arc<dyn MutationHandler>>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, kind: MutationKind, handler: Arc<dyn MutationHandler>) {
        match self.handlers.write() {
            Ok(mut map) => map.insert(kind, handler),
            Err(poisoned) => poisoned.into_inner().insert(kind, handler),
        };
    }

    pub fn get(&self, kind: MutationKind) -> Option<Arc<dyn MutationHandler>> {
        match self.handlers.read() {
            Ok(map) => map.get(&kind).cloned(),
            Err(poisoned) => poisoned.into_inner().get(&kind).cloned(),
        }
    }

    pub fn contains(&self, kind: MutationKind) -> bool {
        self.get(kind).is_some()
    }

    /// Kinds with no handler, in declaration order.
    pub fn missing(&self) -> Vec<MutationKind> {
        MutationKind::ALL
            .into_iter()
            .filter(|kind| !self.contains(*kind))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.handlers.read().map(|map| map.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("registered", &self.len())
            .finish()
    }
}
