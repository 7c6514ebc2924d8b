use std::fmt::{Debug, Formatter};
use std::sync::Arc;

use crate::common::LockRegistry;
use crate::errors::DocDbResult;
use crate::store::InMemoryStore;

/// Configuration and shared resources of one database.
///
/// The configuration owns the per-name lock registry and the store. Every
/// live collection handle created from it shares those, so two handles for
/// the same name see the same documents and serialize on the same lock.
/// Clones share the same state.
#[derive(Clone)]
pub struct DocDbConfig {
    inner: Arc<DocDbConfigInner>,
}

struct DocDbConfigInner {
    lock_registry: LockRegistry,
    store: InMemoryStore,
    event_queue_capacity: Option<usize>,
}

impl DocDbConfig {
    /// Creates a configuration with unbounded listener queues.
    pub fn new() -> Self {
        DocDbConfig::with_event_queue_capacity(None)
    }

    pub(crate) fn with_event_queue_capacity(event_queue_capacity: Option<usize>) -> Self {
        DocDbConfig {
            inner: Arc::new(DocDbConfigInner {
                lock_registry: LockRegistry::new(),
                store: InMemoryStore::new(),
                event_queue_capacity,
            }),
        }
    }

    pub fn lock_registry(&self) -> &LockRegistry {
        &self.inner.lock_registry
    }

    pub fn store(&self) -> &InMemoryStore {
        &self.inner.store
    }

    /// Maximum number of undelivered events queued per listener, `None`
    /// when unbounded. A full queue blocks the writer that posts the event.
    pub fn event_queue_capacity(&self) -> Option<usize> {
        self.inner.event_queue_capacity
    }

    pub(crate) fn close(&self) -> DocDbResult<()> {
        self.inner.store.close()
    }
}

impl Default for DocDbConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl Debug for DocDbConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocDbConfig")
            .field("event_queue_capacity", &self.inner.event_queue_capacity)
            .field("closed", &self.inner.store.is_closed())
            .finish()
    }
}
