use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

use super::default_collection::DefaultDocDbCollection;
use super::DocDbCollection;
use crate::docdb_config::DocDbConfig;
use crate::errors::DocDbResult;

/// Caches one live collection handle per name.
///
/// A cached handle that was closed or dropped is replaced by a fresh one on
/// the next lookup. All handles share the lock registry of the
/// configuration they were created from.
#[derive(Clone)]
pub(crate) struct CollectionFactory {
    inner: Arc<CollectionFactoryInner>,
}

struct CollectionFactoryInner {
    collections: Mutex<HashMap<String, DocDbCollection>>,
}

impl CollectionFactory {
    pub fn new() -> Self {
        CollectionFactory {
            inner: Arc::new(CollectionFactoryInner {
                collections: Mutex::new(HashMap::new()),
            }),
        }
    }

    pub fn get_collection(&self, name: &str, config: &DocDbConfig) -> DocDbResult<DocDbCollection> {
        // the collection lock is never taken while the cache is locked
        let mut collections = self.inner.collections.lock();
        if let Some(collection) = collections.get(name) {
            if !collection.is_dropped() && collection.is_open() {
                return Ok(collection.clone());
            }
            log::debug!("Replacing stale handle for collection {}", name);
        }

        let collection = DocDbCollection::new(DefaultDocDbCollection::new(name, config)?);
        collections.insert(name.to_string(), collection.clone());
        Ok(collection)
    }

    /// Forgets the cached handle for `name` and closes it.
    pub fn destroy_collection(&self, name: &str) -> DocDbResult<()> {
        let removed = self.inner.collections.lock().remove(name);
        match removed {
            Some(collection) => collection.close(),
            None => Ok(()),
        }
    }

    /// Closes every cached handle.
    pub fn clear(&self) -> DocDbResult<()> {
        let collections: Vec<DocDbCollection> = self
            .inner
            .collections
            .lock()
            .drain()
            .map(|(_, collection)| collection)
            .collect();

        for collection in collections {
            collection.close()?;
        }
        Ok(())
    }
}
