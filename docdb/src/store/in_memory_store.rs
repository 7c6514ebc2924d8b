use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::errors::{DocDbError, DocDbResult, ErrorKind};
use crate::index::IndexCatalog;
use crate::store::{DocumentMap, InMemoryMap};

/// Registry of the backing maps and index catalogs of one database.
///
/// A collection name resolves to the same map until the map is removed,
/// after which the next `open_map` creates a fresh one. A transaction owns
/// a private store of its own for its isolated maps.
#[derive(Clone)]
pub struct InMemoryStore {
    inner: Arc<InMemoryStoreInner>,
}

struct InMemoryStoreInner {
    maps: DashMap<String, DocumentMap>,
    catalogs: DashMap<String, IndexCatalog>,
    closed: AtomicBool,
}

impl InMemoryStore {
    /// Creates an empty, open store.
    pub fn new() -> Self {
        InMemoryStore {
            inner: Arc::new(InMemoryStoreInner {
                maps: DashMap::new(),
                catalogs: DashMap::new(),
                closed: AtomicBool::new(false),
            }),
        }
    }

    /// Opens the map for `name`, creating it on first use.
    ///
    /// Every call with the same name returns a handle to the same map until
    /// the map is removed with [`InMemoryStore::remove_map`].
    ///
    /// # Arguments
    ///
    /// * `name` - The collection name the map backs
    ///
    /// # Returns
    ///
    /// A shared handle to the backing map
    ///
    /// # Errors
    ///
    /// Returns `StoreClosed` if the store has been closed.
    ///
    /// # Examples
    ///
    /// ```
    /// use docdb::store::InMemoryStore;
    ///
    /// let store = InMemoryStore::new();
    /// store.open_map("users").unwrap();
    /// assert!(store.has_map("users"));
    /// assert_eq!(store.map_names(), vec!["users".to_string()]);
    /// ```
    pub fn open_map(&self, name: &str) -> DocDbResult<DocumentMap> {
        self.check_opened()?;
        let map = self
            .inner
            .maps
            .entry(name.to_string())
            .or_insert_with(|| DocumentMap::new(InMemoryMap::new(name)))
            .value()
            .clone();
        Ok(map)
    }

    /// Returns `true` if a map for `name` has been opened and not removed.
    pub fn has_map(&self, name: &str) -> bool {
        self.inner.maps.contains_key(name)
    }

    /// Drops the map for `name` together with its index catalog.
    ///
    /// Handles already held on the removed map observe it as dropped.
    /// Removing a name that has no map is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `StoreClosed` if the store has been closed.
    pub fn remove_map(&self, name: &str) -> DocDbResult<()> {
        self.check_opened()?;
        if let Some((_, map)) = self.inner.maps.remove(name) {
            map.dispose()?;
        }
        if let Some((_, catalog)) = self.inner.catalogs.remove(name) {
            catalog.clear();
        }
        Ok(())
    }

    /// Names of every open map, sorted.
    pub fn map_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.inner.maps.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    /// Gets the index catalog for `name`, creating an empty one on first use.
    pub fn index_catalog(&self, name: &str) -> DocDbResult<IndexCatalog> {
        self.check_opened()?;
        let catalog = self
            .inner
            .catalogs
            .entry(name.to_string())
            .or_default()
            .value()
            .clone();
        Ok(catalog)
    }

    /// Closes every map. Closing twice is a no-op.
    pub fn close(&self) -> DocDbResult<()> {
        if self.inner.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        for entry in self.inner.maps.iter() {
            entry.value().close()?;
        }
        Ok(())
    }

    /// Returns `true` once [`InMemoryStore::close`] has run.
    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    fn check_opened(&self) -> DocDbResult<()> {
        if self.is_closed() {
            log::error!("Store is closed");
            return Err(DocDbError::new("store is closed", ErrorKind::StoreClosed));
        }
        Ok(())
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}
