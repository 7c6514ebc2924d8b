use indexmap::IndexMap;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::errors::{DocDbError, DocDbResult, ErrorKind};
use crate::index::IndexEntry;

/// Build status of an index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexStatus {
    Ready,
    Building,
}

struct CatalogRecord {
    entry: IndexEntry,
    status: IndexStatus,
    generation: u64,
}

/// The index definitions of one collection.
///
/// Every status change bumps a generation number. A background build only
/// finishes the record it started on, so a build overtaken by a drop and
/// re-create of the same field leaves the new record alone.
#[derive(Clone)]
pub struct IndexCatalog {
    records: Arc<RwLock<IndexMap<String, CatalogRecord>>>,
    generation: Arc<AtomicU64>,
}

impl IndexCatalog {
    pub fn new() -> Self {
        IndexCatalog {
            records: Arc::new(RwLock::new(IndexMap::new())),
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Adds a definition and returns its generation.
    pub fn add(&self, entry: IndexEntry, status: IndexStatus) -> DocDbResult<u64> {
        let mut records = self.records.write();
        if records.contains_key(entry.field()) {
            log::error!("Index already exists on field {}", entry.field());
            return Err(DocDbError::new(
                &format!("index already exists on field {}", entry.field()),
                ErrorKind::IndexAlreadyExists,
            ));
        }

        let generation = self.next_generation();
        records.insert(
            entry.field().to_string(),
            CatalogRecord {
                entry,
                status,
                generation,
            },
        );
        Ok(generation)
    }

    /// Moves a ready index into building status and returns the new generation.
    pub fn begin_rebuild(&self, field: &str) -> DocDbResult<u64> {
        let mut records = self.records.write();
        let generation = self.next_generation();
        match records.get_mut(field) {
            None => {
                log::error!("{} is not indexed", field);
                Err(DocDbError::new(
                    &format!("{} is not indexed", field),
                    ErrorKind::IndexingError,
                ))
            }
            Some(record) if record.status == IndexStatus::Building => {
                log::error!("Indexing on value {} is currently running", field);
                Err(DocDbError::new(
                    &format!("indexing on value {} is currently running", field),
                    ErrorKind::IndexingError,
                ))
            }
            Some(record) => {
                record.status = IndexStatus::Building;
                record.generation = generation;
                Ok(generation)
            }
        }
    }

    /// Sets the status of the record started at `generation`.
    /// Returns `false` if that record no longer exists.
    pub fn mark(&self, field: &str, status: IndexStatus, generation: u64) -> bool {
        let mut records = self.records.write();
        match records.get_mut(field) {
            Some(record) if record.generation == generation => {
                record.status = status;
                true
            }
            _ => false,
        }
    }

    /// Removes the record started at `generation`.
    pub fn remove_generation(&self, field: &str, generation: u64) -> bool {
        let mut records = self.records.write();
        let matches = records
            .get(field)
            .map(|record| record.generation == generation)
            .unwrap_or(false);
        if matches {
            records.shift_remove(field);
        }
        matches
    }

    pub fn find(&self, field: &str) -> Option<IndexEntry> {
        self.records.read().get(field).map(|r| r.entry.clone())
    }

    pub fn status(&self, field: &str) -> Option<IndexStatus> {
        self.records.read().get(field).map(|r| r.status)
    }

    pub fn is_building(&self, field: &str) -> bool {
        self.status(field) == Some(IndexStatus::Building)
    }

    pub fn has(&self, field: &str) -> bool {
        self.records.read().contains_key(field)
    }

    pub fn remove(&self, field: &str) -> Option<IndexEntry> {
        self.records.write().shift_remove(field).map(|r| r.entry)
    }

    pub fn clear(&self) {
        self.records.write().clear();
    }

    /// Definitions in creation order.
    pub fn list(&self) -> Vec<IndexEntry> {
        self.records.read().values().map(|r| r.entry.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    fn next_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }
}

impl Default for IndexCatalog {
    fn default() -> Self {
        Self::new()
    }
}
