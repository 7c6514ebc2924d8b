use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::JournalEntry;
use crate::docdb_config::DocDbConfig;
use crate::errors::{DocDbError, DocDbResult, ErrorKind};
use crate::store::DocumentMap;

/// Append-only log of the operations issued through one transactional
/// collection, in issue order.
#[derive(Debug, Default)]
pub struct Journal {
    entries: Mutex<VecDeque<JournalEntry>>,
}

impl Journal {
    pub fn new() -> Self {
        Journal {
            entries: Mutex::new(VecDeque::new()),
        }
    }

    pub fn append(&self, entry: JournalEntry) {
        self.entries.lock().push_back(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Copies the entries without consuming them.
    pub fn entries(&self) -> Vec<JournalEntry> {
        self.entries.lock().iter().cloned().collect()
    }

    /// Takes every entry out of the journal, oldest first.
    pub fn drain(&self) -> Vec<JournalEntry> {
        self.entries.lock().drain(..).collect()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

/// State one transaction keeps for one collection: the isolated map, the
/// journal and the active flag every transactional operation consults.
#[derive(Clone)]
pub struct TransactionContext {
    inner: Arc<TransactionContextInner>,
}

struct TransactionContextInner {
    collection_name: String,
    transaction_map: DocumentMap,
    config: DocDbConfig,
    journal: Journal,
    active: AtomicBool,
    poisoned: AtomicBool,
}

impl TransactionContext {
    pub(crate) fn new(collection_name: &str, transaction_map: DocumentMap, config: DocDbConfig) -> Self {
        TransactionContext {
            inner: Arc::new(TransactionContextInner {
                collection_name: collection_name.to_string(),
                transaction_map,
                config,
                journal: Journal::new(),
                active: AtomicBool::new(true),
                poisoned: AtomicBool::new(false),
            }),
        }
    }

    pub fn collection_name(&self) -> &str {
        &self.inner.collection_name
    }

    pub fn transaction_map(&self) -> &DocumentMap {
        &self.inner.transaction_map
    }

    /// Configuration of the database that owns the transaction.
    pub fn config(&self) -> &DocDbConfig {
        &self.inner.config
    }

    pub fn journal(&self) -> &Journal {
        &self.inner.journal
    }

    pub fn is_active(&self) -> bool {
        self.inner.active.load(Ordering::SeqCst)
    }

    pub fn set_inactive(&self) {
        self.inner.active.store(false, Ordering::SeqCst);
    }

    /// `true` once a write reached the isolated map without a matching
    /// journal entry. A poisoned transaction cannot commit.
    pub fn is_poisoned(&self) -> bool {
        self.inner.poisoned.load(Ordering::SeqCst)
    }

    pub(crate) fn mark_poisoned(&self) {
        self.inner.poisoned.store(true, Ordering::SeqCst);
    }

    /// Appends `entry` to the journal.
    ///
    /// # Errors
    ///
    /// Returns `TransactionClosed` when the context is no longer active; the
    /// journal is left unchanged.
    pub fn add_entry(&self, entry: JournalEntry) -> DocDbResult<()> {
        if !self.is_active() {
            log::error!(
                "Cannot record {} on {}, transaction is closed",
                entry,
                self.inner.collection_name
            );
            return Err(DocDbError::new(
                "transaction is closed",
                ErrorKind::TransactionClosed,
            ));
        }
        log::debug!("Journal {} <- {}", self.inner.collection_name, entry);
        self.inner.journal.append(entry);
        Ok(())
    }

    pub fn pending_operations(&self) -> usize {
        self.inner.journal.len()
    }
}
