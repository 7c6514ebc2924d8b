use indexmap::IndexMap;
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use uuid::Uuid;

use super::transactional_collection::TransactionalCollection;
use super::{TransactionContext, TransactionState, UndoEntry};
use crate::collection::DocDbCollection;
use crate::docdb::DocDb;
use crate::errors::{DocDbError, DocDbResult, ErrorKind};
use crate::index::IndexStatus;
use crate::store::InMemoryStore;

/// A unit of work over one or more collections.
///
/// [`collection`](DocDbTransaction::collection) hands out isolated handles.
/// Their writes are visible inside the transaction at once and reach the
/// database only on [`commit`](DocDbTransaction::commit).
///
/// ```rust,ignore
/// let transaction = session.begin_transaction()?;
/// let users = transaction.collection("users")?;
/// users.insert(doc! { name: "Alice" })?;
/// assert_eq!(db.collection("users")?.size()?, 0);
/// transaction.commit()?;
/// ```
#[derive(Clone)]
pub struct DocDbTransaction {
    inner: Arc<TransactionInner>,
}

impl DocDbTransaction {
    pub(crate) fn new(db: DocDb) -> Self {
        DocDbTransaction {
            inner: Arc::new(TransactionInner {
                id: Uuid::new_v4().to_string(),
                db,
                store: InMemoryStore::new(),
                state: RwLock::new(TransactionState::Active),
                collections: Mutex::new(IndexMap::new()),
                undo_log: Mutex::new(Vec::new()),
                closed: AtomicBool::new(false),
            }),
        }
    }

    /// Unique id of this transaction, a UUID string.
    pub fn id(&self) -> &str {
        &self.inner.id
    }

    /// Current lifecycle state.
    ///
    /// A transaction starts `Active`, passes through `PartiallyCommitted`
    /// while its journals replay, and ends `Committed`, `Failed`, `Aborted`
    /// or `Closed`.
    pub fn state(&self) -> TransactionState {
        *self.inner.state.read()
    }

    /// Returns the transactional handle for `name`.
    ///
    /// On first use the isolated copy is seeded with the live collection's
    /// documents, attributes and ready index definitions.
    ///
    /// # Arguments
    ///
    /// * `name` - The collection name, created in the database at commit if absent
    ///
    /// # Returns
    ///
    /// The same handle on every call with the same name
    ///
    /// # Errors
    ///
    /// Returns `TransactionClosed` if the transaction is no longer active.
    pub fn collection(&self, name: &str) -> DocDbResult<DocDbCollection> {
        self.inner.collection(name)
    }

    /// Replays every journal onto the database.
    ///
    /// Collections are replayed in the order the transaction first touched
    /// them, and each journal in the order its operations were issued. Every
    /// replayed entry takes the live collection's lock on its own, so other
    /// writers may interleave between entries; there is no lock held across
    /// the whole commit. If any entry fails, the entries already replayed
    /// are compensated newest first and a `TransactionFailed` error carrying
    /// the cause is returned. The transaction is closed either way.
    pub fn commit(&self) -> DocDbResult<()> {
        self.inner.commit()
    }

    /// Abandons the transaction. Rolling back an inactive transaction does
    /// nothing.
    pub fn rollback(&self) -> DocDbResult<()> {
        self.inner.rollback()
    }

    /// Discards pending operations and releases the transaction. Closing
    /// twice is a no-op.
    pub fn close(&self) -> DocDbResult<()> {
        self.inner.close()
    }

    /// Returns `true` while the transaction still accepts operations.
    pub fn is_active(&self) -> bool {
        self.state() == TransactionState::Active
    }

    /// Number of journaled operations waiting for commit.
    pub fn pending_operations(&self) -> usize {
        self.inner
            .collections
            .lock()
            .values()
            .map(|participant| participant.context.pending_operations())
            .sum()
    }

    /// Names of the collections touched so far, in first-touch order.
    pub fn collection_names(&self) -> Vec<String> {
        self.inner.collections.lock().keys().cloned().collect()
    }
}

struct Participant {
    context: TransactionContext,
    collection: DocDbCollection,
}

struct TransactionInner {
    id: String,
    db: DocDb,
    store: InMemoryStore,
    state: RwLock<TransactionState>,
    collections: Mutex<IndexMap<String, Participant>>,
    undo_log: Mutex<Vec<(String, UndoEntry)>>,
    closed: AtomicBool,
}

impl TransactionInner {
    fn check_active(&self) -> DocDbResult<()> {
        let state = *self.state.read();
        if state != TransactionState::Active {
            log::error!("Transaction {} is {}", self.id, state);
            return Err(DocDbError::new(
                "transaction is closed",
                ErrorKind::TransactionClosed,
            ));
        }
        Ok(())
    }

    fn collection(&self, name: &str) -> DocDbResult<DocDbCollection> {
        self.check_active()?;

        let mut collections = self.collections.lock();
        if let Some(participant) = collections.get(name) {
            return Ok(participant.collection.clone());
        }

        let primary = self.db.collection(name)?;
        let map = self.store.open_map(name)?;
        for document in primary.find_all()?.to_list()? {
            if let Some(id) = document.id_value() {
                map.put(id, document)?;
            }
        }
        map.set_attributes(primary.attributes()?)?;

        let catalog = self.store.index_catalog(name)?;
        for entry in primary.list_indexes()? {
            if !primary.is_indexing(entry.field())? {
                catalog.add(entry, IndexStatus::Ready)?;
            }
        }

        let context = TransactionContext::new(name, map, self.db.config().clone());
        let collection = DocDbCollection::new(TransactionalCollection::new(
            primary,
            context.clone(),
            &self.store,
        )?);
        collections.insert(
            name.to_string(),
            Participant {
                context,
                collection: collection.clone(),
            },
        );
        log::debug!("Transaction {} joined collection {}", self.id, name);
        Ok(collection)
    }

    fn commit(&self) -> DocDbResult<()> {
        {
            let mut state = self.state.write();
            if *state != TransactionState::Active {
                log::error!("Cannot commit transaction {} in state {}", self.id, *state);
                return Err(DocDbError::new(
                    "transaction is closed",
                    ErrorKind::TransactionClosed,
                ));
            }
            *state = TransactionState::PartiallyCommitted;
        }

        if self.is_poisoned() {
            *self.state.write() = TransactionState::Failed;
            log::error!(
                "Transaction {} has writes that were never journaled, refusing to commit",
                self.id
            );
            if let Err(close_err) = self.release() {
                log::warn!("Failed to release transaction {}: {}", self.id, close_err);
            }
            return Err(DocDbError::new(
                "transaction is poisoned by a write that was not journaled",
                ErrorKind::TransactionFailed,
            ));
        }

        match self.perform_commit() {
            Ok(()) => {
                *self.state.write() = TransactionState::Committed;
                self.undo_log.lock().clear();
                log::info!("Transaction {} committed", self.id);
                self.release()
            }
            Err(err) => {
                log::error!("Transaction {} failed to commit: {}", self.id, err);
                self.perform_rollback();
                *self.state.write() = TransactionState::Failed;
                if let Err(close_err) = self.release() {
                    log::warn!("Failed to release transaction {}: {}", self.id, close_err);
                }
                Err(DocDbError::new_with_cause(
                    "transaction failed to commit",
                    ErrorKind::TransactionFailed,
                    err,
                ))
            }
        }
    }

    fn is_poisoned(&self) -> bool {
        self.collections
            .lock()
            .values()
            .any(|participant| participant.context.is_poisoned())
    }

    fn perform_commit(&self) -> DocDbResult<()> {
        let contexts: Vec<(String, TransactionContext)> = self
            .collections
            .lock()
            .iter()
            .map(|(name, participant)| (name.clone(), participant.context.clone()))
            .collect();

        for (name, context) in contexts {
            for entry in context.journal().drain() {
                // resolved per entry, a replayed drop replaces the live handle
                let primary = self.db.collection(&name)?;
                log::debug!("Transaction {} replaying {} on {}", self.id, entry, name);
                let undo = entry.commit(&primary)?;
                self.undo_log.lock().push((name.clone(), undo));
            }
        }
        Ok(())
    }

    fn perform_rollback(&self) {
        let undo_log: Vec<(String, UndoEntry)> = self.undo_log.lock().drain(..).collect();
        for (name, undo) in undo_log.into_iter().rev() {
            if let Err(err) = undo.rollback(&name, &self.db) {
                log::warn!(
                    "Transaction {} could not compensate {:?} on {}: {}",
                    self.id,
                    undo,
                    name,
                    err
                );
            }
        }
    }

    fn rollback(&self) -> DocDbResult<()> {
        {
            let mut state = self.state.write();
            if *state != TransactionState::Active {
                return Ok(());
            }
            *state = TransactionState::Aborted;
        }

        self.perform_rollback();
        log::info!("Transaction {} rolled back", self.id);
        self.release()
    }

    fn close(&self) -> DocDbResult<()> {
        {
            let mut state = self.state.write();
            if matches!(
                *state,
                TransactionState::Active | TransactionState::PartiallyCommitted
            ) {
                *state = TransactionState::Closed;
            }
        }
        self.release()
    }

    fn release(&self) -> DocDbResult<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }

        let participants: Vec<Participant> = self
            .collections
            .lock()
            .drain(..)
            .map(|(_, participant)| participant)
            .collect();
        let mut first_error = None;
        for participant in participants {
            participant.context.journal().clear();
            participant.context.set_inactive();
            if let Err(err) = participant.collection.close() {
                log::warn!("Transaction {} could not close a collection: {}", self.id, err);
                first_error.get_or_insert(err);
            }
        }
        let closed = self.store.close();
        first_error.map_or(closed, Err)
    }
}

impl Drop for TransactionInner {
    fn drop(&mut self) {
        if let Err(err) = self.close() {
            log::warn!("Failed to close transaction {}: {}", self.id, err);
        }
    }
}
