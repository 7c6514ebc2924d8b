use indexmap::IndexMap;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use uuid::Uuid;

use super::DocDbTransaction;
use crate::docdb::DocDb;
use crate::errors::{DocDbError, DocDbResult, ErrorKind};

/// Groups the transactions of one caller.
///
/// Closing the session rolls back every transaction it started that is
/// still active. The session also closes when its last handle is dropped.
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

impl Session {
    pub(crate) fn new(db: DocDb) -> Self {
        Session {
            inner: Arc::new(SessionInner {
                id: Uuid::new_v4().to_string(),
                db,
                transactions: Mutex::new(IndexMap::new()),
                active: AtomicBool::new(true),
            }),
        }
    }

    /// Unique id of this session.
    pub fn id(&self) -> &str {
        &self.inner.id
    }

    /// Starts a new transaction tracked by this session.
    ///
    /// Transactions that have already committed, failed or closed are
    /// forgotten here; the session only keeps the ones it may still have to
    /// roll back.
    ///
    /// # Errors
    ///
    /// * `TransactionClosed` if the session has been closed
    /// * `StoreClosed` if the database has been closed
    pub fn begin_transaction(&self) -> DocDbResult<DocDbTransaction> {
        if !self.is_active() {
            log::error!("Session {} is closed", self.inner.id);
            return Err(DocDbError::new(
                "session is closed",
                ErrorKind::TransactionClosed,
            ));
        }
        if self.inner.db.is_closed() {
            log::error!("Cannot begin a transaction on a closed database");
            return Err(DocDbError::new("store is closed", ErrorKind::StoreClosed));
        }

        let transaction = DocDbTransaction::new(self.inner.db.clone());
        let mut transactions = self.inner.transactions.lock();
        // finished transactions are released already, only the handle is dropped
        transactions.retain(|_, tracked| tracked.is_active());
        transactions.insert(transaction.id().to_string(), transaction.clone());
        drop(transactions);
        log::debug!("Session {} began transaction {}", self.inner.id, transaction.id());
        Ok(transaction)
    }

    /// Transactions of this session that are still active.
    pub fn active_transactions(&self) -> Vec<DocDbTransaction> {
        self.inner
            .transactions
            .lock()
            .values()
            .filter(|transaction| transaction.is_active())
            .cloned()
            .collect()
    }

    /// Returns `true` until the session is closed.
    pub fn is_active(&self) -> bool {
        self.inner.active.load(Ordering::Acquire)
    }

    /// Closes the session, rolling back its active transactions.
    ///
    /// Every transaction is ended even if an earlier one fails; the first
    /// failure is returned. Closing twice is a no-op.
    pub fn close(&self) -> DocDbResult<()> {
        self.inner.close()
    }
}

struct SessionInner {
    id: String,
    db: DocDb,
    transactions: Mutex<IndexMap<String, DocDbTransaction>>,
    active: AtomicBool,
}

impl SessionInner {
    fn close(&self) -> DocDbResult<()> {
        if !self.active.swap(false, Ordering::AcqRel) {
            return Ok(());
        }

        let transactions: Vec<DocDbTransaction> = self
            .transactions
            .lock()
            .drain(..)
            .map(|(_, transaction)| transaction)
            .collect();
        end_transactions(&self.id, transactions, |transaction| {
            if transaction.is_active() {
                transaction.rollback()
            } else {
                transaction.close()
            }
        })
    }
}

/// Ends every transaction with `end`, even after a failure, and reports the
/// first error.
fn end_transactions(
    session_id: &str,
    transactions: Vec<DocDbTransaction>,
    end: impl Fn(&DocDbTransaction) -> DocDbResult<()>,
) -> DocDbResult<()> {
    let mut first_error = None;
    for transaction in transactions {
        if let Err(err) = end(&transaction) {
            log::warn!(
                "Session {} could not end transaction {}: {}",
                session_id,
                transaction.id(),
                err
            );
            first_error.get_or_insert(err);
        }
    }
    first_error.map_or(Ok(()), Err)
}

impl Drop for SessionInner {
    fn drop(&mut self) {
        if let Err(err) = self.close() {
            log::warn!("Failed to close session {}: {}", self.id, err);
        }
    }
}
