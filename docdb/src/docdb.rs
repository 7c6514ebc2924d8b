use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::collection::{CollectionFactory, DocDbCollection};
use crate::common::validate_collection_name;
use crate::docdb_builder::DocDbBuilder;
use crate::docdb_config::DocDbConfig;
use crate::errors::{DocDbError, DocDbResult, ErrorKind};
use crate::transaction::Session;

/// An embedded document database.
///
/// `DocDb` is a cheap, cloneable handle; clones share the same collections
/// and store. The store is closed when [`close`](DocDb::close) is called or
/// when the last handle is dropped.
///
/// ```rust,ignore
/// use docdb::docdb::DocDb;
/// use docdb::doc;
///
/// let db = DocDb::builder().open_or_create()?;
/// let users = db.collection("users")?;
/// users.insert(doc! { name: "Alice" })?;
///
/// db.with_session(|session| {
///     let transaction = session.begin_transaction()?;
///     let users = transaction.collection("users")?;
///     users.insert(doc! { name: "Bob" })?;
///     transaction.commit()
/// })?;
/// db.close()?;
/// ```
#[derive(Clone)]
pub struct DocDb {
    inner: Arc<DocDbInner>,
}

impl DocDb {
    pub fn builder() -> DocDbBuilder {
        DocDbBuilder::new()
    }

    pub(crate) fn new(config: DocDbConfig) -> Self {
        DocDb {
            inner: Arc::new(DocDbInner {
                collection_factory: CollectionFactory::new(),
                config,
                closed: AtomicBool::new(false),
            }),
        }
    }

    /// Opens the collection `name`, creating it on first use.
    ///
    /// Repeated calls return the same handle while it stays open.
    pub fn collection(&self, name: &str) -> DocDbResult<DocDbCollection> {
        self.inner.collection(name)
    }

    pub fn has_collection(&self, name: &str) -> DocDbResult<bool> {
        self.inner.check_opened()?;
        Ok(self.inner.config.store().has_map(name))
    }

    /// Names of every existing collection, sorted.
    pub fn list_collection_names(&self) -> DocDbResult<Vec<String>> {
        self.inner.check_opened()?;
        Ok(self.inner.config.store().map_names())
    }

    /// Drops the collection `name` with all its documents and indexes.
    pub fn destroy_collection(&self, name: &str) -> DocDbResult<()> {
        self.inner.check_opened()?;
        self.inner.collection_factory.destroy_collection(name)?;
        self.inner.config.store().remove_map(name)
    }

    pub fn create_session(&self) -> DocDbResult<Session> {
        self.inner.check_opened()?;
        Ok(Session::new(self.clone()))
    }

    /// Runs `func` with a fresh session and closes the session afterwards.
    ///
    /// Closing the session rolls back every transaction `func` left active,
    /// including when `func` fails.
    pub fn with_session<F, R>(&self, func: F) -> DocDbResult<R>
    where
        F: FnOnce(&Session) -> DocDbResult<R>,
    {
        let session = self.create_session()?;
        let result = func(&session);
        session.close()?;
        result
    }

    /// Closes every collection and the store. Closing twice is a no-op.
    pub fn close(&self) -> DocDbResult<()> {
        self.inner.close()
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    pub fn config(&self) -> &DocDbConfig {
        &self.inner.config
    }
}

struct DocDbInner {
    collection_factory: CollectionFactory,
    config: DocDbConfig,
    closed: AtomicBool,
}

impl DocDbInner {
    fn collection(&self, name: &str) -> DocDbResult<DocDbCollection> {
        validate_collection_name(name)?;
        self.check_opened()?;
        self.collection_factory.get_collection(name, &self.config)
    }

    fn check_opened(&self) -> DocDbResult<()> {
        if self.closed.load(Ordering::Acquire) || self.config.store().is_closed() {
            log::error!("Database is closed");
            return Err(DocDbError::new("store is closed", ErrorKind::StoreClosed));
        }
        Ok(())
    }

    fn close(&self) -> DocDbResult<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        self.collection_factory.clear()?;
        self.config.close()?;
        log::debug!("Database closed");
        Ok(())
    }
}

// runs when the last handle goes away
impl Drop for DocDbInner {
    fn drop(&mut self) {
        if let Err(err) = self.close() {
            log::warn!("Failed to close database: {}", err);
        }
    }
}
