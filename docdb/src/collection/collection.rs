use std::ops::Deref;
use std::sync::Arc;

use super::operation::WriteResult;
use super::{Document, DocumentCursor, DocumentId, UpdateOptions};
use crate::common::{AttributeAware, EventAware};
use crate::errors::DocDbResult;
use crate::filter::{all, Filter};
use crate::index::{IndexEntry, IndexOptions};

/// Operations every collection handle supports.
///
/// Implemented by the live, lock-guarded collection and by the isolated
/// collection a transaction hands out.
pub trait DocDbCollectionProvider: EventAware + AttributeAware + Send + Sync {
    /// Inserts a single document, assigning an `_id` if it has none.
    fn insert(&self, document: Document) -> DocDbResult<WriteResult> {
        self.insert_many(vec![document])
    }

    /// Inserts a batch of documents. Either every document is written or none.
    fn insert_many(&self, documents: Vec<Document>) -> DocDbResult<WriteResult>;

    /// Merges `update` into every document matching `filter`.
    fn update(&self, filter: Filter, update: &Document) -> DocDbResult<WriteResult> {
        self.update_with_options(filter, update, &UpdateOptions::default())
    }

    fn update_with_options(
        &self,
        filter: Filter,
        update: &Document,
        update_options: &UpdateOptions,
    ) -> DocDbResult<WriteResult>;

    /// Updates the stored document with the same `_id`.
    ///
    /// With `insert_if_absent` the document is upserted; a document without
    /// an `_id` is then matched on its own field values. Without it, a
    /// document lacking an `_id` fails with `NotIdentifiable`.
    fn update_one(&self, document: &Document, insert_if_absent: bool)
        -> DocDbResult<WriteResult>;

    /// Removes documents matching `filter`, or only the first when
    /// `just_once` is set. `just_once` cannot be combined with `all()`.
    fn remove(&self, filter: Filter, just_once: bool) -> DocDbResult<WriteResult>;

    /// Removes the stored document with the same `_id`.
    fn remove_one(&self, document: &Document) -> DocDbResult<WriteResult>;

    fn find(&self, filter: Filter) -> DocDbResult<DocumentCursor>;

    fn find_all(&self) -> DocDbResult<DocumentCursor> {
        self.find(all())
    }

    fn get_by_id(&self, id: &DocumentId) -> DocDbResult<Option<Document>>;

    fn create_index(&self, field: &str, index_options: &IndexOptions) -> DocDbResult<()>;

    fn rebuild_index(&self, field: &str, is_async: bool) -> DocDbResult<()>;

    fn list_indexes(&self) -> DocDbResult<Vec<IndexEntry>>;

    fn has_index(&self, field: &str) -> DocDbResult<bool>;

    fn is_indexing(&self, field: &str) -> DocDbResult<bool>;

    fn drop_index(&self, field: &str) -> DocDbResult<()>;

    fn drop_all_indexes(&self) -> DocDbResult<()>;

    /// Removes every document, keeping index definitions.
    fn clear(&self) -> DocDbResult<()>;

    /// Drops the collection. The handle is closed afterwards and every
    /// further call fails.
    fn dispose(&self) -> DocDbResult<()>;

    fn is_dropped(&self) -> bool;

    fn is_open(&self) -> bool;

    fn size(&self) -> DocDbResult<u64>;

    /// Releases the handle. Calling it again does nothing.
    fn close(&self) -> DocDbResult<()>;

    fn name(&self) -> String;
}

/// A named set of documents.
///
/// Cloning is cheap; clones share the same underlying handle.
///
/// ```rust,ignore
/// let users = db.collection("users")?;
/// users.insert(doc! { name: "Alice", age: 30 })?;
///
/// let adults = users.find(field("age").gte(18))?.to_list()?;
/// users.remove(field("name").eq("Alice"), false)?;
/// ```
#[derive(Clone)]
pub struct DocDbCollection {
    inner: Arc<dyn DocDbCollectionProvider>,
}

impl DocDbCollection {
    pub fn new<T: DocDbCollectionProvider + 'static>(inner: T) -> Self {
        DocDbCollection {
            inner: Arc::new(inner),
        }
    }
}

impl Deref for DocDbCollection {
    type Target = Arc<dyn DocDbCollectionProvider>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}
