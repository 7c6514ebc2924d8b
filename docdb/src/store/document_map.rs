use std::ops::Deref;
use std::sync::Arc;

use crate::collection::{Document, DocumentId};
use crate::common::AttributeAware;
use crate::errors::DocDbResult;

/// An ordered, mutable map from document id to document backing one collection.
///
/// Every method except the status checks fails with a store-closed error
/// once the map is closed or dropped.
pub trait DocumentMapProvider: AttributeAware + Send + Sync {
    fn name(&self) -> &str;

    fn get(&self, key: &DocumentId) -> DocDbResult<Option<Document>>;

    fn put(&self, key: DocumentId, document: Document) -> DocDbResult<()>;

    fn remove(&self, key: &DocumentId) -> DocDbResult<Option<Document>>;

    fn contains_key(&self, key: &DocumentId) -> DocDbResult<bool>;

    /// Returns the first entry whose key is strictly greater than `key`,
    /// or the first entry of the map when `key` is `None`.
    fn higher_entry(&self, key: Option<&DocumentId>) -> DocDbResult<Option<(DocumentId, Document)>>;

    fn values(&self) -> DocDbResult<Vec<Document>>;

    fn keys(&self) -> DocDbResult<Vec<DocumentId>>;

    fn size(&self) -> DocDbResult<u64>;

    fn clear(&self) -> DocDbResult<()>;

    fn close(&self) -> DocDbResult<()>;

    fn is_closed(&self) -> bool;

    /// Drops the map. A dropped map stays dropped.
    fn dispose(&self) -> DocDbResult<()>;

    fn is_dropped(&self) -> bool;
}

#[derive(Clone)]
pub struct DocumentMap {
    inner: Arc<dyn DocumentMapProvider>,
}

impl DocumentMap {
    pub fn new<T: DocumentMapProvider + 'static>(inner: T) -> Self {
        DocumentMap {
            inner: Arc::new(inner),
        }
    }
}

impl Deref for DocumentMap {
    type Target = Arc<dyn DocumentMapProvider>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}
