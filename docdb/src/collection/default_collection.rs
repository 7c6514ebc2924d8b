use parking_lot::RwLock;

use super::operation::{CollectionEventBus, CollectionOperations, WriteResult};
use super::{
    CollectionEventListener, DocDbCollectionProvider, Document, DocumentCursor, DocumentId,
    UpdateOptions,
};
use crate::common::{
    create_unique_filter, AttributeAware, Attributes, EventAware, LockHandle, SubscriberRef,
};
use crate::docdb_config::DocDbConfig;
use crate::errors::{DocDbError, DocDbResult, ErrorKind};
use crate::filter::{by_id, is_all_filter, Filter};
use crate::index::{IndexEntry, IndexOptions};
use crate::store::{DocumentMap, InMemoryStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CollectionState {
    Open,
    Closed,
    Dropped,
}

/// The live collection handle.
///
/// Every call checks the handle state first, then takes the per-name lock
/// from the configuration's lock registry and delegates to the engine.
/// Once the store closes or the backing map is dropped, the handle closes
/// itself on the next call.
pub(crate) struct DefaultDocDbCollection {
    collection_name: String,
    document_map: DocumentMap,
    store: InMemoryStore,
    operations: RwLock<Option<CollectionOperations>>,
    state: RwLock<CollectionState>,
    lock_handle: LockHandle,
}

impl DefaultDocDbCollection {
    pub fn new(collection_name: &str, config: &DocDbConfig) -> DocDbResult<Self> {
        let store = config.store().clone();
        let document_map = store.open_map(collection_name)?;
        let event_bus = CollectionEventBus::new(config.event_queue_capacity());
        let operations = CollectionOperations::new(
            collection_name,
            document_map.clone(),
            store.clone(),
            event_bus,
        )?;

        Ok(DefaultDocDbCollection {
            collection_name: collection_name.to_string(),
            document_map,
            store,
            operations: RwLock::new(Some(operations)),
            state: RwLock::new(CollectionState::Open),
            lock_handle: config.lock_registry().get_lock(collection_name),
        })
    }

    /// Returns the engine if the handle is open, closing the handle first
    /// when its store or map went away underneath it.
    fn check_opened(&self) -> DocDbResult<CollectionOperations> {
        let map_dropped = self.document_map.is_dropped();
        if map_dropped || self.store.is_closed() || self.document_map.is_closed() {
            if map_dropped {
                *self.state.write() = CollectionState::Dropped;
            }
            self.close()?;
        }

        match *self.state.read() {
            CollectionState::Dropped => {
                log::error!("Collection {} has been dropped", self.collection_name);
                Err(DocDbError::new(
                    "collection has been dropped",
                    ErrorKind::StoreClosed,
                ))
            }
            CollectionState::Closed if self.store.is_closed() => {
                log::error!("Store is closed, cannot access {}", self.collection_name);
                Err(DocDbError::new("store is closed", ErrorKind::StoreClosed))
            }
            CollectionState::Closed => {
                log::error!("Collection {} is closed", self.collection_name);
                Err(DocDbError::new(
                    "collection is closed",
                    ErrorKind::StoreClosed,
                ))
            }
            CollectionState::Open => self.operations.read().clone().ok_or_else(|| {
                log::error!("Collection {} has no engine", self.collection_name);
                DocDbError::new("collection is closed", ErrorKind::StoreClosed)
            }),
        }
    }
}

impl EventAware for DefaultDocDbCollection {
    fn subscribe(&self, listener: CollectionEventListener) -> DocDbResult<SubscriberRef> {
        let operations = self.check_opened()?;
        let _guard = self.lock_handle.write();
        operations.subscribe(listener)
    }

    fn unsubscribe(&self, subscriber: SubscriberRef) -> DocDbResult<()> {
        let operations = self.check_opened()?;
        let _guard = self.lock_handle.write();
        operations.unsubscribe(subscriber)
    }
}

impl AttributeAware for DefaultDocDbCollection {
    fn attributes(&self) -> DocDbResult<Attributes> {
        let operations = self.check_opened()?;
        let _guard = self.lock_handle.read();
        operations.attributes()
    }

    fn set_attributes(&self, attributes: Attributes) -> DocDbResult<()> {
        let operations = self.check_opened()?;
        let _guard = self.lock_handle.write();
        operations.set_attributes(attributes)
    }
}

impl DocDbCollectionProvider for DefaultDocDbCollection {
    fn insert_many(&self, documents: Vec<Document>) -> DocDbResult<WriteResult> {
        let operations = self.check_opened()?;
        let _guard = self.lock_handle.write();
        operations.insert_batch(documents)
    }

    fn update_with_options(
        &self,
        filter: Filter,
        update: &Document,
        update_options: &UpdateOptions,
    ) -> DocDbResult<WriteResult> {
        let operations = self.check_opened()?;
        let _guard = self.lock_handle.write();
        operations.update(&filter, update, update_options)
    }

    fn update_one(&self, document: &Document, insert_if_absent: bool) -> DocDbResult<WriteResult> {
        let operations = self.check_opened()?;

        if insert_if_absent {
            let mut document = document.clone();
            let filter = create_unique_filter(&mut document)?;
            let _guard = self.lock_handle.write();
            return operations.update(&filter, &document, &UpdateOptions::new(true, false));
        }

        match document.id_value() {
            Some(id) => {
                let _guard = self.lock_handle.write();
                operations.update(&by_id(id), document, &UpdateOptions::new(false, false))
            }
            None => {
                log::error!("Document to update does not have an id");
                Err(DocDbError::new(
                    "update operation failed as no id value found for the document",
                    ErrorKind::NotIdentifiable,
                ))
            }
        }
    }

    fn remove(&self, filter: Filter, just_once: bool) -> DocDbResult<WriteResult> {
        let operations = self.check_opened()?;
        if just_once && is_all_filter(&filter) {
            log::error!("Remove all cannot be combined with just once");
            return Err(DocDbError::new(
                "remove all cannot be combined with just once",
                ErrorKind::InvalidOperation,
            ));
        }

        let _guard = self.lock_handle.write();
        operations.remove(&filter, just_once)
    }

    fn remove_one(&self, document: &Document) -> DocDbResult<WriteResult> {
        let operations = self.check_opened()?;
        if !document.has_id() {
            log::error!("Document to remove does not have an id");
            return Err(DocDbError::new(
                "remove operation failed as no id value found for the document",
                ErrorKind::NotIdentifiable,
            ));
        }

        let _guard = self.lock_handle.write();
        operations.remove_document(document)
    }

    fn find(&self, filter: Filter) -> DocDbResult<DocumentCursor> {
        let operations = self.check_opened()?;
        let _guard = self.lock_handle.read();
        operations.find(filter)
    }

    fn get_by_id(&self, id: &DocumentId) -> DocDbResult<Option<Document>> {
        let operations = self.check_opened()?;
        let _guard = self.lock_handle.read();
        operations.get_by_id(id)
    }

    fn create_index(&self, field: &str, index_options: &IndexOptions) -> DocDbResult<()> {
        let operations = self.check_opened()?;
        let _guard = self.lock_handle.write();
        operations.create_index(field, index_options)
    }

    fn rebuild_index(&self, field: &str, is_async: bool) -> DocDbResult<()> {
        let operations = self.check_opened()?;
        // the existence and in-progress checks run under the same write guard
        let _guard = self.lock_handle.write();
        operations.rebuild_index(field, is_async)
    }

    fn list_indexes(&self) -> DocDbResult<Vec<IndexEntry>> {
        let operations = self.check_opened()?;
        let _guard = self.lock_handle.read();
        Ok(operations.list_indexes())
    }

    fn has_index(&self, field: &str) -> DocDbResult<bool> {
        let operations = self.check_opened()?;
        let _guard = self.lock_handle.read();
        Ok(operations.has_index(field))
    }

    fn is_indexing(&self, field: &str) -> DocDbResult<bool> {
        let operations = self.check_opened()?;
        let _guard = self.lock_handle.read();
        Ok(operations.is_indexing(field))
    }

    fn drop_index(&self, field: &str) -> DocDbResult<()> {
        let operations = self.check_opened()?;
        let _guard = self.lock_handle.write();
        operations.drop_index(field)
    }

    fn drop_all_indexes(&self) -> DocDbResult<()> {
        let operations = self.check_opened()?;
        let _guard = self.lock_handle.write();
        operations.drop_all_indexes()
    }

    fn clear(&self) -> DocDbResult<()> {
        let operations = self.check_opened()?;
        let _guard = self.lock_handle.write();
        operations.clear()
    }

    fn dispose(&self) -> DocDbResult<()> {
        let operations = self.check_opened()?;
        {
            let _guard = self.lock_handle.write();
            operations.dispose()?;
        }
        *self.state.write() = CollectionState::Dropped;
        self.close()
    }

    fn is_dropped(&self) -> bool {
        *self.state.read() == CollectionState::Dropped || self.document_map.is_dropped()
    }

    fn is_open(&self) -> bool {
        *self.state.read() == CollectionState::Open
            && !self.store.is_closed()
            && !self.document_map.is_closed()
            && !self.document_map.is_dropped()
    }

    fn size(&self) -> DocDbResult<u64> {
        let operations = self.check_opened()?;
        let _guard = self.lock_handle.read();
        operations.size()
    }

    fn close(&self) -> DocDbResult<()> {
        let operations = {
            let mut state = self.state.write();
            if *state == CollectionState::Open {
                *state = CollectionState::Closed;
            }
            self.operations.write().take()
        };

        // listener workers may still be calling into this collection, so the
        // bus drains without the collection lock held
        match operations {
            Some(operations) => operations.close(),
            None => Ok(()),
        }
    }

    fn name(&self) -> String {
        self.collection_name.clone()
    }
}
