use std::sync::atomic::{AtomicBool, Ordering};

use super::{JournalEntry, TransactionContext};
use crate::collection::operation::{CollectionEventBus, CollectionOperations, WriteResult};
use crate::collection::{
    CollectionEventListener, DocDbCollection, DocDbCollectionProvider, Document, DocumentCursor,
    DocumentId, UpdateOptions,
};
use crate::common::{
    create_unique_filter, AttributeAware, Attributes, EventAware, LockHandle, SubscriberRef,
};
use crate::errors::{DocDbError, DocDbResult, ErrorKind};
use crate::filter::{by_id, is_all_filter, Filter};
use crate::index::{IndexEntry, IndexOptions};
use crate::store::InMemoryStore;

/// A collection handle inside a transaction.
///
/// Reads and writes run at once against the transaction's isolated copy of
/// the collection, so the transaction sees its own writes. Each successful
/// write also appends one journal entry; nothing reaches the live
/// collection before commit. The handle guards its copy with a private
/// lock and never takes the live collection's lock.
pub(crate) struct TransactionalCollection {
    primary: DocDbCollection,
    context: TransactionContext,
    operations: CollectionOperations,
    lock_handle: LockHandle,
    dropped: AtomicBool,
    closed: AtomicBool,
}

impl TransactionalCollection {
    pub fn new(
        primary: DocDbCollection,
        context: TransactionContext,
        transaction_store: &InMemoryStore,
    ) -> DocDbResult<Self> {
        let event_bus = CollectionEventBus::new(context.config().event_queue_capacity());
        let operations = CollectionOperations::new(
            context.collection_name(),
            context.transaction_map().clone(),
            transaction_store.clone(),
            event_bus,
        )?;

        Ok(TransactionalCollection {
            primary,
            context,
            operations,
            lock_handle: LockHandle::new(),
            dropped: AtomicBool::new(false),
            closed: AtomicBool::new(false),
        })
    }

    fn check_opened(&self) -> DocDbResult<()> {
        if self.dropped.load(Ordering::Acquire) {
            log::error!("Collection {} has been dropped in this transaction", self.context.collection_name());
            return Err(DocDbError::new(
                "collection has been dropped",
                ErrorKind::StoreClosed,
            ));
        }

        if self.closed.load(Ordering::Acquire) {
            log::error!("Transactional collection {} is closed", self.context.collection_name());
            return Err(DocDbError::new(
                "collection is closed",
                ErrorKind::TransactionClosed,
            ));
        }

        if !self.primary.is_open() {
            log::error!("Collection {} is not open", self.context.collection_name());
            return Err(DocDbError::new(
                "store is closed",
                ErrorKind::TransactionClosed,
            ));
        }

        if !self.context.is_active() {
            log::error!("Transaction on {} is closed", self.context.collection_name());
            return Err(DocDbError::new(
                "transaction is closed",
                ErrorKind::TransactionClosed,
            ));
        }
        Ok(())
    }

    /// Runs `mutate` on the isolated copy under the write lock, then journals
    /// `entry`.
    ///
    /// A failed mutation journals nothing. When the mutation succeeds but the
    /// journal refuses the entry, the isolated copy and the journal disagree;
    /// the context is marked poisoned and the transaction can no longer
    /// commit.
    fn apply<R>(
        &self,
        mutate: impl FnOnce(&CollectionOperations) -> DocDbResult<R>,
        entry: JournalEntry,
    ) -> DocDbResult<R> {
        let _guard = self.lock_handle.write();
        let result = mutate(&self.operations)?;
        if let Err(err) = self.context.add_entry(entry) {
            log::error!(
                "Write on {} was applied but not journaled, transaction is poisoned",
                self.context.collection_name()
            );
            self.context.mark_poisoned();
            return Err(err);
        }
        Ok(result)
    }
}

impl EventAware for TransactionalCollection {
    fn subscribe(&self, listener: CollectionEventListener) -> DocDbResult<SubscriberRef> {
        self.check_opened()?;
        let _guard = self.lock_handle.write();
        self.operations.subscribe(listener)
    }

    fn unsubscribe(&self, subscriber: SubscriberRef) -> DocDbResult<()> {
        self.check_opened()?;
        let _guard = self.lock_handle.write();
        self.operations.unsubscribe(subscriber)
    }
}

impl AttributeAware for TransactionalCollection {
    fn attributes(&self) -> DocDbResult<Attributes> {
        self.check_opened()?;
        let _guard = self.lock_handle.read();
        self.operations.attributes()
    }

    fn set_attributes(&self, attributes: Attributes) -> DocDbResult<()> {
        self.check_opened()?;
        let journaled = attributes.clone();
        self.apply(
            move |operations| operations.set_attributes(attributes),
            JournalEntry::SetAttributes {
                attributes: journaled,
            },
        )
    }
}

impl DocDbCollectionProvider for TransactionalCollection {
    fn insert_many(&self, documents: Vec<Document>) -> DocDbResult<WriteResult> {
        self.check_opened()?;

        let mut documents = documents;
        for document in documents.iter_mut() {
            document.id()?;
        }

        let journaled = documents.clone();
        self.apply(
            move |operations| operations.insert_batch(documents),
            JournalEntry::Insert {
                documents: journaled,
            },
        )
    }

    fn update_with_options(
        &self,
        filter: Filter,
        update: &Document,
        update_options: &UpdateOptions,
    ) -> DocDbResult<WriteResult> {
        self.check_opened()?;

        // an upserted document gets the same id here and on the live collection
        let mut update = update.clone();
        if update_options.is_insert_if_absent() {
            update.id()?;
        }

        self.apply(
            |operations| operations.update(&filter, &update, update_options),
            JournalEntry::Update {
                filter: filter.clone(),
                update: update.clone(),
                options: *update_options,
            },
        )
    }

    fn update_one(&self, document: &Document, insert_if_absent: bool) -> DocDbResult<WriteResult> {
        self.check_opened()?;

        let mut update = document.clone();
        let filter = if insert_if_absent {
            let filter = create_unique_filter(&mut update)?;
            update.id()?;
            filter
        } else {
            match update.id_value() {
                Some(id) => by_id(id),
                None => {
                    log::error!("Document to update does not have an id");
                    return Err(DocDbError::new(
                        "update operation failed as no id value found for the document",
                        ErrorKind::NotIdentifiable,
                    ));
                }
            }
        };

        let options = UpdateOptions::new(insert_if_absent, false);
        self.apply(
            |operations| operations.update(&filter, &update, &options),
            JournalEntry::Update {
                filter: filter.clone(),
                update: update.clone(),
                options,
            },
        )
    }

    fn remove(&self, filter: Filter, just_once: bool) -> DocDbResult<WriteResult> {
        self.check_opened()?;
        if just_once && is_all_filter(&filter) {
            log::error!("Remove all cannot be combined with just once");
            return Err(DocDbError::new(
                "remove all cannot be combined with just once",
                ErrorKind::InvalidOperation,
            ));
        }

        self.apply(
            |operations| operations.remove(&filter, just_once),
            JournalEntry::Remove {
                filter: filter.clone(),
                just_once,
            },
        )
    }

    fn remove_one(&self, document: &Document) -> DocDbResult<WriteResult> {
        self.check_opened()?;
        if !document.has_id() {
            log::error!("Document to remove does not have an id");
            return Err(DocDbError::new(
                "remove operation failed as no id value found for the document",
                ErrorKind::NotIdentifiable,
            ));
        }

        self.apply(
            |operations| operations.remove_document(document),
            JournalEntry::RemoveDocument {
                document: document.clone(),
            },
        )
    }

    fn find(&self, filter: Filter) -> DocDbResult<DocumentCursor> {
        self.check_opened()?;
        let _guard = self.lock_handle.read();
        self.operations.find(filter)
    }

    fn get_by_id(&self, id: &DocumentId) -> DocDbResult<Option<Document>> {
        self.check_opened()?;
        let _guard = self.lock_handle.read();
        self.operations.get_by_id(id)
    }

    fn create_index(&self, field: &str, index_options: &IndexOptions) -> DocDbResult<()> {
        self.check_opened()?;
        self.apply(
            |operations| operations.create_index(field, index_options),
            JournalEntry::CreateIndex {
                field: field.to_string(),
                options: *index_options,
            },
        )
    }

    fn rebuild_index(&self, field: &str, is_async: bool) -> DocDbResult<()> {
        self.check_opened()?;
        self.apply(
            |operations| operations.rebuild_index(field, is_async),
            JournalEntry::RebuildIndex {
                field: field.to_string(),
                is_async,
            },
        )
    }

    fn list_indexes(&self) -> DocDbResult<Vec<IndexEntry>> {
        self.check_opened()?;
        let _guard = self.lock_handle.read();
        Ok(self.operations.list_indexes())
    }

    fn has_index(&self, field: &str) -> DocDbResult<bool> {
        self.check_opened()?;
        let _guard = self.lock_handle.read();
        Ok(self.operations.has_index(field))
    }

    fn is_indexing(&self, field: &str) -> DocDbResult<bool> {
        self.check_opened()?;
        let _guard = self.lock_handle.read();
        Ok(self.operations.is_indexing(field))
    }

    fn drop_index(&self, field: &str) -> DocDbResult<()> {
        self.check_opened()?;
        self.apply(
            |operations| operations.drop_index(field),
            JournalEntry::DropIndex {
                field: field.to_string(),
            },
        )
    }

    fn drop_all_indexes(&self) -> DocDbResult<()> {
        self.check_opened()?;
        self.apply(
            |operations| operations.drop_all_indexes(),
            JournalEntry::DropAllIndexes,
        )
    }

    fn clear(&self) -> DocDbResult<()> {
        self.check_opened()?;
        self.apply(|operations| operations.clear(), JournalEntry::Clear)
    }

    fn dispose(&self) -> DocDbResult<()> {
        self.check_opened()?;
        self.apply(|operations| operations.dispose(), JournalEntry::DropCollection)?;
        // the handle stays registered; the transaction closes it on release
        self.dropped.store(true, Ordering::Release);
        Ok(())
    }

    fn is_dropped(&self) -> bool {
        self.dropped.load(Ordering::Acquire)
    }

    fn is_open(&self) -> bool {
        !self.closed.load(Ordering::Acquire)
            && !self.dropped.load(Ordering::Acquire)
            && self.context.is_active()
            && self.primary.is_open()
    }

    fn size(&self) -> DocDbResult<u64> {
        self.check_opened()?;
        let _guard = self.lock_handle.read();
        self.operations.size()
    }

    fn close(&self) -> DocDbResult<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        self.operations.close()
    }

    fn name(&self) -> String {
        self.context.collection_name().to_string()
    }
}
