use itertools::Itertools;
use smallvec::SmallVec;
use std::collections::HashSet;
use std::sync::Arc;

use crate::collection::operation::WriteResult;
use crate::collection::{
    CollectionEventInfo, CollectionEventListener, CollectionEvents, Document, DocumentCursor,
    DocumentId, UpdateOptions,
};
use crate::common::{
    async_task, AttributeAware, Attributes, DocDbEventBus, SubscriberRef, Value, DOC_ID,
    INDEX_WORKER_PREFIX,
};
use crate::errors::{DocDbError, DocDbResult, ErrorKind};
use crate::filter::Filter;
use crate::index::{IndexCatalog, IndexEntry, IndexOptions, IndexStatus, IndexType};
use crate::store::{DocumentMap, InMemoryStore};

pub(crate) type CollectionEventBus = DocDbEventBus<CollectionEventInfo, CollectionEventListener>;

/// Performs reads and writes against one backing map and its index catalog.
///
/// The engine does no locking of its own; callers serialize writers. Index
/// definitions enforce their constraints on every write: a unique index
/// rejects a second document with the same non-null value, and a full-text
/// index only accepts string values.
#[derive(Clone)]
pub(crate) struct CollectionOperations {
    inner: Arc<CollectionOperationsInner>,
}

struct CollectionOperationsInner {
    collection_name: String,
    map: DocumentMap,
    catalog: IndexCatalog,
    store: InMemoryStore,
    event_bus: CollectionEventBus,
}

impl CollectionOperations {
    pub fn new(
        collection_name: &str,
        map: DocumentMap,
        store: InMemoryStore,
        event_bus: CollectionEventBus,
    ) -> DocDbResult<Self> {
        let catalog = store.index_catalog(collection_name)?;
        Ok(CollectionOperations {
            inner: Arc::new(CollectionOperationsInner {
                collection_name: collection_name.to_string(),
                map,
                catalog,
                store,
                event_bus,
            }),
        })
    }

    pub fn name(&self) -> &str {
        &self.inner.collection_name
    }

    pub fn map(&self) -> &DocumentMap {
        &self.inner.map
    }

    pub fn subscribe(&self, listener: CollectionEventListener) -> DocDbResult<SubscriberRef> {
        self.inner.event_bus.register(listener)
    }

    pub fn unsubscribe(&self, subscriber: SubscriberRef) -> DocDbResult<()> {
        self.inner.event_bus.deregister(subscriber)
    }

    /// Inserts a batch. Ids and index constraints are checked for the whole
    /// batch before the first document is written.
    pub fn insert_batch(&self, documents: Vec<Document>) -> DocDbResult<WriteResult> {
        if documents.is_empty() {
            return Ok(WriteResult::empty());
        }

        let mut seen = HashSet::with_capacity(documents.len());
        let mut prepared = Vec::with_capacity(documents.len());
        for mut document in documents {
            let id = document.id()?;
            if !seen.insert(id) || self.inner.map.contains_key(&id)? {
                log::error!(
                    "Document with id {} already exists in {}",
                    id,
                    self.inner.collection_name
                );
                return Err(DocDbError::new(
                    &format!(
                        "document with id {} already exists in {}",
                        id, self.inner.collection_name
                    ),
                    ErrorKind::UniqueConstraintViolation,
                ));
            }
            prepared.push((id, document));
        }

        self.validate_indexed_values(&prepared)?;

        let mut ids = Vec::with_capacity(prepared.len());
        for (id, document) in prepared {
            self.inner.map.put(id, document.clone())?;
            self.notify(CollectionEvents::Insert, || Value::Document(document));
            ids.push(id);
        }
        log::debug!("Inserted {} documents into {}", ids.len(), self.inner.collection_name);
        Ok(WriteResult::new(ids))
    }

    /// Merges `update` (minus its id) into every match, or into the first
    /// match when `just_once` is set. With `insert_if_absent` and no match,
    /// `update` itself is inserted.
    pub fn update(
        &self,
        filter: &Filter,
        update: &Document,
        options: &UpdateOptions,
    ) -> DocDbResult<WriteResult> {
        let matches = self.find_matching(filter, options.is_just_once())?;
        if matches.is_empty() {
            if options.is_insert_if_absent() {
                return self.insert_batch(vec![update.clone()]);
            }
            return Ok(WriteResult::empty());
        }

        let mut changes = update.clone();
        changes.remove(DOC_ID);

        let updated = matches
            .into_iter()
            .map(|(id, mut document)| {
                document.merge(&changes);
                (id, document)
            })
            .collect_vec();
        self.validate_indexed_values(&updated)?;

        let mut ids = Vec::with_capacity(updated.len());
        for (id, document) in updated {
            self.inner.map.put(id, document.clone())?;
            self.notify(CollectionEvents::Update, || Value::Document(document));
            ids.push(id);
        }
        Ok(WriteResult::new(ids))
    }

    pub fn remove(&self, filter: &Filter, just_once: bool) -> DocDbResult<WriteResult> {
        let matches = self.find_matching(filter, just_once)?;
        let mut ids = Vec::with_capacity(matches.len());
        for (id, _) in matches {
            if let Some(removed) = self.inner.map.remove(&id)? {
                self.notify(CollectionEvents::Remove, || Value::Document(removed));
                ids.push(id);
            }
        }
        Ok(WriteResult::new(ids))
    }

    pub fn remove_document(&self, document: &Document) -> DocDbResult<WriteResult> {
        let id = match document.id_value() {
            Some(id) => id,
            None => {
                log::error!("Document to remove does not have an id");
                return Err(DocDbError::new(
                    "remove operation failed as no id value found for the document",
                    ErrorKind::NotIdentifiable,
                ));
            }
        };

        match self.inner.map.remove(&id)? {
            Some(removed) => {
                self.notify(CollectionEvents::Remove, || Value::Document(removed));
                Ok(WriteResult::new(vec![id]))
            }
            None => Ok(WriteResult::empty()),
        }
    }

    pub fn find(&self, filter: Filter) -> DocDbResult<DocumentCursor> {
        Ok(DocumentCursor::new(self.inner.map.clone(), filter))
    }

    pub fn get_by_id(&self, id: &DocumentId) -> DocDbResult<Option<Document>> {
        self.inner.map.get(id)
    }

    /// Creates an index. A synchronous build validates existing documents
    /// before returning; an asynchronous one leaves the index building and
    /// drops it again if the background validation fails.
    pub fn create_index(&self, field: &str, options: &IndexOptions) -> DocDbResult<()> {
        if field.is_empty() {
            log::error!("Index field name cannot be empty");
            return Err(DocDbError::new(
                "index field name cannot be empty",
                ErrorKind::ValidationError,
            ));
        }

        let entry = IndexEntry::new(field, options.index_type());
        let generation = self.inner.catalog.add(entry.clone(), IndexStatus::Building)?;
        self.run_build(entry, generation, false, options.is_async())
    }

    /// Rebuilds an existing, ready index.
    pub fn rebuild_index(&self, field: &str, is_async: bool) -> DocDbResult<()> {
        let generation = self.inner.catalog.begin_rebuild(field)?;
        let entry = self.inner.catalog.find(field).ok_or_else(|| {
            log::error!("Index on {} vanished while starting its rebuild", field);
            DocDbError::new(
                &format!("{} is not indexed", field),
                ErrorKind::IndexingError,
            )
        })?;
        self.run_build(entry, generation, true, is_async)
    }

    pub fn find_index(&self, field: &str) -> Option<IndexEntry> {
        self.inner.catalog.find(field)
    }

    pub fn list_indexes(&self) -> Vec<IndexEntry> {
        self.inner.catalog.list()
    }

    pub fn has_index(&self, field: &str) -> bool {
        self.inner.catalog.has(field)
    }

    pub fn is_indexing(&self, field: &str) -> bool {
        self.inner.catalog.is_building(field)
    }

    pub fn drop_index(&self, field: &str) -> DocDbResult<()> {
        match self.inner.catalog.status(field) {
            None => {
                log::error!("{} is not indexed", field);
                Err(DocDbError::new(
                    &format!("{} is not indexed", field),
                    ErrorKind::IndexingError,
                ))
            }
            Some(IndexStatus::Building) => {
                log::error!("Cannot drop index on {} while it is being built", field);
                Err(DocDbError::new(
                    &format!("cannot drop index on {} while indexing is running", field),
                    ErrorKind::IndexingError,
                ))
            }
            Some(IndexStatus::Ready) => {
                self.inner.catalog.remove(field);
                Ok(())
            }
        }
    }

    pub fn drop_all_indexes(&self) -> DocDbResult<()> {
        let building = self
            .list_indexes()
            .into_iter()
            .filter(|entry| self.is_indexing(entry.field()))
            .map(|entry| entry.field().to_string())
            .join(", ");
        if !building.is_empty() {
            log::error!("Cannot drop indexes while indexing is running on {}", building);
            return Err(DocDbError::new(
                &format!("cannot drop indexes while indexing is running on {}", building),
                ErrorKind::IndexingError,
            ));
        }
        self.inner.catalog.clear();
        Ok(())
    }

    pub fn size(&self) -> DocDbResult<u64> {
        self.inner.map.size()
    }

    /// Removes every document. Index definitions are kept.
    pub fn clear(&self) -> DocDbResult<()> {
        self.inner.map.clear()
    }

    /// Drops the backing map and the index catalog from the store.
    pub fn dispose(&self) -> DocDbResult<()> {
        self.inner.catalog.clear();
        self.inner.store.remove_map(&self.inner.collection_name)?;
        log::debug!("Dropped collection {}", self.inner.collection_name);
        Ok(())
    }

    /// Shuts the event bus down after delivering what was already posted.
    pub fn close(&self) -> DocDbResult<()> {
        self.inner.event_bus.close()
    }

    fn run_build(
        &self,
        entry: IndexEntry,
        generation: u64,
        rebuild: bool,
        is_async: bool,
    ) -> DocDbResult<()> {
        if !is_async {
            return self.build_index(&entry, generation, rebuild);
        }

        let operations = self.clone();
        let task_name = format!("{}-{}", INDEX_WORKER_PREFIX, entry.field());
        let field = entry.field().to_string();
        let spawned = async_task(&task_name, move || {
            if operations.build_index(&entry, generation, rebuild).is_err() {
                log::warn!("Background build of index on {} failed", entry.field());
            }
        });

        if let Err(err) = spawned {
            self.abandon_build(&field, generation, rebuild);
            return Err(err);
        }
        Ok(())
    }

    fn build_index(&self, entry: &IndexEntry, generation: u64, rebuild: bool) -> DocDbResult<()> {
        self.notify(CollectionEvents::IndexStart, || Value::from(entry.field()));

        let result = self.inner.map.values().and_then(|documents| {
            verify_constraint(entry, std::iter::empty(), documents.iter())
        });
        match &result {
            Ok(()) => {
                self.inner.catalog.mark(entry.field(), IndexStatus::Ready, generation);
            }
            Err(err) => {
                log::error!("Failed to build {}: {}", entry, err);
                self.abandon_build(entry.field(), generation, rebuild);
            }
        }

        self.notify(CollectionEvents::IndexEnd, || Value::from(entry.field()));
        result
    }

    fn abandon_build(&self, field: &str, generation: u64, rebuild: bool) {
        if rebuild {
            self.inner.catalog.mark(field, IndexStatus::Ready, generation);
        } else {
            self.inner.catalog.remove_generation(field, generation);
        }
    }

    fn find_matching(
        &self,
        filter: &Filter,
        just_once: bool,
    ) -> DocDbResult<Vec<(DocumentId, Document)>> {
        if let Filter::ById(id) = filter {
            return Ok(self
                .inner
                .map
                .get(id)?
                .map(|document| vec![(*id, document)])
                .unwrap_or_default());
        }

        let mut matches = Vec::new();
        for document in self.find(filter.clone())? {
            let document = document?;
            if let Some(id) = document.id_value() {
                matches.push((id, document));
                if just_once {
                    break;
                }
            }
        }
        Ok(matches)
    }

    /// Checks `candidates` against every constrained index. Stored documents
    /// whose ids appear among the candidates are treated as replaced.
    fn validate_indexed_values(&self, candidates: &[(DocumentId, Document)]) -> DocDbResult<()> {
        let constrained: SmallVec<[IndexEntry; 4]> = self
            .inner
            .catalog
            .list()
            .into_iter()
            .filter(|entry| entry.index_type() != IndexType::NonUnique)
            .collect();
        if constrained.is_empty() {
            return Ok(());
        }

        let replaced: HashSet<DocumentId> = candidates.iter().map(|(id, _)| *id).collect();
        let stored = self.inner.map.values()?;
        let retained = stored
            .iter()
            .filter(|document| {
                document
                    .id_value()
                    .map(|id| !replaced.contains(&id))
                    .unwrap_or(true)
            })
            .collect_vec();

        for entry in constrained.iter() {
            verify_constraint(
                entry,
                retained.iter().copied(),
                candidates.iter().map(|(_, document)| document),
            )?;
        }
        Ok(())
    }

    fn notify(&self, event_type: CollectionEvents, item: impl FnOnce() -> Value) {
        if !self.inner.event_bus.has_listeners() {
            return;
        }
        let event = CollectionEventInfo::new(Some(item()), event_type, &self.inner.collection_name);
        if let Err(err) = self.inner.event_bus.post(event) {
            log::warn!("Failed to post {:?} event: {}", event_type, err);
        }
    }
}

/// Verifies that `incoming` documents may join `existing` under `entry`.
fn verify_constraint<'a>(
    entry: &IndexEntry,
    existing: impl Iterator<Item = &'a Document>,
    incoming: impl Iterator<Item = &'a Document>,
) -> DocDbResult<()> {
    match entry.index_type() {
        IndexType::NonUnique => Ok(()),
        IndexType::FullText => {
            for document in incoming {
                match document.get(entry.field()) {
                    None | Some(Value::Null) | Some(Value::String(_)) => {}
                    Some(value) => {
                        log::error!("Full-text index on {} cannot index {}", entry.field(), value);
                        return Err(DocDbError::new(
                            &format!(
                                "full-text index on {} requires string values, found {}",
                                entry.field(),
                                value
                            ),
                            ErrorKind::IndexingError,
                        ));
                    }
                }
            }
            Ok(())
        }
        IndexType::Unique => {
            let mut taken: Vec<&Value> = existing
                .filter_map(|document| document.get(entry.field()))
                .filter(|value| !value.is_null())
                .collect();

            for document in incoming {
                let value = match document.get(entry.field()) {
                    Some(value) if !value.is_null() => value,
                    _ => continue,
                };
                if taken.iter().any(|existing| existing.loosely_equals(value)) {
                    log::error!(
                        "Unique constraint violated for value {} on field {}",
                        value,
                        entry.field()
                    );
                    return Err(DocDbError::new(
                        &format!(
                            "unique constraint violated for value {} on field {}",
                            value,
                            entry.field()
                        ),
                        ErrorKind::UniqueConstraintViolation,
                    ));
                }
                taken.push(value);
            }
            Ok(())
        }
    }
}

impl AttributeAware for CollectionOperations {
    fn attributes(&self) -> DocDbResult<Attributes> {
        self.inner.map.attributes()
    }

    fn set_attributes(&self, attributes: Attributes) -> DocDbResult<()> {
        self.inner.map.set_attributes(attributes)
    }
}
