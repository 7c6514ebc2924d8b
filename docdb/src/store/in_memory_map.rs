use crossbeam_skiplist::SkipMap;
use parking_lot::RwLock;
use std::ops::Bound::Excluded;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::collection::{Document, DocumentId};
use crate::common::{AttributeAware, Attributes};
use crate::errors::{DocDbError, DocDbResult, ErrorKind};
use crate::store::DocumentMapProvider;

/// A skip-list backed [`DocumentMapProvider`].
#[derive(Clone)]
pub struct InMemoryMap {
    inner: Arc<InMemoryMapInner>,
}

impl InMemoryMap {
    pub fn new(name: &str) -> Self {
        InMemoryMap {
            inner: Arc::new(InMemoryMapInner {
                name: name.to_string(),
                data: SkipMap::new(),
                attributes: RwLock::new(Attributes::new_for_collection(name)),
                closed: AtomicBool::new(false),
                dropped: AtomicBool::new(false),
            }),
        }
    }
}

struct InMemoryMapInner {
    name: String,
    data: SkipMap<DocumentId, Document>,
    attributes: RwLock<Attributes>,
    closed: AtomicBool,
    dropped: AtomicBool,
}

impl InMemoryMapInner {
    fn check_opened(&self) -> DocDbResult<()> {
        if self.dropped.load(Ordering::Acquire) {
            log::error!("Map {} has been dropped", self.name);
            return Err(DocDbError::new(
                &format!("map {} has been dropped", self.name),
                ErrorKind::StoreClosed,
            ));
        }
        if self.closed.load(Ordering::Acquire) {
            log::error!("Map {} is closed", self.name);
            return Err(DocDbError::new(
                &format!("map {} is closed", self.name),
                ErrorKind::StoreClosed,
            ));
        }
        Ok(())
    }
}

impl AttributeAware for InMemoryMap {
    fn attributes(&self) -> DocDbResult<Attributes> {
        self.inner.check_opened()?;
        Ok(self.inner.attributes.read().clone())
    }

    fn set_attributes(&self, attributes: Attributes) -> DocDbResult<()> {
        self.inner.check_opened()?;
        *self.inner.attributes.write() = attributes;
        Ok(())
    }
}

impl DocumentMapProvider for InMemoryMap {
    fn name(&self) -> &str {
        &self.inner.name
    }

    fn get(&self, key: &DocumentId) -> DocDbResult<Option<Document>> {
        self.inner.check_opened()?;
        Ok(self.inner.data.get(key).map(|entry| entry.value().clone()))
    }

    fn put(&self, key: DocumentId, document: Document) -> DocDbResult<()> {
        self.inner.check_opened()?;
        self.inner.data.insert(key, document);
        Ok(())
    }

    fn remove(&self, key: &DocumentId) -> DocDbResult<Option<Document>> {
        self.inner.check_opened()?;
        Ok(self.inner.data.remove(key).map(|entry| entry.value().clone()))
    }

    fn contains_key(&self, key: &DocumentId) -> DocDbResult<bool> {
        self.inner.check_opened()?;
        Ok(self.inner.data.contains_key(key))
    }

    fn higher_entry(&self, key: Option<&DocumentId>) -> DocDbResult<Option<(DocumentId, Document)>> {
        self.inner.check_opened()?;
        let entry = match key {
            None => self.inner.data.front(),
            Some(key) => self.inner.data.lower_bound(Excluded(key)),
        };
        Ok(entry.map(|e| (*e.key(), e.value().clone())))
    }

    fn values(&self) -> DocDbResult<Vec<Document>> {
        self.inner.check_opened()?;
        Ok(self.inner.data.iter().map(|e| e.value().clone()).collect())
    }

    fn keys(&self) -> DocDbResult<Vec<DocumentId>> {
        self.inner.check_opened()?;
        Ok(self.inner.data.iter().map(|e| *e.key()).collect())
    }

    fn size(&self) -> DocDbResult<u64> {
        self.inner.check_opened()?;
        Ok(self.inner.data.len() as u64)
    }

    fn clear(&self) -> DocDbResult<()> {
        self.inner.check_opened()?;
        self.inner.data.clear();
        Ok(())
    }

    fn close(&self) -> DocDbResult<()> {
        self.inner.closed.store(true, Ordering::Release);
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    fn dispose(&self) -> DocDbResult<()> {
        if self.inner.dropped.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        self.inner.data.clear();
        self.inner.closed.store(true, Ordering::Release);
        Ok(())
    }

    fn is_dropped(&self) -> bool {
        self.inner.dropped.load(Ordering::Acquire)
    }
}
