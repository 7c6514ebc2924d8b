use crate::collection::{Document, DocumentId};
use crate::errors::DocDbResult;
use crate::filter::Filter;
use crate::store::DocumentMap;

/// A lazy, restartable sequence of the documents matching a filter.
///
/// The cursor walks the backing map in id order, one entry at a time, so a
/// document written after the cursor passed its position is not seen until
/// the cursor is [reset](DocumentCursor::reset). `size`, `first` and
/// `to_list` each run a fresh scan and leave the iteration position alone.
pub struct DocumentCursor {
    map: DocumentMap,
    filter: Filter,
    position: Option<DocumentId>,
    exhausted: bool,
}

impl DocumentCursor {
    pub(crate) fn new(map: DocumentMap, filter: Filter) -> Self {
        DocumentCursor {
            map,
            filter,
            position: None,
            exhausted: false,
        }
    }

    /// Restarts iteration from the first document.
    pub fn reset(&mut self) {
        self.position = None;
        self.exhausted = false;
    }

    pub fn size(&self) -> DocDbResult<usize> {
        let mut count = 0;
        for document in self.fresh() {
            document?;
            count += 1;
        }
        Ok(count)
    }

    pub fn is_empty(&self) -> DocDbResult<bool> {
        Ok(self.first()?.is_none())
    }

    pub fn first(&self) -> DocDbResult<Option<Document>> {
        self.fresh().next().transpose()
    }

    pub fn to_list(&self) -> DocDbResult<Vec<Document>> {
        self.fresh().collect()
    }

    pub fn filter(&self) -> &Filter {
        &self.filter
    }

    fn fresh(&self) -> DocumentCursor {
        DocumentCursor::new(self.map.clone(), self.filter.clone())
    }
}

impl Iterator for DocumentCursor {
    type Item = DocDbResult<Document>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.exhausted {
            match self.map.higher_entry(self.position.as_ref()) {
                Ok(Some((id, document))) => {
                    self.position = Some(id);
                    if self.filter.apply(&document) {
                        return Some(Ok(document));
                    }
                }
                Ok(None) => self.exhausted = true,
                Err(err) => {
                    self.exhausted = true;
                    return Some(Err(err));
                }
            }
        }
        None
    }
}
