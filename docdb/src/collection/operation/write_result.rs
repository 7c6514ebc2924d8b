use crate::collection::DocumentId;

/// Ids of the documents affected by a write, in the order they were written.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WriteResult {
    document_ids: Vec<DocumentId>,
}

impl WriteResult {
    pub fn new(document_ids: Vec<DocumentId>) -> Self {
        Self { document_ids }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn affected_document_ids(&self) -> &[DocumentId] {
        &self.document_ids
    }

    pub fn affected_count(&self) -> usize {
        self.document_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.document_ids.is_empty()
    }

    pub fn contains(&self, id: &DocumentId) -> bool {
        self.document_ids.contains(id)
    }
}

impl IntoIterator for WriteResult {
    type Item = DocumentId;
    type IntoIter = std::vec::IntoIter<DocumentId>;

    fn into_iter(self) -> Self::IntoIter {
        self.document_ids.into_iter()
    }
}
