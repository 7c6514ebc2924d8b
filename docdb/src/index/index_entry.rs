use std::fmt::{Display, Formatter};

use crate::index::IndexType;

/// Definition of one index: the indexed field and the index kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct IndexEntry {
    field: String,
    index_type: IndexType,
}

impl IndexEntry {
    pub fn new(field: &str, index_type: IndexType) -> Self {
        IndexEntry {
            field: field.to_string(),
            index_type,
        }
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn index_type(&self) -> IndexType {
        self.index_type
    }
}

impl Display for IndexEntry {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} index on {}", self.index_type, self.field)
    }
}
