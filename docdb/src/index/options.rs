use std::fmt::{Display, Formatter};

/// Kind of secondary index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum IndexType {
    Unique,
    NonUnique,
    FullText,
}

impl Display for IndexType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            IndexType::Unique => write!(f, "unique"),
            IndexType::NonUnique => write!(f, "non-unique"),
            IndexType::FullText => write!(f, "full-text"),
        }
    }
}

/// How an index is created.
///
/// The default is a unique index built synchronously. An asynchronous
/// build returns at once and leaves the index in building status until the
/// background build finishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct IndexOptions {
    index_type: IndexType,
    is_async: bool,
}

impl IndexOptions {
    pub fn new(index_type: IndexType) -> IndexOptions {
        IndexOptions {
            index_type,
            is_async: false,
        }
    }

    pub fn index_type(&self) -> IndexType {
        self.index_type
    }

    pub fn is_async(&self) -> bool {
        self.is_async
    }

    pub fn build_async(mut self, is_async: bool) -> IndexOptions {
        self.is_async = is_async;
        self
    }
}

impl Default for IndexOptions {
    fn default() -> Self {
        IndexOptions::new(IndexType::Unique)
    }
}

pub fn unique_index() -> IndexOptions {
    IndexOptions::new(IndexType::Unique)
}

pub fn non_unique_index() -> IndexOptions {
    IndexOptions::new(IndexType::NonUnique)
}

pub fn full_text_index() -> IndexOptions {
    IndexOptions::new(IndexType::FullText)
}
