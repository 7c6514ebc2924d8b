use once_cell::sync::Lazy;
use std::fmt::{Debug, Display};

use crate::errors::{DocDbError, DocDbResult, ErrorKind};
use crate::ID_GENERATOR;

static MAX_VALUE: Lazy<u64> = Lazy::new(|| 10u64.pow(19));
static MIN_VALUE: Lazy<u64> = Lazy::new(|| 10u64.pow(18));

/// Identifier of a stored document.
///
/// Ids are totally ordered and, when generated, increase with creation time.
/// Valid ids are 19-digit numbers, in `[10^18, 10^19)`.
#[derive(PartialEq, Eq, Ord, PartialOrd, Hash, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DocumentId {
    id_value: u64,
}

impl DocumentId {
    /// Generates a new id.
    pub fn new() -> Self {
        DocumentId {
            id_value: ID_GENERATOR.get_id(),
        }
    }

    /// Wraps an existing id value after validating its range.
    pub fn create_id(id_value: u64) -> DocDbResult<DocumentId> {
        DocumentId::valid_id(id_value)?;
        Ok(DocumentId { id_value })
    }

    pub fn id_value(&self) -> u64 {
        self.id_value
    }

    pub(crate) fn valid_id(id_value: u64) -> DocDbResult<()> {
        if id_value >= *MAX_VALUE {
            log::error!("Id value {} is too large", id_value);
            return Err(DocDbError::new(
                &format!("id value must be less than 10^19, found {}", id_value),
                ErrorKind::InvalidId,
            ));
        }
        if id_value < *MIN_VALUE {
            log::error!("Id value {} is too small", id_value);
            return Err(DocDbError::new(
                &format!("id value must be at least 10^18, found {}", id_value),
                ErrorKind::InvalidId,
            ));
        }
        Ok(())
    }
}

impl Default for DocumentId {
    fn default() -> Self {
        DocumentId::new()
    }
}

impl Debug for DocumentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "DocumentId({})", self.id_value)
    }
}

impl Display for DocumentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.id_value)
    }
}
