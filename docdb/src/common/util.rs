use parking_lot::RwLock;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::collection::Document;
use crate::common::{DOC_ID, INTERNAL_NAME_SEPARATOR, RESERVED_FIELDS};
use crate::errors::{DocDbError, DocDbResult, ErrorKind};
use crate::filter::{and, by_id, field, Filter};

pub type Atomic<T> = Arc<RwLock<T>>;

#[inline]
pub fn atomic<T>(t: T) -> Atomic<T> {
    Arc::new(RwLock::new(t))
}

/// Milliseconds since the unix epoch, or zero if the clock is before it.
pub fn get_current_time_or_zero() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0)
}

/// Runs `op` on a new named thread.
pub fn async_task<OP>(name: &str, op: OP) -> DocDbResult<()>
where
    OP: FnOnce() + Send + 'static,
{
    std::thread::Builder::new()
        .name(name.to_string())
        .spawn(op)
        .map(|_| ())
        .map_err(|err| {
            log::error!("Failed to spawn task {}: {}", name, err);
            DocDbError::new(
                &format!("failed to spawn task {}: {}", name, err),
                ErrorKind::InternalError,
            )
        })
}

/// Builds a filter identifying `document`.
///
/// A document carrying an id is matched by that id. Otherwise it is matched
/// by equality on each of its own non-reserved fields. An empty document
/// without an id gets a fresh id and is matched by it.
pub fn create_unique_filter(document: &mut Document) -> DocDbResult<Filter> {
    if let Some(id) = document.id_value() {
        return Ok(by_id(id));
    }

    let mut filters: Vec<Filter> = document
        .iter()
        .filter(|(key, _)| !RESERVED_FIELDS.contains(&key.as_str()))
        .map(|(key, value)| field(key).eq(value.clone()))
        .collect();

    match filters.len() {
        0 => Ok(by_id(document.id()?)),
        1 => Ok(filters.remove(0)),
        _ => Ok(and(filters)),
    }
}

/// Validates a collection name.
pub fn validate_collection_name(name: &str) -> DocDbResult<()> {
    if name.trim().is_empty() {
        log::error!("Collection name cannot be empty");
        return Err(DocDbError::new(
            "collection name cannot be empty",
            ErrorKind::ValidationError,
        ));
    }

    if name.contains(INTERNAL_NAME_SEPARATOR) || name == DOC_ID {
        log::error!("Collection name {} is reserved", name);
        return Err(DocDbError::new(
            &format!("collection name {} is not allowed", name),
            ErrorKind::ValidationError,
        ));
    }
    Ok(())
}
