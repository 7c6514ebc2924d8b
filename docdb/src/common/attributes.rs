use indexmap::IndexMap;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

use crate::common::{get_current_time_or_zero, Value, CREATED_TIME, OWNER, UNIQUE_ID};
use crate::errors::DocDbResult;

/// Metadata attached to a collection.
///
/// Attributes are bookkeeping only: they are never indexed or queried, and
/// a transaction restores them by value when it rolls back.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Attributes {
    attributes: IndexMap<String, Value>,
}

impl Attributes {
    /// Creates attributes holding a creation time and a unique id.
    pub fn new() -> Self {
        let mut attributes = IndexMap::with_capacity(2);
        attributes.insert(
            CREATED_TIME.to_string(),
            Value::String(get_current_time_or_zero().to_string()),
        );
        attributes.insert(
            UNIQUE_ID.to_string(),
            Value::String(Uuid::new_v4().to_string()),
        );
        Attributes { attributes }
    }

    /// Creates attributes owned by `collection`.
    pub fn new_for_collection(collection: &str) -> Self {
        let mut attributes = IndexMap::with_capacity(3);
        attributes.insert(OWNER.to_string(), Value::String(collection.to_string()));
        attributes.insert(
            CREATED_TIME.to_string(),
            Value::String(get_current_time_or_zero().to_string()),
        );
        attributes.insert(
            UNIQUE_ID.to_string(),
            Value::String(Uuid::new_v4().to_string()),
        );
        Attributes { attributes }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    pub fn put(&mut self, key: &str, value: impl Into<Value>) {
        self.attributes.insert(key.to_string(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.attributes.shift_remove(key)
    }

    pub fn has_key(&self, key: &str) -> bool {
        self.attributes.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.attributes.iter()
    }
}

impl Default for Attributes {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for Attributes {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{{")?;
        for (i, (key, value)) in self.attributes.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}: {}", key, value)?;
        }
        write!(f, "}}")
    }
}

/// Implemented by anything that carries collection attributes.
pub trait AttributeAware {
    fn attributes(&self) -> DocDbResult<Attributes>;

    fn set_attributes(&self, attributes: Attributes) -> DocDbResult<()>;
}
