use indexmap::IndexMap;
use std::fmt::{Display, Formatter};

use crate::collection::DocumentId;
use crate::common::{Value, DOC_ID, RESERVED_FIELDS};
use crate::errors::{DocDbError, DocDbResult, ErrorKind};

const FIELD_SEPARATOR: char = '.';

/// An ordered map of field names to values.
///
/// Field order is insertion order. Lookups accept dotted paths
/// (`address.city`) that walk into nested documents.
///
/// ```rust,ignore
/// use docdb::doc;
///
/// let mut doc = doc! { name: "Alice", address: { city: "Paris" } };
/// assert_eq!(doc.get("address.city"), Some(&Value::from("Paris")));
/// let id = doc.id()?;
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Document {
    data: IndexMap<String, Value>,
}

impl Document {
    pub fn new() -> Self {
        Document {
            data: IndexMap::new(),
        }
    }

    /// Puts a value under `key`, replacing any previous value.
    ///
    /// The `_id` field only accepts an id value.
    pub fn put<T: Into<Value>>(&mut self, key: &str, value: T) -> DocDbResult<()> {
        if key.is_empty() {
            log::error!("Document does not support empty key");
            return Err(DocDbError::new(
                "document does not support empty key",
                ErrorKind::ValidationError,
            ));
        }

        let value = value.into();
        if key == DOC_ID && !matches!(value, Value::Id(_)) {
            log::error!("Field {} only accepts an id value, found {}", DOC_ID, value);
            return Err(DocDbError::new(
                &format!("{} field only accepts an id value", DOC_ID),
                ErrorKind::InvalidId,
            ));
        }

        self.data.insert(key.to_string(), value);
        Ok(())
    }

    /// Gets the value at `key`, following dotted paths into nested documents.
    pub fn get(&self, key: &str) -> Option<&Value> {
        if let Some(value) = self.data.get(key) {
            return Some(value);
        }

        let (head, rest) = key.split_once(FIELD_SEPARATOR)?;
        match self.data.get(head)? {
            Value::Document(nested) => nested.get(rest),
            _ => None,
        }
    }

    /// Returns the document id, generating and storing one if absent.
    pub fn id(&mut self) -> DocDbResult<DocumentId> {
        if let Some(id) = self.id_value() {
            return Ok(id);
        }
        let id = DocumentId::new();
        self.data.insert(DOC_ID.to_string(), Value::Id(id));
        Ok(id)
    }

    /// Returns the document id without generating one.
    pub fn id_value(&self) -> Option<DocumentId> {
        self.data.get(DOC_ID).and_then(Value::as_id)
    }

    pub fn has_id(&self) -> bool {
        self.id_value().is_some()
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.data.shift_remove(key)
    }

    /// Merges `other` into this document.
    ///
    /// Nested documents present on both sides are merged recursively; every
    /// other field of `other` overwrites the field here.
    pub fn merge(&mut self, other: &Document) {
        for (key, value) in other.data.iter() {
            match (self.data.get_mut(key), value) {
                (Some(Value::Document(existing)), Value::Document(incoming)) => {
                    existing.merge(incoming);
                }
                _ => {
                    self.data.insert(key.clone(), value.clone());
                }
            }
        }
    }

    /// Top-level field names that are not reserved.
    pub fn fields(&self) -> Vec<String> {
        self.data
            .keys()
            .filter(|key| !RESERVED_FIELDS.contains(&key.as_str()))
            .cloned()
            .collect()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.data.iter()
    }
}

impl Display for Document {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{{")?;
        for (i, (key, value)) in self.data.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}: {}", key, value)?;
        }
        write!(f, "}}")
    }
}

#[doc(hidden)]
pub fn normalize(key: &str) -> String {
    key.trim_matches('"').to_string()
}

/// Builds a [`Document`] from `key: value` pairs.
///
/// Keys may be identifiers or string literals. Values may be expressions,
/// nested `{ ... }` documents or `[ ... ]` arrays.
///
/// ```rust,ignore
/// let doc = doc! { name: "Alice", "first-name": "A", tags: ["x", "y"], address: { city: "Paris" } };
/// ```
#[macro_export]
macro_rules! doc {
    () => {
        $crate::collection::Document::new()
    };

    ($($key:tt : $value:tt),* $(,)?) => {
        {
            let mut doc = $crate::collection::Document::new();
            $(
                doc.put(&$crate::collection::normalize(stringify!($key)), $crate::doc_value!($value))
                    .expect(&format!("Failed to put value {} in document", stringify!($value)));
            )*
            doc
        }
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! doc_value {
    ({ $($key:tt : $value:tt),* $(,)? }) => {
        $crate::common::Value::Document($crate::doc!{ $($key : $value),* })
    };

    ([ $($value:tt),* $(,)? ]) => {
        $crate::common::Value::Array(vec![$($crate::doc_value!($value)),*])
    };

    ($value:expr) => {
        $crate::common::Value::from($value)
    };
}
