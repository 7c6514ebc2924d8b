use std::cmp::Ordering;
use std::fmt::{Display, Formatter};

use crate::collection::{Document, DocumentId};
use crate::common::{Value, DOC_ID};

/// A predicate over documents.
///
/// Filters are plain data so they can be cloned into journal entries,
/// compared and serialized. [`Filter::All`] is the match-everything
/// sentinel.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Filter {
    All,
    ById(DocumentId),
    Eq(String, Value),
    Ne(String, Value),
    Gt(String, Value),
    Gte(String, Value),
    Lt(String, Value),
    Lte(String, Value),
    In(String, Vec<Value>),
    And(Vec<Filter>),
    Or(Vec<Filter>),
    Not(Box<Filter>),
}

impl Filter {
    /// Returns `true` if `document` satisfies this filter.
    pub fn apply(&self, document: &Document) -> bool {
        match self {
            Filter::All => true,
            Filter::ById(id) => document.id_value() == Some(*id),
            Filter::Eq(field, value) => matches_value(document, field, |v| v.loosely_equals(value)),
            Filter::Ne(field, value) => !matches_value(document, field, |v| v.loosely_equals(value)),
            Filter::Gt(field, value) => compares(document, field, value, |o| o == Ordering::Greater),
            Filter::Gte(field, value) => compares(document, field, value, |o| o != Ordering::Less),
            Filter::Lt(field, value) => compares(document, field, value, |o| o == Ordering::Less),
            Filter::Lte(field, value) => compares(document, field, value, |o| o != Ordering::Greater),
            Filter::In(field, values) => {
                matches_value(document, field, |v| values.iter().any(|c| v.loosely_equals(c)))
            }
            Filter::And(filters) => filters.iter().all(|f| f.apply(document)),
            Filter::Or(filters) => filters.iter().any(|f| f.apply(document)),
            Filter::Not(filter) => !filter.apply(document),
        }
    }
}

fn matches_value(document: &Document, field: &str, predicate: impl Fn(&Value) -> bool) -> bool {
    match document.get(field) {
        Some(value) => predicate(value),
        None => predicate(&Value::Null),
    }
}

fn compares(
    document: &Document,
    field: &str,
    value: &Value,
    accept: impl Fn(Ordering) -> bool,
) -> bool {
    document.get(field)
        .and_then(|current| current.compare(value))
        .map(accept)
        .unwrap_or(false)
}

impl Display for Filter {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Filter::All => write!(f, "all"),
            Filter::ById(id) => write!(f, "({} == {})", DOC_ID, id),
            Filter::Eq(field, value) => write!(f, "({} == {})", field, value),
            Filter::Ne(field, value) => write!(f, "({} != {})", field, value),
            Filter::Gt(field, value) => write!(f, "({} > {})", field, value),
            Filter::Gte(field, value) => write!(f, "({} >= {})", field, value),
            Filter::Lt(field, value) => write!(f, "({} < {})", field, value),
            Filter::Lte(field, value) => write!(f, "({} <= {})", field, value),
            Filter::In(field, values) => write!(f, "({} in {})", field, Value::Array(values.clone())),
            Filter::And(filters) => write_joined(f, filters, " && "),
            Filter::Or(filters) => write_joined(f, filters, " || "),
            Filter::Not(filter) => write!(f, "!{}", filter),
        }
    }
}

fn write_joined(f: &mut Formatter<'_>, filters: &[Filter], separator: &str) -> std::fmt::Result {
    write!(f, "(")?;
    for (i, filter) in filters.iter().enumerate() {
        if i > 0 {
            write!(f, "{}", separator)?;
        }
        write!(f, "{}", filter)?;
    }
    write!(f, ")")
}

/// The match-everything filter.
pub fn all() -> Filter {
    Filter::All
}

pub fn by_id(id: DocumentId) -> Filter {
    Filter::ById(id)
}

pub fn and(filters: Vec<Filter>) -> Filter {
    Filter::And(filters)
}

pub fn or(filters: Vec<Filter>) -> Filter {
    Filter::Or(filters)
}

pub fn not(filter: Filter) -> Filter {
    Filter::Not(Box::new(filter))
}

pub fn is_all_filter(filter: &Filter) -> bool {
    matches!(filter, Filter::All)
}
