use backtrace::Backtrace;
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use std::result::Result;

use crate::common::{atomic, Atomic};

/// Error kinds for DocDb operations.
///
/// Each kind names one failure category so callers can branch on the
/// category instead of parsing messages.
///
/// # Examples
///
/// ```rust,ignore
/// use docdb::errors::{DocDbError, ErrorKind, DocDbResult};
///
/// fn example() -> DocDbResult<()> {
///     Err(DocDbError::new("collection has been dropped", ErrorKind::StoreClosed))
/// }
/// ```
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum ErrorKind {
    // Lifecycle Errors
    /// The store is closed or the collection has been dropped or closed
    StoreClosed,
    /// The owning transaction or transactional collection has ended
    TransactionClosed,
    /// A commit drain failed and its applied effects were compensated
    TransactionFailed,

    // Identity Errors
    /// An identifier-requiring operation was given a document without one
    NotIdentifiable,
    /// The provided id is outside the valid range
    InvalidId,
    /// The requested resource was not found
    NotFound,

    // Operation Errors
    /// The request is structurally contradictory
    InvalidOperation,

    // Indexing Errors
    /// Rebuild or drop of a missing index, or of one still building
    IndexingError,
    /// An index already exists on the field
    IndexAlreadyExists,
    /// A unique index or the id space would hold a duplicate
    UniqueConstraintViolation,

    // Validation Errors
    /// A name, key or value failed validation
    ValidationError,
    /// Collection does not exist
    CollectionNotFound,

    // Event Errors
    /// Listener registration or dispatch failed
    EventError,

    // Encoding Errors
    /// Serialization of a document, filter or journal failed
    EncodingError,

    /// Internal error (usually indicates a bug)
    InternalError,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::StoreClosed => write!(f, "Store closed"),
            ErrorKind::TransactionClosed => write!(f, "Transaction closed"),
            ErrorKind::TransactionFailed => write!(f, "Transaction failed"),
            ErrorKind::NotIdentifiable => write!(f, "Not identifiable"),
            ErrorKind::InvalidId => write!(f, "Invalid ID"),
            ErrorKind::NotFound => write!(f, "Not found"),
            ErrorKind::InvalidOperation => write!(f, "Invalid operation"),
            ErrorKind::IndexingError => write!(f, "Indexing error"),
            ErrorKind::IndexAlreadyExists => write!(f, "Index already exists"),
            ErrorKind::UniqueConstraintViolation => write!(f, "Unique constraint violation"),
            ErrorKind::ValidationError => write!(f, "Validation error"),
            ErrorKind::CollectionNotFound => write!(f, "Collection not found"),
            ErrorKind::EventError => write!(f, "Event error"),
            ErrorKind::EncodingError => write!(f, "Encoding error"),
            ErrorKind::InternalError => write!(f, "Internal error"),
        }
    }
}

/// Custom DocDb error type.
///
/// `DocDbError` carries a message, a kind and an optional cause. The
/// backtrace is captured at construction and printed by `Debug` when
/// there is no cause to print instead.
///
/// # Examples
///
/// ```rust,ignore
/// use docdb::errors::{DocDbError, ErrorKind};
///
/// let cause = DocDbError::new("unique constraint violated", ErrorKind::UniqueConstraintViolation);
/// let err = DocDbError::new_with_cause("commit failed", ErrorKind::TransactionFailed, cause);
/// ```
#[derive(Clone)]
pub struct DocDbError {
    message: String,
    error_kind: ErrorKind,
    cause: Option<Box<DocDbError>>,
    backtrace: Atomic<Backtrace>,
}

impl DocDbError {
    /// Creates a new `DocDbError` with the specified message and error kind.
    pub fn new(message: &str, error_kind: ErrorKind) -> Self {
        DocDbError {
            message: message.to_string(),
            error_kind,
            cause: None,
            backtrace: atomic(Backtrace::new()),
        }
    }

    /// Creates a new `DocDbError` chained to the error that caused it.
    pub fn new_with_cause(message: &str, error_kind: ErrorKind, cause: DocDbError) -> Self {
        DocDbError {
            message: message.to_string(),
            error_kind,
            cause: Some(Box::new(cause)),
            backtrace: atomic(Backtrace::new()),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.error_kind
    }

    pub fn cause(&self) -> Option<&DocDbError> {
        self.cause.as_deref()
    }

    /// Returns the innermost error of the cause chain.
    pub fn root_cause(&self) -> &DocDbError {
        let mut current = self;
        while let Some(cause) = current.cause.as_deref() {
            current = cause;
        }
        current
    }
}

impl Display for DocDbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl Debug for DocDbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.cause {
            Some(cause) => write!(f, "{}\nCaused by: {:?}", self.message, cause),
            None => write!(f, "{}\n{:?}", self.message, self.backtrace.read()),
        }
    }
}

impl Error for DocDbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match &self.cause {
            Some(cause) => Some(cause.as_ref()),
            None => None,
        }
    }
}

/// `DocDbResult<T>` is shorthand for `Result<T, DocDbError>`.
pub type DocDbResult<T> = Result<T, DocDbError>;

#[cfg(feature = "serde")]
impl serde::de::Error for DocDbError {
    fn custom<T: Display>(msg: T) -> Self {
        DocDbError::new(&msg.to_string(), ErrorKind::EncodingError)
    }
}

#[cfg(feature = "serde")]
impl serde::ser::Error for DocDbError {
    fn custom<T: Display>(msg: T) -> Self {
        DocDbError::new(&msg.to_string(), ErrorKind::EncodingError)
    }
}

impl From<std::io::Error> for DocDbError {
    fn from(err: std::io::Error) -> Self {
        DocDbError::new(&format!("IO error: {}", err), ErrorKind::InternalError)
    }
}

impl From<String> for DocDbError {
    fn from(msg: String) -> Self {
        DocDbError::new(&msg, ErrorKind::InternalError)
    }
}

impl From<&str> for DocDbError {
    fn from(msg: &str) -> Self {
        DocDbError::new(msg, ErrorKind::InternalError)
    }
}
