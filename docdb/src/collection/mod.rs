//! Collections and documents.
//!
//! A [`Document`] is an ordered map of field names to [`Value`](crate::common::Value)s.
//! Every stored document carries a [`DocumentId`] under `_id`, generated on
//! first access when absent.
//!
//! ```rust,ignore
//! use docdb::doc;
//! use docdb::filter::field;
//!
//! let users = db.collection("users")?;
//! users.insert(doc! { name: "Alice", address: { city: "Paris" } })?;
//! let parisians = users.find(field("address.city").eq("Paris"))?;
//! ```
//!
//! A [`DocDbCollection`] is either the live handle returned by
//! [`DocDb::collection`](crate::docdb::DocDb::collection) or the isolated
//! handle returned by a transaction. Both expose the same operations.

mod collection;
mod collection_factory;
mod cursor;
mod default_collection;
mod document;
mod document_id;
mod event;
pub(crate) mod operation;
pub(crate) mod snowflake;
mod update_options;

pub use collection::*;
pub(crate) use collection_factory::*;
pub use cursor::*;
pub use document::*;
pub use document_id::*;
pub use event::*;
pub use operation::WriteResult;
pub use update_options::*;
