//! Index definitions and their per-collection catalog.

mod index_catalog;
mod index_entry;
mod options;

pub use index_catalog::*;
pub use index_entry::*;
pub use options::*;
