//! Backing maps and the in-memory store that owns them.

mod document_map;
mod in_memory_map;
mod in_memory_store;

pub use document_map::*;
pub use in_memory_map::*;
pub use in_memory_store::*;
