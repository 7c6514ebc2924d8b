mod collection_operations;
mod write_result;

pub(crate) use collection_operations::*;
pub use write_result::*;
