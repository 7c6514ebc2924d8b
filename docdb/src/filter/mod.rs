//! Document predicates used by find, update and remove.

mod filter;
mod fluent;

pub use filter::*;
pub use fluent::*;
