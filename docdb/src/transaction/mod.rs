//! Journaled transactions.
//!
//! A [`Session`] starts [`DocDbTransaction`]s. Each transaction keeps an
//! isolated copy of every collection it touches and a [`Journal`] of the
//! operations issued against it. Commit replays the journals onto the
//! database; a failing replay is compensated entry by entry, newest first.

mod context;
mod core;
mod docdb_transaction;
mod session;
mod transactional_collection;

pub use self::core::*;
pub use context::*;
pub use docdb_transaction::*;
pub use session::*;
