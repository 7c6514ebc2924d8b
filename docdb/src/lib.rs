//! # DocDb - Embedded Document Database Core
//!
//! DocDb stores schemaless documents in named collections and lets
//! application code group changes into journaled transactions.
//!
//! ## Key Features
//!
//! - **Collections**: insert, update, remove and filtered queries over ordered documents
//! - **Indexes**: unique, non-unique and full-text index definitions, built synchronously or in the background
//! - **Locking**: one read-write lock per collection name, shared by every handle of that name
//! - **Transactions**: isolated read-your-writes collections whose journal replays onto the database at commit
//! - **Events**: per-listener queues delivering change notifications off the writer's thread
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use docdb::docdb::DocDb;
//! use docdb::doc;
//! use docdb::filter::field;
//!
//! let db = DocDb::builder().open_or_create()?;
//! let users = db.collection("users")?;
//! users.insert(doc! { name: "Alice", age: 30 })?;
//!
//! let adults = users.find(field("age").gte(18))?.to_list()?;
//!
//! let session = db.create_session()?;
//! let transaction = session.begin_transaction()?;
//! transaction.collection("users")?.insert(doc! { name: "Bob", age: 25 })?;
//! transaction.commit()?;
//! db.close()?;
//! ```
//!
//! ## Module Organization
//!
//! - [`collection`] - Documents, collections, cursors and change events
//! - [`common`] - Values, attributes, locks, the event bus and helpers
//! - [`errors`] - Error types and result definitions
//! - [`filter`] - Query filters
//! - [`index`] - Index definitions and options
//! - [`store`] - Backing maps and the in-memory store
//! - [`transaction`] - Sessions, transactions and the journal
//! - [`docdb`] - The database handle
//! - [`docdb_builder`] - Database builder
//! - [`docdb_config`] - Database configuration

use crate::collection::snowflake::SnowflakeIdGenerator;
use std::sync::LazyLock;

pub mod collection;
pub mod common;
pub mod docdb;
pub mod docdb_builder;
pub mod docdb_config;
pub mod errors;
pub mod filter;
pub mod index;
pub mod store;
pub mod transaction;

pub(crate) static ID_GENERATOR: LazyLock<SnowflakeIdGenerator> =
    LazyLock::new(SnowflakeIdGenerator::new);
