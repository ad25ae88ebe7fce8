//! Append-only keyed record store for match results.
//!
//! Every confirmed match becomes one [`MatchRecord`], addressed by a
//! partition key and a row key that is unique within its logical table.
//! Records are only ever inserted and listed; findit never updates or deletes
//! them.
//!
//! # Architecture
//! - [`RecordStore`] is the seam the scanner writes through.
//! - [`Repository`] implements it on top of a SQLite [`Database`], where each
//!   logical table is a row in a registry and records reference it.
//! - `MockStore` (feature `mock`) implements it in memory, with injectable
//!   failures, for tests in other crates.

mod db;
pub mod error;
#[cfg(feature = "mock")]
mod mock;
mod models;
mod record;
mod repo;
mod store;

pub use crate::db::Database;
#[cfg(feature = "mock")]
pub use crate::mock::MockStore;
pub use crate::record::{MAX_MATCH_CHARS, MatchRecord, PARTITION_KEY, truncate_chars};
pub use crate::repo::Repository;
pub use crate::store::{RecordStore, StoreHandle, TableStatus, validate_table_name};
