//! The record store interface.

use crate::error::{ErrorKind, Result};
use crate::record::MatchRecord;
use async_trait::async_trait;
use regex::Regex;
use std::sync::{Arc, LazyLock};

// 3-63 characters; starts with a letter; letters, digits and underscores only.
static TABLE_NAME: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9_]{2,62}$").unwrap());

pub type StoreHandle = Arc<dyn RecordStore + Send + Sync>;

/// Outcome of asking the store to create a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableStatus {
    Created,
    AlreadyExists,
}

/// Append-only store of [`MatchRecord`]s, grouped into named tables.
///
/// # Examples
///
/// ```
/// use findit_records::{MatchRecord, RecordStore, error::Result};
///
/// async fn save(store: &dyn RecordStore, record: &MatchRecord) -> Result<()> {
///     store.create_table("SearchRuns").await?;
///     store.insert("SearchRuns", record).await
/// }
/// ```
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Create a table if it does not exist yet.
    ///
    /// An existing table is reported as [`TableStatus::AlreadyExists`]; any
    /// other failure is an error.
    async fn create_table(&self, table: &str) -> Result<TableStatus>;

    /// Insert one record.
    ///
    /// Fails with [`Conflict`](ErrorKind::Conflict) when the partition and row
    /// key are already taken (nothing is overwritten), and with
    /// [`TableNotFound`](ErrorKind::TableNotFound) when the table was never
    /// created.
    async fn insert(&self, table: &str, record: &MatchRecord) -> Result<()>;

    /// All records of a table, in insertion order.
    async fn list(&self, table: &str) -> Result<Vec<MatchRecord>>;
}

/// Validates a table name against the store's naming rules.
///
/// ```
/// use findit_records::validate_table_name;
/// assert!(validate_table_name("SearchResults").is_ok());
/// assert!(validate_table_name("1table").is_err());
/// ```
pub fn validate_table_name(name: &str) -> Result<&str> {
    if !TABLE_NAME.is_match(name) {
        exn::bail!(ErrorKind::InvalidTable(name.to_string()));
    }
    Ok(name)
}
