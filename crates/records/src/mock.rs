//! In-memory record store for testing.

use crate::error::{ErrorKind, Result};
use crate::record::MatchRecord;
use crate::store::{RecordStore, TableStatus, validate_table_name};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashSet};
use tokio::sync::RwLock;

type Predicate = Box<dyn Fn(&MatchRecord) -> bool + Send + Sync>;

#[derive(Default)]
struct Table {
    keys: HashSet<(String, String)>,
    records: Vec<MatchRecord>,
}

/// In-memory record store for testing.
///
/// Behaves like the SQLite [`Repository`](crate::Repository): tables must be
/// created before use, keys are unique per table, and listings come back in
/// insertion order. Inserts can be made to fail on demand, and the whole store
/// can be made unavailable.
///
/// # Examples
///
/// ```
/// use findit_records::{MatchRecord, MockStore, RecordStore};
/// use time::OffsetDateTime;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let store = MockStore::default().fail_inserts_when(|r| r.blob == "bad.txt");
/// store.create_table("Results").await?;
///
/// let ok = MatchRecord::new("good.txt_1.0", OffsetDateTime::UNIX_EPOCH, "good.txt", "q", "q");
/// let bad = MatchRecord::new("bad.txt_1.0", OffsetDateTime::UNIX_EPOCH, "bad.txt", "q", "q");
/// assert!(store.insert("Results", &ok).await.is_ok());
/// assert!(store.insert("Results", &bad).await.is_err());
/// assert_eq!(store.list("Results").await?.len(), 1);
/// # Ok(())
/// # }
/// ```
#[derive(Default)]
pub struct MockStore {
    tables: RwLock<BTreeMap<String, Table>>,
    fail_insert: Option<Predicate>,
    unavailable: bool,
}

impl MockStore {
    /// Make every insert matching `predicate` fail with a database error.
    pub fn fail_inserts_when(mut self, predicate: impl Fn(&MatchRecord) -> bool + Send + Sync + 'static) -> Self {
        self.fail_insert = Some(Box::new(predicate));
        self
    }

    /// Make every operation fail, as if the store could not be reached.
    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::default()
        }
    }

    /// Every record of a table, or nothing if the table does not exist.
    ///
    /// Unlike [`RecordStore::list`] this never fails, which keeps assertions
    /// short.
    pub async fn records(&self, table: &str) -> Vec<MatchRecord> {
        let tables = self.tables.read().await;
        tables.get(table).map(|t| t.records.clone()).unwrap_or_default()
    }

    fn check_available(&self) -> Result<()> {
        if self.unavailable {
            exn::bail!(ErrorKind::Database);
        }
        Ok(())
    }
}

#[async_trait]
impl RecordStore for MockStore {
    async fn create_table(&self, table: &str) -> Result<TableStatus> {
        self.check_available()?;
        let table = validate_table_name(table)?;
        let mut tables = self.tables.write().await;
        if tables.contains_key(table) {
            return Ok(TableStatus::AlreadyExists);
        }
        tables.insert(table.to_string(), Table::default());
        Ok(TableStatus::Created)
    }

    async fn insert(&self, table: &str, record: &MatchRecord) -> Result<()> {
        self.check_available()?;
        if self.fail_insert.as_ref().is_some_and(|fail| fail(record)) {
            exn::bail!(ErrorKind::Database);
        }
        let mut tables = self.tables.write().await;
        let Some(entries) = tables.get_mut(table) else {
            exn::bail!(ErrorKind::TableNotFound(table.to_string()));
        };
        let key = (record.partition_key.clone(), record.row_key.clone());
        if !entries.keys.insert(key) {
            exn::bail!(ErrorKind::Conflict(record.row_key.clone()));
        }
        entries.records.push(record.clone());
        Ok(())
    }

    async fn list(&self, table: &str) -> Result<Vec<MatchRecord>> {
        self.check_available()?;
        let tables = self.tables.read().await;
        match tables.get(table) {
            Some(entries) => Ok(entries.records.clone()),
            None => exn::bail!(ErrorKind::TableNotFound(table.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::OffsetDateTime;

    fn record(row_key: &str, blob: &str) -> MatchRecord {
        MatchRecord::new(row_key, OffsetDateTime::UNIX_EPOCH, blob, "q", "q")
    }

    #[tokio::test]
    async fn test_create_table_status() {
        let store = MockStore::default();
        assert_eq!(store.create_table("Results").await.unwrap(), TableStatus::Created);
        assert_eq!(store.create_table("Results").await.unwrap(), TableStatus::AlreadyExists);
    }

    #[tokio::test]
    async fn test_conflicting_row_key() {
        let store = MockStore::default();
        store.create_table("Results").await.unwrap();
        store.insert("Results", &record("k", "a.txt")).await.unwrap();
        let err = store.insert("Results", &record("k", "b.txt")).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Conflict(_)));
        assert_eq!(store.records("Results").await[0].blob, "a.txt");
    }

    #[tokio::test]
    async fn test_insert_without_table() {
        let store = MockStore::default();
        let err = store.insert("Results", &record("k", "a.txt")).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::TableNotFound(_)));
    }

    #[tokio::test]
    async fn test_injected_failure() {
        let store = MockStore::default().fail_inserts_when(|r| r.row_key == "bad");
        store.create_table("Results").await.unwrap();
        assert!(store.insert("Results", &record("bad", "a.txt")).await.is_err());
        assert!(store.insert("Results", &record("good", "a.txt")).await.is_ok());
        assert_eq!(store.records("Results").await.len(), 1);
    }

    #[tokio::test]
    async fn test_unavailable() {
        let store = MockStore::unavailable();
        let err = store.create_table("Results").await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Database));
        assert!(store.list("Results").await.is_err());
    }
}
