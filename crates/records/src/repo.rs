//! SQLite-backed record store.

use crate::Database;
use crate::error::{ErrorKind, Result};
use crate::models::RecordRow;
use crate::record::MatchRecord;
use crate::store::{RecordStore, TableStatus, validate_table_name};
use async_trait::async_trait;
use exn::ResultExt;
use sqlx::SqlitePool;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

/// Record store over a SQLite connection pool.
///
/// Logical tables are rows in the `result_tables` registry; records carry the
/// table name and are unique per `(table, partition key, row key)`.
#[derive(Debug, Clone)]
pub struct Repository {
    pool: SqlitePool,
}
impl From<&Database> for Repository {
    fn from(db: &Database) -> Self {
        Self { pool: db.pool().clone() }
    }
}
impl Repository {
    async fn table_exists(&self, table: &str) -> Result<bool> {
        sqlx::query_scalar(include_str!("../queries/table_exists.sql"))
            .bind(table)
            .fetch_one(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)
    }
}

#[async_trait]
impl RecordStore for Repository {
    async fn create_table(&self, table: &str) -> Result<TableStatus> {
        let table = validate_table_name(table)?;
        let created_at =
            OffsetDateTime::now_utc().format(&Rfc3339).or_raise(|| ErrorKind::InvalidData("creation time"))?;
        let result = sqlx::query(include_str!("../queries/create_table.sql"))
            .bind(table)
            .bind(created_at)
            .execute(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        // ON CONFLICT DO NOTHING: zero rows means somebody got there first.
        Ok(match result.rows_affected() {
            0 => TableStatus::AlreadyExists,
            _ => TableStatus::Created,
        })
    }

    async fn insert(&self, table: &str, record: &MatchRecord) -> Result<()> {
        let row = RecordRow::try_from(record)?;
        let result = sqlx::query(include_str!("../queries/insert_record.sql"))
            .bind(table)
            .bind(row.partition_key)
            .bind(row.row_key)
            .bind(row.scan_time)
            .bind(row.blob_name)
            .bind(row.query)
            .bind(row.match_text)
            .execute(&self.pool)
            .await;
        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                exn::bail!(ErrorKind::Conflict(record.row_key.clone()))
            },
            Err(sqlx::Error::Database(e)) if e.is_foreign_key_violation() => {
                exn::bail!(ErrorKind::TableNotFound(table.to_string()))
            },
            Err(e) => Err(e).or_raise(|| ErrorKind::Database),
        }
    }

    async fn list(&self, table: &str) -> Result<Vec<MatchRecord>> {
        if !self.table_exists(table).await? {
            exn::bail!(ErrorKind::TableNotFound(table.to_string()));
        }
        let rows: Vec<RecordRow> = sqlx::query_as(include_str!("../queries/list_records.sql"))
            .bind(table)
            .fetch_all(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        rows.into_iter().map(MatchRecord::try_from).collect()
    }
}
