//! CSV export of a result table.

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use findit_records::{MatchRecord, RecordStore};
use serde::Serialize;
use std::io::Write;
use std::path::Path;
use time::format_description::well_known::Rfc3339;

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct ExportRow<'a> {
    partition_key: &'a str,
    row_key: &'a str,
    scan_time: String,
    blob_name: &'a str,
    query: &'a str,
    #[serde(rename = "Match")]
    match_text: &'a str,
}

impl<'a> TryFrom<&'a MatchRecord> for ExportRow<'a> {
    type Error = time::error::Format;
    fn try_from(record: &'a MatchRecord) -> std::result::Result<Self, Self::Error> {
        Ok(Self {
            partition_key: &record.partition_key,
            row_key: &record.row_key,
            scan_time: record.scan_time.format(&Rfc3339)?,
            blob_name: &record.blob,
            query: &record.query,
            match_text: &record.match_text,
        })
    }
}

/// Write every record of `table` to `writer` as CSV, returning the row count.
///
/// Columns are `PartitionKey,RowKey,ScanTime,BlobName,Query,Match`. The
/// header goes out with the first record, so an empty table produces no
/// output at all.
pub async fn export_csv<W: Write>(store: &dyn RecordStore, table: &str, writer: W) -> Result<u64> {
    let records = store.list(table).await.or_raise(|| ErrorKind::Export)?;
    let mut csv = csv::Writer::from_writer(writer);
    let mut count = 0;
    for record in &records {
        let row = ExportRow::try_from(record).or_raise(|| ErrorKind::Export)?;
        csv.serialize(row).or_raise(|| ErrorKind::Export)?;
        count += 1;
    }
    csv.flush().or_raise(|| ErrorKind::Export)?;
    Ok(count)
}

/// [`export_csv`] into a file, replacing it if it exists.
pub async fn export_to_path(store: &dyn RecordStore, table: &str, path: impl AsRef<Path>) -> Result<u64> {
    let path = path.as_ref();
    let mut buffer = Vec::new();
    let count = export_csv(store, table, &mut buffer).await?;
    tokio::fs::write(path, buffer).await.or_raise(|| ErrorKind::Export)?;
    tracing::info!(table, path = %path.display(), records = count, "Exported records");
    Ok(count)
}
