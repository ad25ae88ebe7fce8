use crate::error::{Error, ErrorKind};
use crate::record::MatchRecord;
use exn::ResultExt;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

/// A `match_records` row as SQLite sees it.
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct RecordRow {
    pub(crate) partition_key: String,
    pub(crate) row_key: String,
    pub(crate) scan_time: String,
    pub(crate) blob_name: String,
    pub(crate) query: String,
    pub(crate) match_text: String,
}

impl TryFrom<&MatchRecord> for RecordRow {
    type Error = Error;
    fn try_from(record: &MatchRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            partition_key: record.partition_key.clone(),
            row_key: record.row_key.clone(),
            scan_time: record.scan_time.format(&Rfc3339).or_raise(|| ErrorKind::InvalidData("scan time"))?,
            blob_name: record.blob.clone(),
            query: record.query.clone(),
            match_text: record.match_text.clone(),
        })
    }
}

impl TryFrom<RecordRow> for MatchRecord {
    type Error = Error;
    fn try_from(row: RecordRow) -> Result<Self, Self::Error> {
        // Built field by field: stored text was already truncated on the way in.
        Ok(Self {
            partition_key: row.partition_key,
            row_key: row.row_key,
            scan_time: OffsetDateTime::parse(&row.scan_time, &Rfc3339)
                .or_raise(|| ErrorKind::InvalidData("scan time"))?,
            blob: row.blob_name,
            query: row.query,
            match_text: row.match_text,
        })
    }
}
