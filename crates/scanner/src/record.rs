//! Persisting matches as records.

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use findit_records::{MatchRecord, StoreHandle};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use std::sync::atomic::{AtomicI64, Ordering};
use time::OffsetDateTime;

/// Blob names in row keys keep only ASCII alphanumerics and `-._~`.
const ROW_KEY_ENCODE: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'.').remove(b'_').remove(b'~');
const NANOS_PER_SECOND: i64 = 1_000_000_000;

/// Last timestamp handed out, in nanoseconds since the Unix epoch.
static LAST_NANOS: AtomicI64 = AtomicI64::new(i64::MIN);

/// A freshly generated row key and the instant it encodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowKey {
    pub key: String,
    pub scan_time: OffsetDateTime,
}

/// Generates row keys of the form `<encoded blob>_<seconds>.<nanoseconds>`.
///
/// All generators in a process share one clock that never returns the same
/// nanosecond twice, so keys for the same blob never collide within a run
/// even when the wall clock is coarse or steps backwards.
///
/// ```
/// use findit_scanner::RowKeyGenerator;
/// let keys = RowKeyGenerator::default();
/// let first = keys.next("logs/app.log");
/// let second = keys.next("logs/app.log");
/// assert!(first.key.starts_with("logs%2Fapp.log_"));
/// assert_ne!(first.key, second.key);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct RowKeyGenerator;

impl RowKeyGenerator {
    pub fn next(&self, blob: &str) -> RowKey {
        let now = OffsetDateTime::now_utc();
        let nanos = tick(i64::try_from(now.unix_timestamp_nanos()).unwrap_or(i64::MAX));
        let scan_time = OffsetDateTime::from_unix_timestamp_nanos(i128::from(nanos)).unwrap_or(now);
        let key = format!(
            "{}_{}.{:09}",
            utf8_percent_encode(blob, ROW_KEY_ENCODE),
            nanos.div_euclid(NANOS_PER_SECOND),
            nanos.rem_euclid(NANOS_PER_SECOND),
        );
        RowKey { key, scan_time }
    }
}

/// Advance the shared clock to `max(now, last + 1)` and return the new value.
fn tick(now: i64) -> i64 {
    let mut next = now;
    // The closure always returns Some, so this never fails.
    _ = LAST_NANOS.fetch_update(Ordering::AcqRel, Ordering::Acquire, |last| {
        next = now.max(last.saturating_add(1));
        Some(next)
    });
    next
}

/// Writes one [`MatchRecord`] per match into a single result table.
///
/// A failed write is logged and returned, but never affects later writes.
#[derive(Clone)]
pub struct Recorder {
    store: StoreHandle,
    table: String,
    keys: RowKeyGenerator,
}

impl Recorder {
    pub fn new(store: StoreHandle, table: impl Into<String>) -> Self {
        Self {
            store,
            table: table.into(),
            keys: RowKeyGenerator,
        }
    }

    /// Build and insert a record for one match.
    ///
    /// Over-long match text is truncated. The blob name is stored as-is; only
    /// the row key is encoded.
    pub async fn record(&self, blob: &str, query: &str, match_text: &str) -> Result<MatchRecord> {
        let RowKey { key, scan_time } = self.keys.next(blob);
        let record = MatchRecord::new(key, scan_time, blob, query, match_text);
        self.store
            .insert(&self.table, &record)
            .await
            .inspect_err(|e| {
                tracing::error!(blob, table = %self.table, row_key = %record.row_key, error = ?e, "Failed to save match");
            })
            .or_raise(|| ErrorKind::Record {
                blob: blob.to_string(),
                row_key: record.row_key.clone(),
            })?;
        tracing::debug!(blob, table = %self.table, row_key = %record.row_key, "Saved match");
        Ok(record)
    }
}
