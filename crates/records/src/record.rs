use time::OffsetDateTime;

/// Every match record lives in this one logical partition.
pub const PARTITION_KEY: &str = "SearchResults";
/// Longest match text (in characters) the store accepts.
pub const MAX_MATCH_CHARS: usize = 250;

/// One confirmed match, as persisted in the record store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchRecord {
    /// Always [`PARTITION_KEY`].
    pub partition_key: String,
    /// Unique key within the partition.
    pub row_key: String,
    /// When the match was recorded (UTC).
    pub scan_time: OffsetDateTime,
    /// Originating blob name, unencoded.
    pub blob: String,
    /// Query that produced the match.
    pub query: String,
    /// Matching text, at most [`MAX_MATCH_CHARS`] characters.
    pub match_text: String,
}

impl MatchRecord {
    /// Build a record in the shared partition, truncating over-long match text.
    pub fn new(
        row_key: impl Into<String>,
        scan_time: OffsetDateTime,
        blob: impl Into<String>,
        query: impl Into<String>,
        match_text: &str,
    ) -> Self {
        Self {
            partition_key: PARTITION_KEY.to_string(),
            row_key: row_key.into(),
            scan_time,
            blob: blob.into(),
            query: query.into(),
            match_text: truncate_chars(match_text, MAX_MATCH_CHARS).to_string(),
        }
    }
}

/// Cut `text` down to at most `max` characters, never splitting a character.
///
/// ```
/// use findit_records::truncate_chars;
/// assert_eq!(truncate_chars("héllo", 2), "hé");
/// assert_eq!(truncate_chars("short", 250), "short");
/// ```
pub fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}
