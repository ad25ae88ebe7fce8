use derive_more::Display;

/// How a blob's content is turned into searchable strings.
///
/// Decided by the blob name alone, see [`ContentFormat::from_blob_name`].
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentFormat {
    #[display("plain text")]
    PlainText,
    #[display("CSV")]
    Csv,
    #[display("JSON")]
    Json,
}

impl ContentFormat {
    /// Classify a blob by its name suffix.
    ///
    /// Matching is case-sensitive: `data.JSON` is plain text. Anything that is
    /// not `.json` or `.csv` is plain text, including names without a suffix.
    ///
    /// ```
    /// use findit_scanner::ContentFormat;
    /// assert_eq!(ContentFormat::from_blob_name("reports/q1.csv"), ContentFormat::Csv);
    /// assert_eq!(ContentFormat::from_blob_name("README"), ContentFormat::PlainText);
    /// ```
    pub fn from_blob_name(name: &str) -> Self {
        if name.ends_with(".json") {
            Self::Json
        } else if name.ends_with(".csv") {
            Self::Csv
        } else {
            Self::PlainText
        }
    }
}
