//! Turning blob content into a flat list of strings worth searching.

use crate::error::{ErrorKind, Result};
use crate::format::ContentFormat;
use exn::ResultExt;
use serde_json::Value;
use std::fmt;
use std::ops::Deref;

/// Everything that ends a line of plain text. "\r\n" leaves an empty piece
/// between its halves, which is dropped like any other blank line.
const LINE_BREAKS: [char; 10] =
    ['\n', '\r', '\u{0b}', '\u{0c}', '\u{1c}', '\u{1d}', '\u{1e}', '\u{85}', '\u{2028}', '\u{2029}'];

/// Non-finite number literals some JSON writers emit.
const NON_FINITE: [&str; 3] = ["-Infinity", "Infinity", "NaN"];

/// A string that contains something other than whitespace.
///
/// The only way to build one is [`SearchableString::new`], so an empty or
/// blank candidate can never reach the matcher.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SearchableString(String);

impl SearchableString {
    /// Returns `None` for empty and whitespace-only input.
    ///
    /// ```
    /// use findit_scanner::SearchableString;
    /// assert!(SearchableString::new("  padded  ").is_some());
    /// assert!(SearchableString::new(" \t ").is_none());
    /// ```
    pub fn new(value: impl Into<String>) -> Option<Self> {
        let value = value.into();
        if value.trim().is_empty() {
            return None;
        }
        Some(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl Deref for SearchableString {
    type Target = str;
    fn deref(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for SearchableString {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SearchableString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl PartialEq<str> for SearchableString {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for SearchableString {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// Extract searchable strings from `content`, in content order.
///
/// - Plain text: one string per line that is not blank, kept verbatim
///   (surrounding whitespace included, line terminator removed). Lines end
///   at "\n", "\r", "\r\n" and the other Unicode line and record separators.
/// - CSV: every non-blank cell, trimmed, row by row. There is no header row
///   and rows may differ in length. Rows the reader cannot make sense of are
///   skipped.
/// - JSON: every string value at any depth, trimmed, in document order.
///   Object keys, numbers, booleans and nulls are ignored. `NaN`, `Infinity`
///   and `-Infinity` are accepted as numbers.
///
/// Only malformed JSON is an error.
pub fn extract(content: &str, format: ContentFormat) -> Result<Vec<SearchableString>> {
    match format {
        ContentFormat::PlainText => Ok(extract_lines(content)),
        ContentFormat::Csv => Ok(extract_cells(content)),
        ContentFormat::Json => extract_json(content),
    }
}

/// Like [`extract`], but malformed content is logged and yields nothing.
pub fn normalize(content: &str, format: ContentFormat) -> Vec<SearchableString> {
    match extract(content, format) {
        Ok(strings) => strings,
        Err(e) => {
            tracing::warn!(error = ?e, %format, "Content could not be parsed; nothing to search");
            Vec::new()
        },
    }
}

fn extract_lines(content: &str) -> Vec<SearchableString> {
    content.split(LINE_BREAKS).filter_map(SearchableString::new).collect()
}

fn extract_cells(content: &str) -> Vec<SearchableString> {
    let mut reader = csv::ReaderBuilder::new().has_headers(false).flexible(true).from_reader(content.as_bytes());
    let mut strings = Vec::new();
    for row in reader.records() {
        let row = match row {
            Ok(row) => row,
            Err(e) => {
                tracing::debug!(error = %e, "Skipping unreadable CSV row");
                continue;
            },
        };
        strings.extend(row.iter().map(str::trim).filter_map(SearchableString::new));
    }
    strings
}

fn extract_json(content: &str) -> Result<Vec<SearchableString>> {
    let value: Value = match serde_json::from_str(content) {
        Ok(value) => value,
        Err(e) => match null_non_finite(content) {
            Some(patched) => serde_json::from_str(&patched).or_raise(|| ErrorKind::Format(ContentFormat::Json))?,
            None => return Err(e).or_raise(|| ErrorKind::Format(ContentFormat::Json)),
        },
    };
    let mut strings = Vec::new();
    collect_strings(&value, &mut strings);
    Ok(strings)
}

/// Rewrites bare `NaN`/`Infinity`/`-Infinity` outside of strings as `null`.
/// Returns `None` when there is nothing to rewrite.
fn null_non_finite(content: &str) -> Option<String> {
    let mut out = String::with_capacity(content.len());
    let mut rest = content;
    let mut in_string = false;
    let mut replaced = false;
    while let Some(c) = rest.chars().next() {
        let mut len = c.len_utf8();
        if in_string {
            match c {
                // Copy the escaped character along with the backslash.
                '\\' => len += rest[1..].chars().next().map_or(0, char::len_utf8),
                '"' => in_string = false,
                _ => {},
            }
        } else if c == '"' {
            in_string = true;
        } else if let Some(literal) = NON_FINITE.iter().find(|literal| rest.starts_with(*literal)) {
            out.push_str("null");
            rest = &rest[literal.len()..];
            replaced = true;
            continue;
        }
        out.push_str(&rest[..len]);
        rest = &rest[len..];
    }
    replaced.then_some(out)
}

fn collect_strings(value: &Value, out: &mut Vec<SearchableString>) {
    match value {
        Value::String(s) => out.extend(SearchableString::new(s.trim())),
        Value::Array(items) => items.iter().for_each(|item| collect_strings(item, out)),
        Value::Object(members) => members.values().for_each(|member| collect_strings(member, out)),
        Value::Null | Value::Bool(_) | Value::Number(_) => {},
    }
}
