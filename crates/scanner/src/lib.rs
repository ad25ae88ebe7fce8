//! Search blob containers for a query and record every match.
//!
//! A scan walks one container. Each blob is classified by name into a
//! [`ContentFormat`], normalized into [`SearchableString`]s, and filtered by a
//! [`Matcher`]. Every match is written to a result table through a
//! [`Recorder`]; a blob or record that fails is reported and skipped.

pub mod error;
pub mod export;
mod format;
mod matcher;
mod normalize;
mod record;
pub mod scan;

pub use crate::export::{export_csv, export_to_path};
pub use crate::format::ContentFormat;
pub use crate::matcher::{Matcher, find_matches};
pub use crate::normalize::{SearchableString, extract, normalize};
pub use crate::record::{Recorder, RowKey, RowKeyGenerator};
pub use crate::scan::{ScanEvent, ScanRequest, ScanSummary, scan, scan_container};
