//! Operator-facing output for scans.

use findit_scanner::ScanEvent;
use findit_scanner::scan::ScanSummary;
use findit_scanner::scan::error::Result as ScanResult;
use std::io::{self, Write};

const COLUMNS: [&str; 3] = ["Blob", "Query", "Match"];

/// Prints scan progress and the final match table to a writer.
pub struct Reporter<W> {
    out: W,
}

impl<W: Write> Reporter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    /// Print what one stream item means for the operator.
    pub fn event(&mut self, summary: &ScanSummary, item: &ScanResult<ScanEvent>) -> io::Result<()> {
        match item {
            Ok(ScanEvent::Started) => writeln!(
                self.out,
                "Scanning all blobs in container '{}' for query: '{}'{}",
                summary.container,
                summary.query,
                if summary.ignore_case { " (ignoring case)" } else { "" }
            ),
            Ok(ScanEvent::DiscoveryComplete(count)) => writeln!(self.out, "Found {count} blob(s) to scan."),
            Ok(ScanEvent::Scanned(scan)) if scan.matches.is_empty() => {
                writeln!(self.out, "No matches found in '{}'.", scan.blob)
            },
            Ok(ScanEvent::Scanned(scan)) => {
                writeln!(self.out, "Matches found in '{}':", scan.blob)?;
                for found in &scan.matches {
                    let note = if found.saved { "" } else { " (not saved)" };
                    writeln!(self.out, " → {}{note}", found.text)?;
                }
                Ok(())
            },
            Ok(ScanEvent::Complete) => Ok(()),
            Err(e) => match e.blob() {
                Some(blob) => writeln!(self.out, "Error reading blob '{blob}': {}", &**e),
                None if e.is_fatal() => writeln!(self.out, "Scan failed: {}", &**e),
                None => writeln!(self.out, "Warning: {}", &**e),
            },
        }
    }

    /// Print the aggregate table of every match found.
    pub fn summary(&mut self, summary: &ScanSummary) -> io::Result<()> {
        if summary.matches.is_empty() {
            writeln!(self.out, "No results found.")?;
        } else {
            let rows: Vec<[&str; 3]> = summary
                .matches
                .iter()
                .map(|m| [m.blob.as_str(), summary.query.as_str(), m.text.as_str()])
                .collect();
            self.table(&rows)?;
        }
        if !summary.failed_blobs.is_empty() {
            writeln!(self.out, "{} blob(s) could not be read.", summary.failed_blobs.len())?;
        }
        if summary.skipped_entries > 0 {
            writeln!(self.out, "{} listing entr(ies) could not be scanned.", summary.skipped_entries)?;
        }
        if summary.unsaved > 0 {
            writeln!(self.out, "{} match(es) could not be saved.", summary.unsaved)?;
        }
        Ok(())
    }

    fn table(&mut self, rows: &[[&str; 3]]) -> io::Result<()> {
        let mut widths = COLUMNS.map(|c| c.chars().count());
        for row in rows {
            for (width, cell) in widths.iter_mut().zip(row) {
                *width = (*width).max(cell.chars().count());
            }
        }
        writeln!(self.out, "Matches Found")?;
        self.row(&COLUMNS, &widths)?;
        let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
        writeln!(self.out, "{}", rule.join("-+-"))?;
        for row in rows {
            self.row(row, &widths)?;
        }
        Ok(())
    }

    fn row(&mut self, cells: &[&str; 3], widths: &[usize; 3]) -> io::Result<()> {
        let padded: Vec<String> = cells.iter().zip(widths).map(|(cell, &width)| format!("{cell:<width$}")).collect();
        writeln!(self.out, "{}", padded.join(" | ").trim_end())
    }
}
