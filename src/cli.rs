//! Command-line arguments.
//!
//! Everything here is checked before any storage or database is touched.

use clap::builder::BoolishValueParser;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "findit", version, about = "Search blob containers for a query and record every match")]
pub struct Cli {
    /// Configuration file (default: `findit/config.toml` in the platform config directory).
    #[arg(short, long, value_name = "FILE", env = "FINDIT_CONFIG", global = true)]
    pub config: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Search every blob in a container and record each match.
    Scan(ScanArgs),
    /// Upload a local file into a container, creating the container if needed.
    Upload(UploadArgs),
    /// Export every record of a result table to a CSV file.
    Export(ExportArgs),
}

#[derive(Args, Debug)]
pub struct ScanArgs {
    /// Container to scan.
    #[arg(long, value_name = "NAME", value_parser = parse_container)]
    pub container: String,
    /// Result table to record matches in; created if missing.
    #[arg(long, value_name = "NAME", value_parser = parse_table)]
    pub table: String,
    /// Text to search for.
    #[arg(short, long, value_name = "TEXT", value_parser = parse_query)]
    pub query: String,
    /// Match regardless of case; a bare flag means yes.
    #[arg(
        short,
        long,
        value_name = "y|n",
        num_args = 0..=1,
        default_value = "false",
        default_missing_value = "true",
        value_parser = BoolishValueParser::new()
    )]
    pub ignore_case: bool,
    /// Export the result table to this CSV file once the scan is done.
    #[arg(long, value_name = "PATH")]
    pub export_csv: Option<PathBuf>,
    /// Blobs to scan at the same time (default: from configuration).
    #[arg(long, value_name = "N", value_parser = parse_concurrency)]
    pub concurrency: Option<usize>,
}

#[derive(Args, Debug)]
pub struct UploadArgs {
    /// Container to upload into.
    #[arg(long, value_name = "NAME", value_parser = parse_container)]
    pub container: String,
    /// Local file to upload.
    pub file: PathBuf,
    /// Blob name (default: the file name).
    #[arg(long, value_name = "BLOB", value_parser = parse_blob)]
    pub name: Option<String>,
}

#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Result table to export.
    #[arg(long, value_name = "NAME", value_parser = parse_table)]
    pub table: String,
    /// CSV file to write; replaced if it exists.
    pub output: PathBuf,
}

fn parse_container(value: &str) -> Result<String, String> {
    findit_storage::validate_container_name(value)
        .map(str::to_string)
        .map_err(|e| format!("{} (3-63 lowercase letters, digits or dashes)", &*e))
}

fn parse_table(value: &str) -> Result<String, String> {
    findit_records::validate_table_name(value)
        .map(str::to_string)
        .map_err(|e| format!("{} (3-63 letters, digits or underscores, starting with a letter)", &*e))
}

fn parse_blob(value: &str) -> Result<String, String> {
    findit_storage::validate_blob_name(value).map_err(|e| (*e).to_string())
}

fn parse_query(value: &str) -> Result<String, String> {
    let query = value.trim();
    if query.is_empty() {
        return Err("query must not be empty".to_string());
    }
    Ok(query.to_string())
}

fn parse_concurrency(value: &str) -> Result<usize, String> {
    match value.parse::<usize>() {
        Ok(0) => Err("must be at least 1".to_string()),
        Ok(n) => Ok(n),
        Err(e) => Err(e.to_string()),
    }
}
