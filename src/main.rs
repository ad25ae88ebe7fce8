//! `findit`: search blob containers for a query and record every match.
//!
//! Exit codes:
//! - `0`: success.
//! - `1`: invalid arguments or configuration, or a failure that stopped the
//!   command.
//! - `2`: the scan finished, but some blob could not be read or some match
//!   could not be saved.

mod cli;
mod commands;
mod error;
mod logging;
mod report;

use crate::cli::{Cli, Command};
use crate::commands::Outcome;
use crate::error::{ErrorKind, Result};
use clap::Parser;
use exn::ResultExt;
use findit_config::Config;
use std::process::ExitCode;

const EXIT_PARTIAL: u8 = 2;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // Help and version output are not failures.
            _ = e.print();
            return match e.use_stderr() {
                true => ExitCode::FAILURE,
                false => ExitCode::SUCCESS,
            };
        },
    };
    match run(cli).await {
        Ok(Outcome::Success) => ExitCode::SUCCESS,
        Ok(Outcome::Partial) => ExitCode::from(EXIT_PARTIAL),
        Err(e) => {
            // The full error tree, since logging may not be set up yet.
            eprintln!("error: {e:?}");
            ExitCode::FAILURE
        },
    }
}

async fn run(cli: Cli) -> Result<Outcome> {
    let config = Config::load(cli.config.as_deref()).or_raise(|| ErrorKind::Config)?;
    logging::init(&config.log);
    let stdout = std::io::stdout();
    match cli.command {
        Command::Scan(args) => commands::scan_command(&config, args, stdout).await,
        Command::Upload(args) => commands::upload_command(&config, args, stdout).await,
        Command::Export(args) => commands::export_command(&config, args, stdout).await,
    }
}
