//! Output formatting module.
//!
//! Plain text is streamed host by host while the fleet runs. JSON and CSV
//! are written once the whole run has finished.

mod csv_format;
mod json_format;
pub mod plain;

pub use csv_format::{print_csv, write_csv};
pub use json_format::{print_json, write_json};
pub use plain::{print_error, print_run_footer, print_run_header, write_host_report};

use crate::report::RunSummary;
use std::io;

/// Output format for results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable plain text
    #[default]
    Plain,
    /// JSON structured output
    Json,
    /// CSV, one row per finding
    Csv,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Plain => write!(f, "plain"),
            Self::Json => write!(f, "json"),
            Self::Csv => write!(f, "csv"),
        }
    }
}

/// Print the finished run in a batch format. Plain output is streamed
/// during the run, so only its footer is printed here.
pub fn print_summary(summary: &RunSummary, format: OutputFormat) -> io::Result<()> {
    match format {
        OutputFormat::Plain => {
            print_run_footer(summary);
            Ok(())
        }
        OutputFormat::Json => print_json(summary),
        OutputFormat::Csv => print_csv(summary),
    }
}
