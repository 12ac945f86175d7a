//! JSON output formatting.

use crate::report::RunSummary;
use std::io::{self, Write};

/// Write the run summary as pretty-printed JSON.
pub fn write_json<W: Write>(out: &mut W, summary: &RunSummary) -> io::Result<()> {
    serde_json::to_writer_pretty(&mut *out, summary).map_err(io::Error::other)?;
    writeln!(out)
}

/// Print the run summary in JSON format.
pub fn print_json(summary: &RunSummary) -> io::Result<()> {
    write_json(&mut io::stdout().lock(), summary)
}
