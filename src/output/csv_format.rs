//! CSV output formatting.

use crate::report::RunSummary;
use std::io::{self, Write};

/// Write one row per finding, failed hosts included.
pub fn write_csv<W: Write>(out: W, summary: &RunSummary) -> io::Result<()> {
    let mut wtr = csv::Writer::from_writer(out);

    wtr.write_record(["name", "host", "port", "finding"])?;

    for warning in &summary.warnings {
        wtr.write_record([
            warning.name.as_str(),
            warning.host.as_str(),
            warning.port.to_string().as_str(),
            warning.kind.to_string().as_str(),
        ])?;
    }

    for host in summary.hosts.iter().filter(|h| h.is_failed()) {
        wtr.write_record([host.name.as_str(), host.host.as_str(), "", "scanning failed"])?;
    }

    wtr.flush()?;
    Ok(())
}

/// Print findings in CSV format.
pub fn print_csv(summary: &RunSummary) -> io::Result<()> {
    write_csv(io::stdout().lock(), summary)
}
