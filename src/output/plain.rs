//! Plain text output formatting.
//!
//! Produces the human-readable per-host report with colors.

use crate::report::{HostOutcome, HostReport, RunSummary};
use console::style;
use std::io::{self, Write};

/// Write the report of one finished host.
///
/// A failed host is a single red line. A scanned host gets a header, one
/// line per open port (green when expected, red otherwise), one red line
/// per expected port that is not open, and a blank separator.
pub fn write_host_report<W: Write>(out: &mut W, report: &HostReport) -> io::Result<()> {
    match &report.outcome {
        HostOutcome::Failed { reason } => {
            writeln!(
                out,
                "{}",
                style(format!("{}: scanning failed ({reason})", report.name)).red()
            )?;
        }
        HostOutcome::Scanned { open, missing, .. } => {
            writeln!(out, "{}:", report.label())?;

            for port in open {
                let line = format!("    {} opened", port.port);
                if port.expected {
                    writeln!(out, "{}", style(line).green())?;
                } else {
                    writeln!(out, "{}", style(line).red())?;
                }
            }

            for port in missing {
                writeln!(out, "{}", style(format!("    {port} not opened")).red())?;
            }

            writeln!(out)?;
        }
    }

    out.flush()
}

/// Print the banner shown before any host is admitted.
pub fn print_run_header(hosts: usize, budget: &str) {
    println!();
    println!(
        "{} {} v{}",
        style("Starting").cyan(),
        style("portwarden").cyan().bold(),
        env!("CARGO_PKG_VERSION")
    );
    println!(
        "{} Hosts: {}",
        style("•").dim(),
        style(hosts).white().bold()
    );
    println!("{} Thread budget: {}", style("•").dim(), style(budget).yellow());
    println!();
}

/// Print the closing line of a plain run.
pub fn print_run_footer(summary: &RunSummary) {
    let warnings = summary.warnings.len();
    let failed = summary.hosts.iter().filter(|h| h.is_failed()).count();
    let elapsed = (summary.completed_at - summary.started_at).num_milliseconds() as f64 / 1000.0;

    let warnings_styled = if warnings == 0 {
        style(warnings).green().bold()
    } else {
        style(warnings).red().bold()
    };

    println!(
        "{} {} hosts in {:.2}s, {} failed, {} warnings",
        style("Done:").bold(),
        summary.hosts.len(),
        elapsed,
        style(failed).yellow(),
        warnings_styled
    );
}

/// Print an error message.
pub fn print_error(msg: &str) {
    eprintln!("{} {}", style("Error:").red().bold(), msg);
}
