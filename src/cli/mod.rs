//! Command-line interface.
//!
//! A single command: load the fleet file, scan every server, report
//! deviations from each allow-list and alert on them.

mod run;

pub use run::execute;

use crate::config::ScanDefaults;
use crate::output::OutputFormat;
use crate::scanner::MAX_CONCURRENCY;
use crate::types::PortSpec;
use clap::Parser;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::time::Duration;

/// portwarden - watch a fleet of servers for unexpectedly open ports.
///
/// Every server in the configuration file is scanned with TCP connects and
/// its open ports are compared with the ports it is expected to expose.
/// Deviations are printed and sent as a Telegram alert.
#[derive(Parser, Debug)]
#[command(name = "portwarden")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Fleet-wide watchdog for unexpectedly open TCP ports", long_about = None)]
pub struct Cli {
    /// Path to the fleet configuration file
    ///
    /// Defaults to servers.toml in the user configuration directory
    /// (~/.config/portwarden/servers.toml on Linux).
    #[arg(long, value_name = "PATH", env = "PORTWARDEN_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Default number of concurrent probes per server
    #[arg(short = 'c', long, default_value = "200", value_parser = parse_concurrency)]
    pub concurrency: NonZeroUsize,

    /// Default connection timeout in seconds
    #[arg(short = 't', long, default_value = "5", value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout: u64,

    /// Global thread budget across all servers (0 = unbounded)
    ///
    /// A server costs its concurrency plus one; the scheduler costs one.
    #[arg(short = 'l', long = "threads-limit", default_value = "0")]
    pub threads_limit: usize,

    /// Default ports to scan (e.g., "1-1024", "22,80,443,8000-9000")
    #[arg(short, long, default_value = "0-65535")]
    pub ports: PortSpec,

    /// Default rate limit in probes per second per server (0 = unlimited)
    #[arg(short = 'r', long = "rate", default_value = "0")]
    pub rate_limit: u32,

    /// Do not send Telegram alerts
    #[arg(long)]
    pub no_telegram: bool,

    /// Output format for results
    #[arg(short, long, value_enum, default_value = "plain")]
    pub output: OutputFormat,

    /// Show a progress bar per server
    #[arg(long)]
    pub progress: bool,
}

impl Cli {
    /// Defaults for servers that do not override them.
    pub fn scan_defaults(&self) -> ScanDefaults {
        ScanDefaults {
            concurrency: self.concurrency,
            timeout: Duration::from_secs(self.timeout),
            ports: self.ports.clone(),
            rate_limit: self.rate_limit,
        }
    }
}

fn parse_concurrency(s: &str) -> Result<NonZeroUsize, String> {
    let n: NonZeroUsize = s.parse().map_err(|e| format!("{e}"))?;
    if n.get() > MAX_CONCURRENCY {
        return Err(format!("must be at most {MAX_CONCURRENCY}"));
    }
    Ok(n)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["portwarden"]).unwrap();
        assert_eq!(cli.threads_limit, 0);
        assert!(!cli.no_telegram);
        assert_eq!(cli.output, OutputFormat::Plain);
        assert_eq!(cli.scan_defaults(), ScanDefaults::default());
    }

    #[test]
    fn test_overrides() {
        let cli = Cli::try_parse_from([
            "portwarden",
            "--config",
            "/etc/portwarden.toml",
            "--concurrency",
            "50",
            "--timeout",
            "2",
            "--threads-limit",
            "120",
            "--ports",
            "1-1024",
            "--no-telegram",
            "--output",
            "json",
        ])
        .unwrap();

        assert_eq!(cli.config, Some(PathBuf::from("/etc/portwarden.toml")));
        assert_eq!(cli.threads_limit, 120);
        assert_eq!(cli.output, OutputFormat::Json);

        let defaults = cli.scan_defaults();
        assert_eq!(defaults.concurrency.get(), 50);
        assert_eq!(defaults.timeout, Duration::from_secs(2));
        assert_eq!(defaults.ports.count(), 1024);
    }

    #[test]
    fn test_rejects_zero_concurrency_and_timeout() {
        assert!(Cli::try_parse_from(["portwarden", "--concurrency", "0"]).is_err());
        assert!(Cli::try_parse_from(["portwarden", "--concurrency", "65537"]).is_err());
        assert!(Cli::try_parse_from(["portwarden", "--concurrency", "65536"]).is_ok());
        assert!(Cli::try_parse_from(["portwarden", "--timeout", "0"]).is_err());
        assert!(Cli::try_parse_from(["portwarden", "--ports", "100-1"]).is_err());
    }
}
