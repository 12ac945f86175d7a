//! # portwarden - Fleet Open-Port Watchdog
//!
//! Scans a configured fleet of servers with TCP connects and compares each
//! server's open ports with the ports it is expected to expose. Deviations
//! are printed per host and delivered as a single Telegram alert.
//!
//! ## Example Usage
//!
//! ```rust,ignore
//! use portwarden::fleet::{FleetScheduler, HostSpec, HostWorker, ThreadBudget};
//! use portwarden::report::ResultAggregator;
//! use std::num::NonZeroUsize;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() {
//!     let spec = HostSpec::new("web", "203.0.113.10", NonZeroUsize::new(100).unwrap(), Duration::from_secs(3))
//!         .with_expected_ports([22, 443]);
//!
//!     let aggregator = ResultAggregator::stdout();
//!     FleetScheduler::new(ThreadBudget::from_limit(500))
//!         .run(vec![HostWorker::tcp(spec)], &aggregator)
//!         .await;
//!
//!     if aggregator.has_warnings() {
//!         println!("{}", aggregator.build_alert_payload());
//!     }
//! }
//! ```
//!
//! ## Architecture
//!
//! - [`scanner`] - Per-port probing and the per-host probe pool
//! - [`fleet`] - Host workers and budgeted FIFO admission
//! - [`report`] - Allow-list diffing and alert payloads
//! - [`notify`] - Alert delivery
//! - [`config`] - Fleet configuration file
//! - [`types`] - Ports, port specs and targets
//! - [`output`] - Plain, JSON and CSV rendering
//! - [`error`] - Error types

pub mod cli;
pub mod config;
pub mod error;
pub mod fleet;
pub mod logging;
pub mod notify;
pub mod output;
pub mod report;
pub mod scanner;
pub mod types;

pub use error::{ConfigError, NotifyError, ScanError};
pub use fleet::{FleetScheduler, HostSpec, HostWorker, ThreadBudget};
pub use report::{ResultAggregator, Warning};
pub use scanner::{HostScanner, PortState, Prober, TcpProber};
pub use types::{Port, PortSpec};
