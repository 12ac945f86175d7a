//! Scanner module - probes one host across its configured port set.
//!
//! [`TcpProber`] classifies a single connect attempt, and [`HostScanner`]
//! drives a fixed pool of probes over every port of one host.

pub mod host;
pub mod rate_limiter;
pub mod tcp;
pub mod traits;

pub use host::{HostScan, HostScanner, MAX_CONCURRENCY};
pub use rate_limiter::RateLimiter;
pub use tcp::TcpProber;
pub use traits::{PortState, ProbeOutcome, ProbeResult, Prober};
