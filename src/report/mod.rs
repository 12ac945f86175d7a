//! Allow-list diffing and run-level results.

mod aggregator;
mod warning;

pub use aggregator::{ResultAggregator, ALERT_HEADER};
pub use warning::{escape_html, HostOutcome, HostReport, OpenPort, Warning, WarningKind};

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Everything one run produced.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    /// Host reports in completion order.
    pub hosts: Vec<HostReport>,
    pub warnings: Vec<Warning>,
}

impl RunSummary {
    /// Snapshot an aggregator once the fleet has finished.
    pub fn collect<W: std::io::Write>(
        aggregator: &ResultAggregator<W>,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            started_at,
            completed_at: Utc::now(),
            hosts: aggregator.reports(),
            warnings: aggregator.warnings(),
        }
    }
}
