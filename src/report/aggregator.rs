//! Thread-safe sink for finished host workers.

use crate::fleet::HostWorker;
use crate::output::plain;
use crate::report::warning::{HostReport, Warning};
use std::io::{self, Write};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Header of every alert message.
pub const ALERT_HEADER: &str = "<b>❗️Attention!</b>";

struct Inner<W> {
    out: W,
    reports: Vec<HostReport>,
    warnings: Vec<Warning>,
}

/// Diffs finished workers against their allow-lists and prints a report.
///
/// One mutex is held for the whole of each [`add`](Self::add), so reports
/// of workers finishing at the same time never interleave.
pub struct ResultAggregator<W = io::Stdout> {
    inner: Mutex<Inner<W>>,
}

impl ResultAggregator<io::Stdout> {
    /// Aggregator printing to stdout.
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> ResultAggregator<W> {
    pub fn new(out: W) -> Self {
        Self {
            inner: Mutex::new(Inner {
                out,
                reports: Vec::new(),
                warnings: Vec::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner<W>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record one finished worker and print its report.
    ///
    /// Workers that are not done are reported as failed and produce no
    /// warnings.
    pub fn add(&self, worker: &HostWorker) -> io::Result<()> {
        let mut inner = self.lock();
        let report = HostReport::from_worker(worker);
        inner.warnings.extend(report.warnings());
        let written = plain::write_host_report(&mut inner.out, &report);
        inner.reports.push(report);
        written
    }

    pub fn has_warnings(&self) -> bool {
        !self.lock().warnings.is_empty()
    }

    /// All warnings so far, in aggregation order.
    pub fn warnings(&self) -> Vec<Warning> {
        self.lock().warnings.clone()
    }

    /// All host reports so far, in completion order.
    pub fn reports(&self) -> Vec<HostReport> {
        self.lock().reports.clone()
    }

    /// Alert message: an attention header followed by one line per warning.
    pub fn build_alert_payload(&self) -> String {
        let inner = self.lock();
        let lines: Vec<String> = inner.warnings.iter().map(Warning::to_html).collect();
        format!("{ALERT_HEADER}\n\n{}", lines.join("\n"))
    }

    /// Consume the aggregator and return its writer.
    pub fn into_writer(self) -> W {
        self.inner
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
            .out
    }
}
