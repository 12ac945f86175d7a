//! Fleet-wide admission control.
//!
//! Hosts are admitted in FIFO order while the summed cost of running
//! workers stays within a global budget. When the next host does not fit,
//! running workers are polled with a short bounded wait until enough of
//! them finish. Host scans run for seconds to minutes, so the poll
//! interval is negligible.

use crate::fleet::worker::HostWorker;
use crate::report::ResultAggregator;
use futures::stream::{FuturesUnordered, StreamExt};
use std::collections::VecDeque;
use std::fmt;
use std::io::Write;
use std::num::NonZeroUsize;
use std::time::Duration;
use tracing::{debug, warn};

/// Budget units reserved for the scheduler itself.
pub const SCHEDULER_COST: usize = 1;

/// Bounded wait applied to each running worker while waiting for capacity.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Global cap on the summed cost of running workers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ThreadBudget {
    #[default]
    Unbounded,
    Limited(NonZeroUsize),
}

impl ThreadBudget {
    /// Budget from a raw limit, where 0 means unbounded.
    pub fn from_limit(limit: usize) -> Self {
        NonZeroUsize::new(limit).map_or(Self::Unbounded, Self::Limited)
    }

    /// Whether a total active cost fits the budget.
    pub fn admits(&self, total_cost: usize) -> bool {
        match self {
            Self::Unbounded => true,
            Self::Limited(limit) => total_cost <= limit.get(),
        }
    }
}

impl fmt::Display for ThreadBudget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unbounded => write!(f, "unbounded"),
            Self::Limited(limit) => write!(f, "{limit}"),
        }
    }
}

/// Outcome counters of one fleet run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FleetSummary {
    /// Workers aggregated, failed ones included.
    pub hosts: usize,
    pub failed: usize,
    /// Highest active cost observed, scheduler overhead included.
    pub peak_cost: usize,
}

/// Admits host workers under a [`ThreadBudget`].
#[derive(Debug, Clone)]
pub struct FleetScheduler {
    budget: ThreadBudget,
    poll_interval: Duration,
}

impl FleetScheduler {
    pub fn new(budget: ThreadBudget) -> Self {
        Self {
            budget,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn budget(&self) -> ThreadBudget {
        self.budget
    }

    /// Run every worker to completion and feed each to `aggregator` as it
    /// finishes.
    ///
    /// A worker whose cost alone exceeds the budget is admitted once
    /// nothing else is running.
    pub async fn run<W: Write>(
        &self,
        workers: impl IntoIterator<Item = HostWorker>,
        aggregator: &ResultAggregator<W>,
    ) -> FleetSummary {
        let mut pending: VecDeque<HostWorker> = workers.into_iter().collect();
        let mut active: Vec<HostWorker> = Vec::new();
        let mut active_cost = SCHEDULER_COST;
        let mut summary = FleetSummary {
            peak_cost: active_cost,
            ..FleetSummary::default()
        };

        while let Some(mut worker) = pending.pop_front() {
            let cost = worker.cost();

            while !active.is_empty() && !self.budget.admits(active_cost + cost) {
                active_cost -= self.reap(&mut active, aggregator, &mut summary).await;
            }

            worker.start();
            active_cost += cost;
            summary.peak_cost = summary.peak_cost.max(active_cost);
            debug!(
                "admitted {} (cost {cost}), active cost {active_cost}/{}",
                worker.name(),
                self.budget
            );
            active.push(worker);
        }

        let mut remaining: FuturesUnordered<_> = active
            .into_iter()
            .map(|mut worker| async move {
                worker.wait().await;
                worker
            })
            .collect();

        while let Some(worker) = remaining.next().await {
            record(&worker, aggregator, &mut summary);
        }

        summary
    }

    /// Poll each running worker once; aggregate and remove the finished
    /// ones. Returns the cost they released.
    async fn reap<W: Write>(
        &self,
        active: &mut Vec<HostWorker>,
        aggregator: &ResultAggregator<W>,
        summary: &mut FleetSummary,
    ) -> usize {
        let mut freed = 0;
        let mut i = 0;

        while i < active.len() {
            if active[i].poll_done(self.poll_interval).await {
                let worker = active.remove(i);
                freed += worker.cost();
                record(&worker, aggregator, summary);
            } else {
                i += 1;
            }
        }

        freed
    }
}

fn record<W: Write>(
    worker: &HostWorker,
    aggregator: &ResultAggregator<W>,
    summary: &mut FleetSummary,
) {
    summary.hosts += 1;
    if worker.is_failed() {
        summary.failed += 1;
    }

    if let Err(e) = aggregator.add(worker) {
        warn!("failed to write report for {}: {e}", worker.name());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fleet::HostSpec;
    use crate::scanner::host::tests::{FixedProber, PanickingProber};
    use crate::scanner::Prober;
    use std::sync::Arc;

    fn worker(name: &str, concurrency: usize, prober: Arc<dyn Prober>) -> HostWorker {
        let spec = HostSpec::new(
            name,
            "127.0.0.1",
            NonZeroUsize::new(concurrency).unwrap(),
            Duration::from_millis(50),
        )
        .with_ports("1-40".parse().unwrap());
        HostWorker::new(spec, prober)
    }

    fn slow() -> Arc<dyn Prober> {
        Arc::new(FixedProber::new(&[22]).with_delay(Duration::from_millis(3)))
    }

    fn scheduler(limit: usize) -> FleetScheduler {
        FleetScheduler::new(ThreadBudget::from_limit(limit))
            .with_poll_interval(Duration::from_millis(5))
    }

    #[test]
    fn test_budget_from_limit() {
        assert_eq!(ThreadBudget::from_limit(0), ThreadBudget::Unbounded);
        assert!(ThreadBudget::from_limit(0).admits(usize::MAX));

        let budget = ThreadBudget::from_limit(10);
        assert!(budget.admits(10));
        assert!(!budget.admits(11));
        assert_eq!(budget.to_string(), "10");
    }

    #[tokio::test]
    async fn test_unbounded_admits_everything_at_once() {
        let workers: Vec<_> = (0..5).map(|i| worker(&format!("h{i}"), 3, slow())).collect();
        let aggregator = ResultAggregator::new(std::io::sink());

        let summary = scheduler(0).run(workers, &aggregator).await;

        assert_eq!(summary.hosts, 5);
        assert_eq!(summary.failed, 0);
        assert_eq!(summary.peak_cost, SCHEDULER_COST + 5 * 4);
    }

    #[tokio::test]
    async fn test_budget_is_never_exceeded() {
        let workers: Vec<_> = (0..6).map(|i| worker(&format!("h{i}"), 3, slow())).collect();
        let aggregator = ResultAggregator::new(std::io::sink());

        // Room for exactly two workers of cost 4 next to the scheduler.
        let summary = scheduler(9).run(workers, &aggregator).await;

        assert_eq!(summary.hosts, 6);
        assert_eq!(summary.peak_cost, 9);
        assert_eq!(aggregator.reports().len(), 6);
    }

    #[tokio::test]
    async fn test_oversized_worker_runs_alone() {
        let workers = vec![
            worker("small", 2, slow()),
            worker("huge", 20, slow()),
            worker("tail", 2, slow()),
        ];
        let aggregator = ResultAggregator::new(std::io::sink());

        let summary = scheduler(5).run(workers, &aggregator).await;

        assert_eq!(summary.hosts, 3);
        assert_eq!(summary.peak_cost, SCHEDULER_COST + 21);
        let names: Vec<String> = aggregator.reports().into_iter().map(|r| r.name).collect();
        assert_eq!(names, vec!["small", "huge", "tail"]);
    }

    #[tokio::test]
    async fn test_serial_budget_keeps_fifo_order() {
        let workers: Vec<_> = ["a", "b", "c", "d"]
            .iter()
            .map(|name| worker(name, 2, slow()))
            .collect();
        let aggregator = ResultAggregator::new(std::io::sink());

        let summary = scheduler(4).run(workers, &aggregator).await;

        assert_eq!(summary.peak_cost, 4);
        let names: Vec<String> = aggregator.reports().into_iter().map(|r| r.name).collect();
        assert_eq!(names, vec!["a", "b", "c", "d"]);
    }

    #[tokio::test]
    async fn test_failed_host_does_not_block_others() {
        let workers = vec![
            worker("ok1", 2, slow()),
            worker("broken", 2, Arc::new(PanickingProber)),
            worker("ok2", 2, slow()),
        ];
        let aggregator = ResultAggregator::new(std::io::sink());

        let summary = scheduler(7).run(workers, &aggregator).await;

        assert_eq!(summary.hosts, 3);
        assert_eq!(summary.failed, 1);
        let reports = aggregator.reports();
        assert_eq!(reports.iter().filter(|r| r.is_failed()).count(), 1);
        assert_eq!(aggregator.warnings().len(), 2);
    }

    #[tokio::test]
    async fn test_partial_results_of_failed_host_are_discarded() {
        let broken = Arc::new(FixedProber::new(&[5, 7]).with_panic_at(30));
        let workers = vec![
            worker("ok1", 2, slow()),
            worker("broken", 1, broken),
            worker("ok2", 2, slow()),
        ];
        let aggregator = ResultAggregator::new(std::io::sink());

        let summary = scheduler(0).run(workers, &aggregator).await;

        assert_eq!(summary.failed, 1);
        let warnings = aggregator.warnings();
        assert_eq!(warnings.len(), 2);
        assert!(warnings.iter().all(|w| w.name != "broken"));
    }

    #[tokio::test]
    async fn test_empty_fleet() {
        let aggregator = ResultAggregator::new(std::io::sink());
        let summary = scheduler(0).run(Vec::<HostWorker>::new(), &aggregator).await;
        assert_eq!(summary, FleetSummary { hosts: 0, failed: 0, peak_cost: SCHEDULER_COST });
    }
}
