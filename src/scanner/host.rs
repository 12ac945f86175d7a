//! Per-host scanning with a fixed pool of pullers.
//!
//! All candidate ports are loaded into a shared queue up front. Exactly
//! `concurrency` tasks pull from it until it is empty, and their results
//! flow over a bounded channel to a single collector.

use crate::error::{ScanError, ScanResult};
use crate::scanner::rate_limiter::RateLimiter;
use crate::scanner::traits::{ProbeResult, Prober};
use crate::types::Port;
use indicatif::ProgressBar;
use std::collections::VecDeque;
use std::net::{IpAddr, SocketAddr};
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinSet;
use tracing::debug;

/// Upper bound on probes in flight for one host.
pub const MAX_CONCURRENCY: usize = 65_536;

/// Outcome of a completed host scan.
#[derive(Debug, Clone)]
pub struct HostScan {
    /// The address that was probed.
    pub address: IpAddr,
    /// Classified results, at most one per port, in completion order.
    pub results: Vec<ProbeResult>,
    /// Probes that ended in an unclassified error and were dropped.
    pub unclassified: usize,
    pub duration: Duration,
}

impl HostScan {
    /// Open ports in ascending order.
    pub fn open_ports(&self) -> Vec<Port> {
        let mut open: Vec<Port> = self
            .results
            .iter()
            .filter(|r| r.is_open())
            .map(|r| r.port)
            .collect();
        open.sort_unstable();
        open
    }
}

/// Scans one host with a bounded pool of concurrent probes.
pub struct HostScanner {
    prober: Arc<dyn Prober>,
    concurrency: NonZeroUsize,
    rate_limiter: Option<RateLimiter>,
    progress: Option<ProgressBar>,
}

impl HostScanner {
    pub fn new(prober: Arc<dyn Prober>, concurrency: NonZeroUsize) -> Self {
        Self {
            prober,
            concurrency,
            rate_limiter: None,
            progress: None,
        }
    }

    /// Cap the number of probes per second.
    pub fn with_rate_limiter(mut self, limiter: Option<RateLimiter>) -> Self {
        self.rate_limiter = limiter;
        self
    }

    /// Report progress on the given bar.
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency.get()
    }

    /// Probe every port in `ports` exactly once and wait for all pullers.
    ///
    /// A probe that cannot be issued at all fails the whole scan: the
    /// remaining ports are abandoned and nothing is returned.
    pub async fn scan(&self, address: IpAddr, ports: Vec<Port>) -> ScanResult<HostScan> {
        let start = Instant::now();
        let total = ports.len();
        let queue = Arc::new(Mutex::new(VecDeque::from(ports)));
        let pullers_count = self.concurrency.get().min(MAX_CONCURRENCY);
        let (tx, mut rx) = mpsc::channel(pullers_count * 2);

        if let Some(pb) = &self.progress {
            pb.set_length(total as u64);
        }

        let mut pullers = JoinSet::new();
        for _ in 0..pullers_count {
            let queue = Arc::clone(&queue);
            let tx = tx.clone();
            let prober = Arc::clone(&self.prober);
            let limiter = self.rate_limiter.clone();
            let progress = self.progress.clone();

            pullers.spawn(async move {
                loop {
                    let Some(port) = queue.lock().await.pop_front() else {
                        break;
                    };

                    if let Some(limiter) = &limiter {
                        limiter.wait().await;
                    }

                    let state = match prober.probe(SocketAddr::new(address, port.as_u16())).await {
                        Ok(state) => state,
                        Err(e) => {
                            queue.lock().await.clear();
                            return Err(e);
                        }
                    };

                    if let Some(pb) = &progress {
                        pb.inc(1);
                    }

                    if tx.send((port, state)).await.is_err() {
                        break;
                    }
                }
                Ok(())
            });
        }
        drop(tx);

        let mut results = Vec::with_capacity(total);
        let mut unclassified = 0;
        while let Some((port, state)) = rx.recv().await {
            match state {
                Some(state) => results.push(ProbeResult::new(port, state)),
                None => unclassified += 1,
            }
        }

        while let Some(joined) = pullers.join_next().await {
            joined.map_err(|e| ScanError::WorkerFailed(e.to_string()))??;
        }

        if let Some(pb) = &self.progress {
            pb.finish();
        }

        debug!(
            "{address}: {} results, {unclassified} unclassified",
            results.len()
        );

        Ok(HostScan {
            address,
            results,
            unclassified,
            duration: start.elapsed(),
        })
    }
}
