//! One host scan as an independently running unit of work.

use crate::error::{ScanError, ScanResult};
use crate::scanner::{HostScan, HostScanner, ProbeResult, Prober, RateLimiter, TcpProber};
use crate::types::{DnsResolver, HostAddr, Port, PortSpec};
use indicatif::ProgressBar;
use std::collections::BTreeSet;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::{JoinError, JoinHandle};
use tokio::time;
use tracing::{info, warn};

/// Scan settings for one configured host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostSpec {
    /// Display name, the key of the server in the config file.
    pub name: String,
    /// IP literal or hostname.
    pub host: String,
    /// Ports allowed to be open. `None` means nothing is expected.
    pub expected_ports: Option<BTreeSet<Port>>,
    /// Ports to probe.
    pub ports: PortSpec,
    pub concurrency: NonZeroUsize,
    /// Per-connection timeout.
    pub timeout: Duration,
    /// Probes per second, 0 for unlimited.
    pub rate_limit: u32,
}

impl HostSpec {
    pub fn new(
        name: impl Into<String>,
        host: impl Into<String>,
        concurrency: NonZeroUsize,
        timeout: Duration,
    ) -> Self {
        Self {
            name: name.into(),
            host: host.into(),
            expected_ports: None,
            ports: PortSpec::full(),
            concurrency,
            timeout,
            rate_limit: 0,
        }
    }

    pub fn with_expected_ports(mut self, ports: impl IntoIterator<Item = u16>) -> Self {
        self.expected_ports = Some(ports.into_iter().map(Port::new).collect());
        self
    }

    pub fn with_ports(mut self, ports: PortSpec) -> Self {
        self.ports = ports;
        self
    }

    pub fn with_rate_limit(mut self, rate: u32) -> Self {
        self.rate_limit = rate;
        self
    }

    /// Budget units a running scan of this host consumes: its pullers
    /// plus the task coordinating them.
    pub fn cost(&self) -> usize {
        self.concurrency.get() + 1
    }
}

enum WorkerState {
    Pending,
    Running(JoinHandle<ScanResult<HostScan>>),
    Finished(ScanResult<HostScan>),
}

/// Wraps a [`HostScanner`] with its host configuration.
///
/// Moves from pending to running to finished exactly once. A worker is
/// done only when its scan completed without an unrecoverable failure.
pub struct HostWorker {
    spec: HostSpec,
    scanner: Option<HostScanner>,
    resolver: Option<DnsResolver>,
    state: WorkerState,
}

impl HostWorker {
    pub fn new(spec: HostSpec, prober: Arc<dyn Prober>) -> Self {
        let scanner = HostScanner::new(prober, spec.concurrency)
            .with_rate_limiter(RateLimiter::from_rate(spec.rate_limit));

        Self {
            spec,
            scanner: Some(scanner),
            resolver: None,
            state: WorkerState::Pending,
        }
    }

    /// Worker probing with real TCP connects.
    pub fn tcp(spec: HostSpec) -> Self {
        let prober = Arc::new(TcpProber::new(spec.timeout));
        Self::new(spec, prober)
    }

    /// Resolve hostnames through `resolver`. Without one, a hostname gets
    /// a system resolver of its own.
    pub fn with_resolver(mut self, resolver: DnsResolver) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Report scan progress on the given bar. Has no effect once started.
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.scanner = self.scanner.map(|scanner| scanner.with_progress(progress));
        self
    }

    /// Launch the scan in the background. Calling it twice is a no-op.
    pub fn start(&mut self) {
        let Some(scanner) = self.scanner.take() else {
            warn!("{} already started", self.spec.name);
            return;
        };

        info!(
            "starting {} ({} threads)",
            self.spec.name,
            scanner.concurrency()
        );

        let host = self.spec.host.clone();
        let ports = self.spec.ports.to_ports();
        let resolver = self.resolver.clone();
        let handle = tokio::spawn(resolve_and_scan(scanner, host, ports, resolver));

        self.state = WorkerState::Running(handle);
    }

    /// Wait at most `wait` for the scan to finish.
    ///
    /// Returns `true` once the worker has finished, successfully or not.
    pub async fn poll_done(&mut self, wait: Duration) -> bool {
        let WorkerState::Running(handle) = &mut self.state else {
            return self.is_finished();
        };

        match time::timeout(wait, handle).await {
            Ok(joined) => {
                self.finish(joined);
                true
            }
            Err(_) => false,
        }
    }

    /// Wait without bound for the scan to finish.
    pub async fn wait(&mut self) {
        if let WorkerState::Running(handle) = &mut self.state {
            let joined = handle.await;
            self.finish(joined);
        }
    }

    fn finish(&mut self, joined: Result<ScanResult<HostScan>, JoinError>) {
        let outcome = joined
            .map_err(|e| ScanError::WorkerFailed(e.to_string()))
            .and_then(|scan| scan);

        match &outcome {
            Ok(scan) => info!(
                "finished {} in {:.1}s",
                self.spec.name,
                scan.duration.as_secs_f64()
            ),
            Err(e) => warn!("scanning {} failed: {e}", self.spec.name),
        }

        self.state = WorkerState::Finished(outcome);
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.state, WorkerState::Finished(_))
    }

    /// Finished without an unrecoverable failure.
    pub fn is_done(&self) -> bool {
        matches!(self.state, WorkerState::Finished(Ok(_)))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.state, WorkerState::Finished(Err(_)))
    }

    /// Completed scan, only available when done.
    pub fn scan(&self) -> Option<&HostScan> {
        match &self.state {
            WorkerState::Finished(Ok(scan)) => Some(scan),
            _ => None,
        }
    }

    /// Results of a completed scan; empty unless done.
    pub fn results(&self) -> &[ProbeResult] {
        match self.scan() {
            Some(scan) => &scan.results,
            None => &[],
        }
    }

    pub fn failure(&self) -> Option<&ScanError> {
        match &self.state {
            WorkerState::Finished(Err(e)) => Some(e),
            _ => None,
        }
    }

    /// Whether `port` is on this host's allow-list.
    pub fn is_expected(&self, port: Port) -> bool {
        self.spec
            .expected_ports
            .as_ref()
            .is_some_and(|ports| ports.contains(&port))
    }

    pub fn cost(&self) -> usize {
        self.spec.cost()
    }

    pub fn name(&self) -> &str {
        &self.spec.name
    }

    pub fn host(&self) -> &str {
        &self.spec.host
    }

    pub fn spec(&self) -> &HostSpec {
        &self.spec
    }
}

async fn resolve_and_scan(
    scanner: HostScanner,
    host: String,
    ports: Vec<Port>,
    resolver: Option<DnsResolver>,
) -> ScanResult<HostScan> {
    let address = match HostAddr::parse(&host)? {
        HostAddr::Ip(ip) => ip,
        name => {
            let resolver = resolver.unwrap_or_else(DnsResolver::system);
            name.resolve(&resolver).await?
        }
    };
    scanner.scan(address, ports).await
}

impl std::fmt::Debug for HostWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match &self.state {
            WorkerState::Pending => "pending",
            WorkerState::Running(_) => "running",
            WorkerState::Finished(Ok(_)) => "done",
            WorkerState::Finished(Err(_)) => "failed",
        };
        f.debug_struct("HostWorker")
            .field("name", &self.spec.name)
            .field("host", &self.spec.host)
            .field("state", &state)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::host::tests::{FixedProber, PanickingProber};

    fn spec(name: &str, concurrency: usize) -> HostSpec {
        HostSpec::new(
            name,
            "127.0.0.1",
            NonZeroUsize::new(concurrency).unwrap(),
            Duration::from_millis(100),
        )
        .with_ports("1-50".parse().unwrap())
    }

    #[test]
    fn test_cost_includes_coordinator() {
        assert_eq!(spec("a", 200).cost(), 201);
        assert_eq!(spec("a", 1).cost(), 2);
    }

    #[test]
    fn test_is_expected() {
        let prober = Arc::new(FixedProber::new(&[]));
        let worker = HostWorker::new(spec("a", 2).with_expected_ports([22, 443]), prober.clone());
        assert!(worker.is_expected(Port::new(22)));
        assert!(!worker.is_expected(Port::new(80)));

        let worker = HostWorker::new(spec("b", 2), prober);
        assert!(!worker.is_expected(Port::new(22)));
    }

    #[tokio::test]
    async fn test_worker_lifecycle() {
        let mut worker = HostWorker::new(spec("web", 4), Arc::new(FixedProber::new(&[22])));
        assert!(!worker.poll_done(Duration::from_millis(1)).await);
        assert!(!worker.is_finished());

        worker.start();
        assert!(format!("{worker:?}").contains("running"));
        worker.wait().await;

        assert!(worker.is_done());
        assert!(!worker.is_failed());
        assert_eq!(worker.results().len(), 50);
        assert!(worker.poll_done(Duration::ZERO).await);
    }

    #[tokio::test]
    async fn test_poll_done_times_out_while_running() {
        let prober = Arc::new(FixedProber::new(&[]).with_delay(Duration::from_millis(50)));
        let mut worker = HostWorker::new(spec("slow", 1), prober);

        worker.start();
        assert!(!worker.poll_done(Duration::from_millis(5)).await);
        while !worker.poll_done(Duration::from_millis(100)).await {}
        assert!(worker.is_done());
    }

    #[tokio::test]
    async fn test_failed_worker_is_not_done() {
        let mut worker = HostWorker::new(spec("broken", 2), Arc::new(PanickingProber));
        worker.start();
        worker.wait().await;

        assert!(worker.is_finished());
        assert!(worker.is_failed());
        assert!(!worker.is_done());
        assert!(worker.results().is_empty());
        assert!(worker.failure().is_some());
    }

    #[tokio::test]
    async fn test_invalid_host_fails_worker() {
        let spec = HostSpec::new(
            "bad",
            "not a host",
            NonZeroUsize::new(1).unwrap(),
            Duration::from_millis(10),
        );
        let mut worker = HostWorker::new(spec, Arc::new(FixedProber::new(&[])));
        worker.start();
        worker.wait().await;

        assert!(matches!(worker.failure(), Some(ScanError::Resolve(_))));
    }

    #[tokio::test]
    async fn test_start_twice_is_noop() {
        let mut worker = HostWorker::new(spec("twice", 2), Arc::new(FixedProber::new(&[])));
        worker.start();
        worker.start();
        worker.wait().await;
        assert!(worker.is_done());
    }
}
