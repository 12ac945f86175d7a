use portwarden::config::{FleetConfig, ScanDefaults};
use portwarden::fleet::{FleetScheduler, HostSpec, HostWorker, ThreadBudget};
use portwarden::report::{ResultAggregator, WarningKind};
use portwarden::scanner::{PortState, Prober, TcpProber};
use portwarden::types::{Port, PortSpec};
use std::io::Write;
use std::net::SocketAddr;
use std::num::NonZeroUsize;
use std::time::Duration;
use tokio::net::TcpListener;

const TIMEOUT: Duration = Duration::from_millis(500);

/// A listening loopback port and one that was just released.
async fn open_and_closed() -> (TcpListener, u16, u16) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let open = listener.local_addr().unwrap().port();

    let released = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let closed = released.local_addr().unwrap().port();
    drop(released);

    (listener, open, closed)
}

fn loopback_spec(name: &str, open: u16, closed: u16) -> HostSpec {
    let ports: PortSpec = format!("{open},{closed}").parse().unwrap();
    HostSpec::new(name, "127.0.0.1", NonZeroUsize::new(4).unwrap(), TIMEOUT).with_ports(ports)
}

#[tokio::test]
async fn test_tcp_prober_open_and_closed() {
    let (_listener, open, closed) = open_and_closed().await;
    let prober = TcpProber::new(TIMEOUT);

    let addr: SocketAddr = format!("127.0.0.1:{open}").parse().unwrap();
    assert_eq!(prober.probe(addr).await.unwrap(), Some(PortState::Open));

    let addr: SocketAddr = format!("127.0.0.1:{closed}").parse().unwrap();
    assert_eq!(prober.probe(addr).await.unwrap(), Some(PortState::Closed));
}

#[tokio::test]
async fn test_worker_diff_against_loopback() {
    let (_listener, open, closed) = open_and_closed().await;

    let mut worker = HostWorker::tcp(loopback_spec("local", open, closed).with_expected_ports([closed]));
    worker.start();
    worker.wait().await;
    assert!(worker.is_done());

    let aggregator = ResultAggregator::new(Vec::<u8>::new());
    aggregator.add(&worker).unwrap();

    let warnings = aggregator.warnings();
    assert_eq!(warnings.len(), 2);
    assert_eq!(warnings[0].port, Port::new(open));
    assert_eq!(warnings[0].kind, WarningKind::UnexpectedOpen);
    assert_eq!(warnings[1].port, Port::new(closed));
    assert_eq!(warnings[1].kind, WarningKind::ExpectedClosed);

    let text = String::from_utf8(aggregator.into_writer()).unwrap();
    assert!(text.contains(&format!("{open} opened")));
    assert!(text.contains(&format!("{closed} not opened")));
}

#[tokio::test]
async fn test_fleet_run_is_repeatable() {
    let (_listener, open, closed) = open_and_closed().await;

    let mut runs = Vec::new();
    for _ in 0..2 {
        let workers: Vec<HostWorker> = ["a", "b", "c"]
            .iter()
            .map(|name| HostWorker::tcp(loopback_spec(name, open, closed).with_expected_ports([open])))
            .collect();

        let aggregator = ResultAggregator::new(std::io::sink());
        let summary = FleetScheduler::new(ThreadBudget::from_limit(11))
            .run(workers, &aggregator)
            .await;

        assert_eq!(summary.hosts, 3);
        assert_eq!(summary.failed, 0);
        assert!(summary.peak_cost <= 11);
        assert!(!aggregator.has_warnings());

        let mut names: Vec<String> = aggregator.reports().into_iter().map(|r| r.name).collect();
        names.sort();
        runs.push(names);
    }

    assert_eq!(runs[0], runs[1]);
}

#[tokio::test]
async fn test_unresolvable_host_fails_alone() {
    let (_listener, open, closed) = open_and_closed().await;

    let broken = HostSpec::new(
        "broken",
        "not a valid host!",
        NonZeroUsize::new(2).unwrap(),
        TIMEOUT,
    );
    let workers = vec![
        HostWorker::tcp(broken.with_expected_ports([22])),
        HostWorker::tcp(loopback_spec("local", open, closed)),
    ];

    let aggregator = ResultAggregator::new(std::io::sink());
    let summary = FleetScheduler::new(ThreadBudget::Unbounded)
        .run(workers, &aggregator)
        .await;

    assert_eq!(summary.hosts, 2);
    assert_eq!(summary.failed, 1);

    // Only the healthy host is diffed: its open port has no allow-list.
    let warnings = aggregator.warnings();
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].name, "local");
    assert_eq!(warnings[0].port, Port::new(open));
}

#[tokio::test]
async fn test_config_file_to_alert() {
    let (_listener, open, closed) = open_and_closed().await;

    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    write!(
        file,
        r#"
[telegram]
chat-id = 42
token = "t"

[servers.second]
host = "127.0.0.1"
ports = "{open},{closed}"
opened = [{open}]

[servers.first]
host = "127.0.0.1"
ports = "{open},{closed}"
opened = [{closed}]
"#
    )
    .unwrap();

    let config = FleetConfig::load(file.path()).unwrap();
    config.validate(true).unwrap();

    let defaults = ScanDefaults {
        timeout: TIMEOUT,
        ..ScanDefaults::default()
    };
    let workers: Vec<HostWorker> = config
        .host_specs(&defaults)
        .unwrap()
        .into_iter()
        .map(HostWorker::tcp)
        .collect();
    assert_eq!(workers[0].name(), "second");

    let aggregator = ResultAggregator::new(std::io::sink());
    FleetScheduler::new(ThreadBudget::Unbounded)
        .run(workers, &aggregator)
        .await;

    let payload = aggregator.build_alert_payload();
    assert!(payload.starts_with("<b>❗️Attention!</b>\n\n"));
    assert!(payload.contains(&format!("<b>first</b> (127.0.0.1): port {open} is open")));
    assert!(payload.contains(&format!("<b>first</b> (127.0.0.1): port {closed} is NOT open")));
    assert!(!payload.contains("second"));
}
