//! Allow-list deviations and per-host reports.

use crate::fleet::HostWorker;
use crate::types::Port;
use serde::Serialize;
use std::fmt;
use std::net::IpAddr;

/// How an observed port deviates from the allow-list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    /// Open but not on the allow-list.
    UnexpectedOpen,
    /// On the allow-list but not observed open.
    ExpectedClosed,
}

impl fmt::Display for WarningKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnexpectedOpen => write!(f, "is open"),
            Self::ExpectedClosed => write!(f, "is NOT open"),
        }
    }
}

/// One alert-worthy finding on one host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Warning {
    pub name: String,
    pub host: String,
    pub port: Port,
    pub kind: WarningKind,
}

impl Warning {
    /// HTML rendering used in alert messages.
    pub fn to_html(&self) -> String {
        format!(
            "<b>{}</b> ({}): port {} {}",
            escape_html(&self.name),
            escape_html(&self.host),
            self.port,
            self.kind
        )
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): port {} {}", self.name, self.host, self.port, self.kind)
    }
}

/// An open port and whether the allow-list permits it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OpenPort {
    pub port: Port,
    pub expected: bool,
}

/// What a host scan amounted to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum HostOutcome {
    Failed {
        reason: String,
    },
    Scanned {
        address: IpAddr,
        open: Vec<OpenPort>,
        missing: Vec<Port>,
        unclassified: usize,
        duration_ms: u64,
    },
}

/// Allow-list diff of one finished host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HostReport {
    pub name: String,
    pub host: String,
    #[serde(flatten)]
    pub outcome: HostOutcome,
}

impl HostReport {
    /// Diff a finished worker against its allow-list.
    ///
    /// A worker that is not done yields a failure report and is never
    /// compared, whatever it may have collected.
    pub fn from_worker(worker: &HostWorker) -> Self {
        let outcome = match worker.scan() {
            None => HostOutcome::Failed {
                reason: worker
                    .failure()
                    .map_or_else(|| "scan did not finish".to_string(), |e| e.to_string()),
            },
            Some(scan) => {
                let observed = scan.open_ports();
                let open = observed
                    .iter()
                    .map(|&port| OpenPort {
                        port,
                        expected: worker.is_expected(port),
                    })
                    .collect();
                let missing = worker
                    .spec()
                    .expected_ports
                    .iter()
                    .flatten()
                    .filter(|port| observed.binary_search(port).is_err())
                    .copied()
                    .collect();

                HostOutcome::Scanned {
                    address: scan.address,
                    open,
                    missing,
                    unclassified: scan.unclassified,
                    duration_ms: scan.duration.as_millis() as u64,
                }
            }
        };

        Self {
            name: worker.name().to_string(),
            host: worker.host().to_string(),
            outcome,
        }
    }

    /// Header label: `name (host)`, or just the host when they match.
    pub fn label(&self) -> String {
        if self.name == self.host {
            self.host.clone()
        } else {
            format!("{} ({})", self.name, self.host)
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.outcome, HostOutcome::Failed { .. })
    }

    /// Findings in report order: unexpected open ports, then missing ones.
    pub fn warnings(&self) -> Vec<Warning> {
        let HostOutcome::Scanned { open, missing, .. } = &self.outcome else {
            return Vec::new();
        };

        let unexpected = open
            .iter()
            .filter(|p| !p.expected)
            .map(|p| (p.port, WarningKind::UnexpectedOpen));
        let closed = missing.iter().map(|&port| (port, WarningKind::ExpectedClosed));

        unexpected
            .chain(closed)
            .map(|(port, kind)| Warning {
                name: self.name.clone(),
                host: self.host.clone(),
                port,
                kind,
            })
            .collect()
    }
}

/// Escape text for Telegram's HTML parse mode.
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}
