//! Prober trait abstraction.
//!
//! Defines the single-probe interface the host scanner drives, so the
//! TCP implementation can be swapped for deterministic responders in tests.

use crate::error::ProbeError;
use crate::types::Port;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::SocketAddr;

/// Classified outcome of one probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortState {
    /// The connection was established.
    Open,
    /// The remote actively refused the connection.
    Closed,
    /// The attempt timed out or got no answer.
    Filtered,
}

impl fmt::Display for PortState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open => write!(f, "open"),
            Self::Closed => write!(f, "closed"),
            Self::Filtered => write!(f, "filtered"),
        }
    }
}

/// Result of probing a single port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeResult {
    /// The port number that was probed.
    pub port: Port,
    /// State determined by the probe.
    pub state: PortState,
}

impl ProbeResult {
    pub fn new(port: Port, state: PortState) -> Self {
        Self { port, state }
    }

    pub fn is_open(&self) -> bool {
        self.state == PortState::Open
    }
}

/// What one probe produced.
///
/// `Ok(None)` means the remote answered in a way that maps to no
/// [`PortState`]; such ports are left out of the host's result set.
/// `Err` means no probe could be sent at all, which fails the host scan.
pub type ProbeOutcome = Result<Option<PortState>, ProbeError>;

/// Trait for single-port probe implementations.
///
/// # Example
///
/// ```ignore
/// use portwarden::scanner::{Prober, TcpProber};
///
/// let prober = TcpProber::new(Duration::from_secs(2));
/// let state = prober.probe("192.0.2.1:22".parse()?).await?;
/// ```
#[async_trait]
pub trait Prober: Send + Sync {
    /// Probe one address.
    async fn probe(&self, addr: SocketAddr) -> ProbeOutcome;
}
