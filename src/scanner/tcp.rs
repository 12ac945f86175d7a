//! TCP connect prober.
//!
//! Performs standard TCP connect probes using the operating system's
//! socket API. Every socket is closed abortively (`SO_LINGER` with a zero
//! timeout) so a full-range scan does not leave tens of thousands of
//! sockets in TIME_WAIT and exhaust the ephemeral port range.

use crate::error::ProbeError;
use crate::scanner::traits::{PortState, ProbeOutcome, Prober};
use async_trait::async_trait;
use socket2::{Domain, Protocol, Socket, Type};
use std::io;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpSocket;
use tokio::time::timeout;
use tracing::debug;

/// TCP connect prober.
///
/// Does not require elevated privileges.
#[derive(Debug, Clone)]
pub struct TcpProber {
    timeout: Duration,
}

impl TcpProber {
    /// Create a new prober with the given per-connection timeout.
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

/// Non-lingering, non-blocking socket for one connect attempt.
fn open_socket(addr: SocketAddr) -> io::Result<TcpSocket> {
    let socket = Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))?;
    socket.set_linger(Some(Duration::ZERO))?;
    socket.set_nonblocking(true)?;

    Ok(TcpSocket::from_std_stream(socket.into()))
}

#[async_trait]
impl Prober for TcpProber {
    async fn probe(&self, addr: SocketAddr) -> ProbeOutcome {
        let socket = open_socket(addr).map_err(|source| ProbeError { addr, source })?;

        match timeout(self.timeout, socket.connect(addr)).await {
            Ok(Ok(stream)) => {
                debug!("{addr} - tcp open");
                // Dropping sends RST because of the zero linger.
                drop(stream);
                Ok(Some(PortState::Open))
            }
            Ok(Err(e)) => classify_error(addr, e),
            Err(_) => Ok(Some(PortState::Filtered)),
        }
    }
}

/// Map a connect error to a port state.
///
/// Local resource exhaustion is a probe failure. Other errors besides
/// refusal and timeout carry no information about the port and are dropped.
fn classify_error(addr: SocketAddr, err: io::Error) -> ProbeOutcome {
    if is_local_failure(&err) {
        return Err(ProbeError { addr, source: err });
    }

    match err.kind() {
        io::ErrorKind::ConnectionRefused => {
            debug!("{addr} - tcp closed");
            Ok(Some(PortState::Closed))
        }
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => Ok(Some(PortState::Filtered)),
        _ => {
            debug!("{addr} - unclassified connect error: {err}");
            Ok(None)
        }
    }
}

/// Out of descriptors, buffers, memory or ephemeral ports.
fn is_local_failure(err: &io::Error) -> bool {
    is_exhaustion_errno(err)
        || matches!(
            err.kind(),
            io::ErrorKind::AddrNotAvailable | io::ErrorKind::OutOfMemory
        )
}

#[cfg(unix)]
fn is_exhaustion_errno(err: &io::Error) -> bool {
    matches!(
        err.raw_os_error(),
        Some(libc::EMFILE | libc::ENFILE | libc::ENOBUFS | libc::ENOMEM)
    )
}

#[cfg(not(unix))]
fn is_exhaustion_errno(_err: &io::Error) -> bool {
    false
}
