//! Ports, port sets and server addresses.

mod port;
mod target;

pub use port::{Port, PortError, PortSpec};
pub use target::{DnsResolver, HostAddr, ResolveError};
