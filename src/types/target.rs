//! Server addresses.
//!
//! A configured host is an IP literal or a DNS name. Names are looked up
//! when the host's scan starts, not when the configuration is loaded.

use std::fmt;
use std::net::IpAddr;
use trust_dns_resolver::config::{ResolverConfig, ResolverOpts};
use trust_dns_resolver::TokioAsyncResolver;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    #[error("'{0}' is neither an IP address nor a hostname")]
    Malformed(String),
    #[error("lookup of '{host}' failed: {reason}")]
    Lookup { host: String, reason: String },
    #[error("'{0}' has no addresses")]
    NoAddress(String),
}

/// DNS resolver shared by every host of a run.
///
/// Cloning is cheap; clones share one cache and connection pool.
#[derive(Clone)]
pub struct DnsResolver {
    inner: TokioAsyncResolver,
}

impl DnsResolver {
    /// Resolver configured like the system one (`/etc/resolv.conf` on
    /// Unix), including search domains and the hosts file. Falls back to
    /// public nameservers when the system configuration cannot be read.
    pub fn system() -> Self {
        let inner = TokioAsyncResolver::tokio_from_system_conf().unwrap_or_else(|e| {
            warn!("cannot read system resolver configuration ({e}), using public nameservers");
            TokioAsyncResolver::tokio(ResolverConfig::default(), ResolverOpts::default())
        });
        Self { inner }
    }

    /// First address `name` resolves to.
    pub async fn lookup(&self, name: &str) -> Result<IpAddr, ResolveError> {
        let lookup = self
            .inner
            .lookup_ip(name)
            .await
            .map_err(|e| ResolveError::Lookup {
                host: name.to_string(),
                reason: e.to_string(),
            })?;

        lookup
            .iter()
            .next()
            .ok_or_else(|| ResolveError::NoAddress(name.to_string()))
    }
}

impl fmt::Debug for DnsResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DnsResolver").finish_non_exhaustive()
    }
}

/// Where a server can be reached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostAddr {
    Ip(IpAddr),
    Name(String),
}

impl HostAddr {
    pub fn parse(s: &str) -> Result<Self, ResolveError> {
        let s = s.trim();

        if let Ok(ip) = s.parse() {
            Ok(Self::Ip(ip))
        } else if is_hostname(s) {
            Ok(Self::Name(s.to_string()))
        } else {
            Err(ResolveError::Malformed(s.to_string()))
        }
    }

    /// The address to scan. Names with several records use the first one.
    pub async fn resolve(&self, resolver: &DnsResolver) -> Result<IpAddr, ResolveError> {
        match self {
            Self::Ip(ip) => Ok(*ip),
            Self::Name(name) => resolver.lookup(name).await,
        }
    }
}

impl fmt::Display for HostAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ip(ip) => fmt::Display::fmt(ip, f),
            Self::Name(name) => f.write_str(name),
        }
    }
}

/// RFC 1123 host name, optionally fully qualified with a trailing dot.
fn is_hostname(s: &str) -> bool {
    let s = s.strip_suffix('.').unwrap_or(s);
    !s.is_empty() && s.len() <= 253 && s.split('.').all(is_label)
}

fn is_label(label: &str) -> bool {
    let bytes = label.as_bytes();
    match (bytes.first(), bytes.last()) {
        (Some(first), Some(last)) => {
            bytes.len() <= 63
                && first.is_ascii_alphanumeric()
                && last.is_ascii_alphanumeric()
                && bytes.iter().all(|b| b.is_ascii_alphanumeric() || *b == b'-')
        }
        _ => false,
    }
}
