//! Error types for portwarden.
//!
//! Uses `thiserror` for ergonomic error definitions. Per-port connect outcomes
//! are not errors; they are classified into [`crate::scanner::PortState`].

use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;
use thiserror::Error;

use crate::types::ResolveError;

/// Unrecoverable failure of a host scan.
///
/// Any of these marks the owning worker as failed: no diff is computed
/// and no partial results are reported.
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("failed to resolve host: {0}")]
    Resolve(#[from] ResolveError),

    #[error("scan worker failed: {0}")]
    WorkerFailed(String),

    #[error("local probe failure: {0}")]
    Probe(#[from] ProbeError),
}

/// The local side could not issue a probe, e.g. it ran out of file
/// descriptors. Says nothing about the remote port.
#[derive(Error, Debug)]
#[error("cannot probe {addr}: {source}")]
pub struct ProbeError {
    pub addr: SocketAddr,
    pub source: io::Error,
}

/// Configuration loading and validation errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("could not determine configuration directory")]
    DirectoryNotFound,

    #[error("failed to read {}: {reason}", path.display())]
    ReadFailed { path: PathBuf, reason: String },

    #[error("invalid configuration format: {0}")]
    InvalidFormat(String),

    #[error("missing configuration section: {0}")]
    MissingSection(&'static str),

    #[error("no servers configured")]
    NoServers,

    #[error("server '{name}': {reason}")]
    InvalidServer { name: String, reason: String },
}

/// Alert delivery errors.
#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("message rejected: {0}")]
    Rejected(String),
}

/// Result type alias for scan operations.
pub type ScanResult<T> = Result<T, ScanError>;

/// Result type alias for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Result type alias for alert delivery.
pub type NotifyResult<T> = Result<T, NotifyError>;
