//! Fleet configuration file.
//!
//! Maps server names to the host to probe and its allow-list:
//!
//! ```toml
//! [telegram]
//! chat-id = "-100123456"
//! token = "123456:ABC"
//!
//! [servers.web]
//! host = "203.0.113.10"
//! opened = [22, 80, 443]
//! concurrency = 100
//! timeout = 3
//! ```
//!
//! Servers are admitted in the order they appear in the file.

use crate::config::settings::ScanDefaults;
use crate::error::{ConfigError, ConfigResult};
use crate::fleet::HostSpec;
use crate::scanner::MAX_CONCURRENCY;
use crate::types::PortSpec;
use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer};
use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::num::NonZeroUsize;
use std::path::Path;
use std::time::Duration;

/// One `[servers.<name>]` entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerEntry {
    /// IP literal or hostname.
    pub host: String,
    /// Ports expected to be open.
    #[serde(default)]
    pub opened: Option<Vec<u16>>,
    /// Concurrent probes, CLI default otherwise.
    #[serde(default)]
    pub concurrency: Option<usize>,
    /// Per-connection timeout in seconds, CLI default otherwise.
    #[serde(default)]
    pub timeout: Option<u64>,
    /// Port set to probe, CLI default otherwise.
    #[serde(default)]
    pub ports: Option<String>,
    /// Probes per second, 0 for unlimited.
    #[serde(default)]
    pub rate: Option<u32>,
}

impl ServerEntry {
    /// Merge with the run defaults into a validated host spec.
    pub fn to_host_spec(&self, name: &str, defaults: &ScanDefaults) -> ConfigResult<HostSpec> {
        let invalid = |reason: &str| ConfigError::InvalidServer {
            name: name.to_string(),
            reason: reason.to_string(),
        };

        if self.host.trim().is_empty() {
            return Err(invalid("host cannot be empty"));
        }

        let concurrency = match self.concurrency {
            Some(n) if n > MAX_CONCURRENCY => {
                return Err(invalid(&format!("concurrency must be at most {MAX_CONCURRENCY}")))
            }
            Some(n) => NonZeroUsize::new(n).ok_or_else(|| invalid("concurrency must be > 0"))?,
            None => defaults.concurrency,
        };

        let timeout = match self.timeout {
            Some(0) => return Err(invalid("timeout must be > 0")),
            Some(secs) => Duration::from_secs(secs),
            None => defaults.timeout,
        };

        let ports = match &self.ports {
            Some(spec) => spec
                .parse::<PortSpec>()
                .map_err(|e| invalid(&e.to_string()))?,
            None => defaults.ports.clone(),
        };

        let mut spec = HostSpec::new(name, self.host.trim(), concurrency, timeout)
            .with_ports(ports)
            .with_rate_limit(self.rate.unwrap_or(defaults.rate_limit));
        if let Some(opened) = &self.opened {
            spec = spec.with_expected_ports(opened.iter().copied());
        }

        Ok(spec)
    }
}

/// Server entries in file order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerList(pub Vec<(String, ServerEntry)>);

impl<'de> Deserialize<'de> for ServerList {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ServerListVisitor;

        impl<'de> Visitor<'de> for ServerListVisitor {
            type Value = ServerList;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of server names to server entries")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<ServerList, A::Error> {
                let mut servers = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some((name, entry)) = map.next_entry::<String, ServerEntry>()? {
                    servers.push((name, entry));
                }
                Ok(ServerList(servers))
            }
        }

        deserializer.deserialize_map(ServerListVisitor)
    }
}

/// Telegram chat ids are numeric, channel usernames are strings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ChatId {
    Id(i64),
    Name(String),
}

impl fmt::Display for ChatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "{id}"),
            Self::Name(name) => write!(f, "{name}"),
        }
    }
}

/// Credentials for alert delivery.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TelegramConfig {
    #[serde(rename = "chat-id")]
    pub chat_id: ChatId,
    pub token: String,
}

/// The whole configuration file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FleetConfig {
    #[serde(default)]
    pub servers: Option<ServerList>,
    #[serde(default)]
    pub telegram: Option<TelegramConfig>,
}

impl FleetConfig {
    /// Load from a TOML or JSON file, picked by extension.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::ReadFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::from_json_str(&contents),
            Some("toml") => Self::from_toml_str(&contents),
            _ => Self::parse_from_str(&contents),
        }
    }

    pub fn from_toml_str(contents: &str) -> ConfigResult<Self> {
        toml::from_str(contents).map_err(|e| ConfigError::InvalidFormat(e.to_string()))
    }

    pub fn from_json_str(contents: &str) -> ConfigResult<Self> {
        serde_json::from_str(contents).map_err(|e| ConfigError::InvalidFormat(e.to_string()))
    }

    /// Try TOML first, then JSON.
    fn parse_from_str(contents: &str) -> ConfigResult<Self> {
        Self::from_toml_str(contents).or_else(|toml_err| {
            Self::from_json_str(contents).map_err(|json_err| {
                ConfigError::InvalidFormat(format!(
                    "toml error: {toml_err}; json error: {json_err}"
                ))
            })
        })
    }

    /// Check the file before any scanning begins.
    ///
    /// Alert credentials are only required when alerts will be sent.
    pub fn validate(&self, require_telegram: bool) -> ConfigResult<()> {
        let servers = self
            .servers
            .as_ref()
            .ok_or(ConfigError::MissingSection("servers"))?;

        if servers.0.is_empty() {
            return Err(ConfigError::NoServers);
        }

        let mut seen = HashSet::new();
        for (name, _) in &servers.0 {
            if !seen.insert(name.as_str()) {
                return Err(ConfigError::InvalidServer {
                    name: name.clone(),
                    reason: "defined more than once".to_string(),
                });
            }
        }

        if require_telegram && self.telegram.is_none() {
            return Err(ConfigError::MissingSection("telegram"));
        }

        Ok(())
    }

    /// Host specs in file order, with defaults applied.
    pub fn host_specs(&self, defaults: &ScanDefaults) -> ConfigResult<Vec<HostSpec>> {
        let servers = self
            .servers
            .as_ref()
            .ok_or(ConfigError::MissingSection("servers"))?;

        servers
            .0
            .iter()
            .map(|(name, entry)| entry.to_host_spec(name, defaults))
            .collect()
    }
}
