//! Default paths and per-host scan defaults.

use crate::error::{ConfigError, ConfigResult};
use crate::types::PortSpec;
use directories::ProjectDirs;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::time::Duration;

/// Name of the fleet file inside the config directory.
pub const CONFIG_FILE_NAME: &str = "servers.toml";

/// Application directories following the XDG Base Directory Specification.
#[derive(Debug, Clone)]
pub struct Paths {
    /// Configuration directory (~/.config/portwarden)
    pub config_dir: PathBuf,
}

impl Paths {
    pub fn new() -> ConfigResult<Self> {
        let project = ProjectDirs::from("org", "portwarden", "portwarden")
            .ok_or(ConfigError::DirectoryNotFound)?;

        Ok(Self {
            config_dir: project.config_dir().to_path_buf(),
        })
    }

    /// Fleet file used when no `--config` is given.
    pub fn default_config_file(&self) -> PathBuf {
        self.config_dir.join(CONFIG_FILE_NAME)
    }
}

/// Values applied to servers that do not set their own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanDefaults {
    pub concurrency: NonZeroUsize,
    pub timeout: Duration,
    pub ports: PortSpec,
    /// Probes per second, 0 for unlimited.
    pub rate_limit: u32,
}

impl Default for ScanDefaults {
    fn default() -> Self {
        Self {
            concurrency: NonZeroUsize::new(200).unwrap_or(NonZeroUsize::MIN),
            timeout: Duration::from_secs(5),
            ports: PortSpec::full(),
            rate_limit: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_scan_settings() {
        let defaults = ScanDefaults::default();
        assert_eq!(defaults.concurrency.get(), 200);
        assert_eq!(defaults.timeout, Duration::from_secs(5));
        assert_eq!(defaults.ports.count(), 65536);
        assert_eq!(defaults.rate_limit, 0);
    }

    #[test]
    fn test_default_config_file_name() {
        let paths = Paths {
            config_dir: PathBuf::from("/home/ops/.config/portwarden"),
        };
        assert_eq!(
            paths.default_config_file(),
            PathBuf::from("/home/ops/.config/portwarden/servers.toml")
        );
    }
}
