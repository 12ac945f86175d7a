//! Ports and port sets.
//!
//! A [`PortSpec`] is written as a comma-separated list of ports and
//! inclusive ranges, e.g. `"22,80,8000-9000"`. The default covers every
//! port from 0 to 65535.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

/// A TCP port number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Port(u16);

impl Port {
    #[inline]
    pub const fn new(port: u16) -> Self {
        Self(port)
    }

    #[inline]
    pub const fn as_u16(self) -> u16 {
        self.0
    }
}

impl fmt::Display for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl From<u16> for Port {
    fn from(value: u16) -> Self {
        Self(value)
    }
}

impl From<Port> for u16 {
    fn from(port: Port) -> Self {
        port.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PortError {
    #[error("'{0}' is not a port number")]
    NotANumber(String),
    #[error("port range {0}-{1} is reversed")]
    Reversed(u16, u16),
    #[error("no ports given")]
    Empty,
}

/// A set of ports to probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortSpec {
    ranges: Vec<RangeInclusive<u16>>,
}

impl PortSpec {
    /// Every port, 0 through 65535.
    pub fn full() -> Self {
        Self {
            ranges: vec![0..=u16::MAX],
        }
    }

    /// Ports in ascending order, each listed once.
    pub fn to_ports(&self) -> Vec<Port> {
        let mut ports: Vec<Port> = self.ranges.iter().cloned().flatten().map(Port).collect();
        ports.sort_unstable();
        ports.dedup();
        ports
    }

    pub fn count(&self) -> usize {
        self.to_ports().len()
    }
}

impl Default for PortSpec {
    fn default() -> Self {
        Self::full()
    }
}

impl FromStr for PortSpec {
    type Err = PortError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().is_empty() {
            return Err(PortError::Empty);
        }

        let ranges = s
            .split(',')
            .map(|part| parse_range(part.trim()))
            .collect::<Result<_, _>>()?;

        Ok(Self { ranges })
    }
}

fn parse_range(part: &str) -> Result<RangeInclusive<u16>, PortError> {
    let number = |s: &str| {
        s.trim()
            .parse::<u16>()
            .map_err(|_| PortError::NotANumber(s.trim().to_string()))
    };

    match part.split_once('-') {
        Some((lo, hi)) => {
            let (lo, hi) = (number(lo)?, number(hi)?);
            if lo > hi {
                return Err(PortError::Reversed(lo, hi));
            }
            Ok(lo..=hi)
        }
        None => number(part).map(|port| port..=port),
    }
}

impl fmt::Display for PortSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, range) in self.ranges.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            if range.start() == range.end() {
                write!(f, "{}", range.start())?;
            } else {
                write!(f, "{}-{}", range.start(), range.end())?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_spec_covers_every_port() {
        let spec = PortSpec::full();
        let ports = spec.to_ports();
        assert_eq!(ports.len(), 65536);
        assert_eq!(ports.first(), Some(&Port::new(0)));
        assert_eq!(ports.last(), Some(&Port::new(65535)));
        assert_eq!(spec.to_string(), "0-65535");
        assert_eq!("0-65535".parse::<PortSpec>().unwrap(), spec);
    }

    #[test]
    fn test_mixed_spec() {
        let spec: PortSpec = " 22, 80 ,8000-8010".parse().unwrap();
        assert_eq!(spec.count(), 13);
        assert_eq!(spec.to_string(), "22,80,8000-8010");
    }

    #[test]
    fn test_overlaps_are_counted_once() {
        let spec: PortSpec = "443,80,80,440-445".parse().unwrap();
        let ports: Vec<u16> = spec.to_ports().into_iter().map(u16::from).collect();
        assert_eq!(ports, vec![80, 440, 441, 442, 443, 444, 445]);
    }

    #[test]
    fn test_rejects_garbage() {
        assert_eq!("".parse::<PortSpec>(), Err(PortError::Empty));
        assert_eq!("100-50".parse::<PortSpec>(), Err(PortError::Reversed(100, 50)));
        assert_eq!(
            "70000".parse::<PortSpec>(),
            Err(PortError::NotANumber("70000".to_string()))
        );
        assert!("http".parse::<PortSpec>().is_err());
        assert!("22,".parse::<PortSpec>().is_err());
    }
}
