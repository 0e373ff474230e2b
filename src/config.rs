/*!
Run configuration.

Loaded from a JSON document. Every field has a default, so `{"subnets": ["10.0.0.0/24"]}` is a
complete configuration for a v2c `public` community run.
*/

use std::{
    collections::HashMap,
    net::IpAddr,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    acquisition::snmp::SnmpOptions,
    neighbors::CorrelationPolicy,
    scanner::{DEFAULT_PROBE_TIMEOUT, DEFAULT_SCAN_CONCURRENCY},
    topology::builder::DEFAULT_POLL_CONCURRENCY,
};

/// Serde adapter for durations written as humantime strings ("1s", "250ms").
pub mod humantime_duration {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&humantime::format_duration(*duration).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        humantime::parse_duration(&s).map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid configuration in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// CIDR blocks to sweep
    pub subnets: Vec<String>,
    pub scan_concurrency: usize,
    pub poll_concurrency: usize,
    #[serde(with = "humantime_duration")]
    pub probe_timeout: Duration,
    pub snmp: SnmpOptions,
    /// Per-device SNMP settings that replace `snmp` entirely for that address
    pub device_overrides: HashMap<IpAddr, SnmpOptions>,
    /// Display names keyed by address
    pub host_names: HashMap<IpAddr, String>,
    /// JSON object of address -> display name, merged under `host_names`
    pub host_names_file: Option<PathBuf>,
    pub correlation: CorrelationPolicy,
    /// Address of the collecting host; detected from the routing table when absent
    pub local_address: Option<IpAddr>,
    pub output_dir: PathBuf,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            subnets: Vec::new(),
            scan_concurrency: DEFAULT_SCAN_CONCURRENCY,
            poll_concurrency: DEFAULT_POLL_CONCURRENCY,
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            snmp: SnmpOptions::default(),
            device_overrides: HashMap::new(),
            host_names: HashMap::new(),
            host_names_file: None,
            correlation: CorrelationPolicy::default(),
            local_address: None,
            output_dir: PathBuf::from("."),
        }
    }
}

impl DiscoveryConfig {
    pub fn from_json(path: &Path, json: &str) -> Result<Self, ConfigLoadError> {
        serde_json::from_str(json).map_err(|source| ConfigLoadError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn load(path: &Path) -> Result<Self, ConfigLoadError> {
        let json = std::fs::read_to_string(path).map_err(|source| ConfigLoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(path, &json)
    }
}
