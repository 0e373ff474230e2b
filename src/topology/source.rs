/*!
Display-name lookup for polled devices.

This module defines:
- `HostNameResolver`: an async trait returning the name to show for an address, if one is known.
- `StaticNameResolver`: a resolver backed by a fixed address -> name table.

A miss is not an error. The builder falls back to the address text.
*/

use std::{collections::HashMap, net::IpAddr, path::Path};

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NameSourceError {
    #[error("cannot read host names from {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("host name file {path} is not a JSON object of address -> name: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

#[async_trait]
pub trait HostNameResolver: Send + Sync + 'static {
    async fn resolve(&self, address: IpAddr) -> Option<String>;
}

#[derive(Debug, Clone, Default)]
pub struct StaticNameResolver {
    names: HashMap<IpAddr, String>,
}

impl StaticNameResolver {
    pub fn new(names: HashMap<IpAddr, String>) -> Self {
        Self { names }
    }

    /// Reads a JSON object such as `{"10.0.0.1": "core-sw1"}`.
    pub fn from_file(path: &Path) -> Result<Self, NameSourceError> {
        let json = std::fs::read_to_string(path).map_err(|source| NameSourceError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let names = serde_json::from_str(&json).map_err(|source| NameSourceError::Parse {
            path: path.display().to_string(),
            source,
        })?;
        Ok(Self { names })
    }

    /// Adds `other`'s names; entries already present win.
    pub fn merged_with(mut self, other: HashMap<IpAddr, String>) -> Self {
        for (address, name) in other {
            self.names.entry(address).or_insert(name);
        }
        self
    }

    pub fn into_names(self) -> HashMap<IpAddr, String> {
        self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[async_trait]
impl HostNameResolver for StaticNameResolver {
    async fn resolve(&self, address: IpAddr) -> Option<String> {
        self.names
            .get(&address)
            .map(|name| name.trim())
            .filter(|name| !name.is_empty())
            .map(str::to_string)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    #[tokio::test]
    async fn test_static_resolver() {
        let resolver = StaticNameResolver::new(HashMap::from([
            (ip("10.0.0.1"), "deviceX".to_string()),
            (ip("10.0.0.2"), "  ".to_string()),
        ]));
        assert_eq!(resolver.resolve(ip("10.0.0.1")).await.as_deref(), Some("deviceX"));
        assert_eq!(resolver.resolve(ip("10.0.0.2")).await, None);
        assert_eq!(resolver.resolve(ip("10.0.0.3")).await, None);
    }

    #[test]
    fn test_inline_names_win_over_file() {
        let resolver = StaticNameResolver::new(HashMap::from([(ip("10.0.0.1"), "inline".to_string())]))
            .merged_with(HashMap::from([
                (ip("10.0.0.1"), "from-file".to_string()),
                (ip("10.0.0.9"), "edge".to_string()),
            ]));
        assert_eq!(resolver.names[&ip("10.0.0.1")], "inline");
        assert_eq!(resolver.len(), 2);
    }

    #[test]
    fn test_from_file_errors() {
        let err = StaticNameResolver::from_file(Path::new("/nonexistent/hosts.json")).unwrap_err();
        assert!(matches!(err, NameSourceError::Io { .. }));

        let path = std::env::temp_dir().join(format!("snmp-topology-names-{}.json", std::process::id()));
        std::fs::write(&path, r#"["not", "a", "map"]"#).unwrap();
        let err = StaticNameResolver::from_file(&path).unwrap_err();
        std::fs::remove_file(&path).unwrap();
        assert!(matches!(err, NameSourceError::Parse { .. }));
    }

    #[test]
    fn test_from_file() {
        let path = std::env::temp_dir().join(format!("snmp-topology-hosts-{}.json", std::process::id()));
        std::fs::write(&path, r#"{"192.168.62.1": "core-sw1", "fd00::1": "v6-rtr"}"#).unwrap();
        let resolver = StaticNameResolver::from_file(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(resolver.names[&ip("fd00::1")], "v6-rtr");
        assert_eq!(resolver.len(), 2);
    }
}
