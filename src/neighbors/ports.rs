use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{
    acquisition::{
        core::ManagementSession,
        walk::{WalkError, walk},
    },
    neighbors::table::IF_NAME_ROOT,
};

/// Shown in place of a local port that could not be resolved.
pub const UNKNOWN_PORT: &str = "N/A";

/// Interface index -> interface name for one device.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PortTable(BTreeMap<String, String>);

impl PortTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, index: impl Into<String>, name: impl Into<String>) {
        self.0.insert(index.into(), name.into());
    }

    pub fn get(&self, index: &str) -> Option<&str> {
        self.0.get(index).map(String::as_str)
    }

    /// Name for an optional interface reference, `N/A` when there is none or it is not in the table.
    pub fn label_for(&self, index: Option<&str>) -> &str {
        index.and_then(|i| self.get(i)).unwrap_or(UNKNOWN_PORT)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PortResolution {
    pub ports: PortTable,
    pub error: Option<WalkError>,
}

/// Walks ifName and keys each name by the interface index at the end of its path.
pub async fn resolve_ports<S: ManagementSession + ?Sized>(session: &mut S) -> PortResolution {
    let outcome = walk(session, IF_NAME_ROOT.clone()).collect().await;

    let mut ports = PortTable::new();
    for varbind in &outcome.bindings {
        match varbind.path.last() {
            Some(index) => ports.insert(index.to_string(), varbind.value.to_string()),
            None => warn!(path = %varbind.path, "Interface name without an index"),
        }
    }
    debug!(ports = ports.len(), "Resolved interface names");

    PortResolution { ports, error: outcome.error }
}
