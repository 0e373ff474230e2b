use serde::{Deserialize, Serialize};

/// One reported adjacency from `from` to `to`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Edge {
    pub from: String,
    pub to: String,
    /// Port on the remote device
    pub label: String,
    /// Port on the reporting device, `N/A` when unknown
    pub local_port: String,
}

impl Edge {
    pub fn new(
        from: impl Into<String>,
        to: impl Into<String>,
        label: impl Into<String>,
        local_port: impl Into<String>,
    ) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            label: label.into(),
            local_port: local_port.into(),
        }
    }
}
