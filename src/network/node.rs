use serde::{Deserialize, Serialize};

/// A device in the topology. Identity is `id`; the label is whatever was learned last.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceNode {
    pub id: String,
    pub label: String,
}

impl DeviceNode {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self { id: id.into(), label: label.into() }
    }

    /// Node for a device only known by name, labelled with that name.
    pub fn named(id: impl Into<String>) -> Self {
        let id = id.into();
        Self { label: id.clone(), id }
    }
}
