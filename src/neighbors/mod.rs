/*!
Neighbor discovery tables.

Knows where LLDP and CDP keep their remote-neighbor rows and how to turn the walked bindings into
`NeighborRecord`s. Also resolves the interface index to name mapping used to label local ports.
*/

pub mod extract;
pub mod ports;
pub mod table;

use serde::{Deserialize, Serialize};

pub use extract::{NeighborScan, extract_neighbors};
pub use ports::{PortResolution, PortTable, resolve_ports};
pub use table::{Column, NeighborTable};

/// One adjacency reported by a device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NeighborRecord {
    /// Leading token of the remote system name
    pub remote_device_id: String,
    pub remote_port_label: String,
    /// Interface index on the reporting device, when it could be paired
    pub local_interface_ref: Option<String>,
}

/// How values from different columns are matched up into records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorrelationPolicy {
    /// The i-th port label goes with the i-th device id, in walk order.
    #[default]
    Positional,
    /// Values are matched by the row index that follows the column number.
    RowIndexed,
}
