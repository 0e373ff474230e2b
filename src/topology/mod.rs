/*!
Topology module

Turns reachable addresses into one device graph and writes it out.

Structure:
- `source`: display-name lookup (`HostNameResolver`) and a static, map-backed implementation.
- `builder`: runs the per-device pipeline on a bounded pool and merges results into the graph.
- `export`: JSON and Graphviz renderings of a finished graph.
*/

pub mod builder;
pub mod export;
pub mod source;

pub use builder::{DeviceReport, DiscoveryError, DiscoveryRun, TopologyBuilder};
pub use export::{DotExporter, ExportError, JsonExporter, TopologyExporter};
pub use source::{HostNameResolver, StaticNameResolver};
