/*
 * This module defines the device graph a discovery run produces.
 * Nodes are devices keyed by display name; edges are neighbor adjacencies.
 */

pub mod edge;
pub mod network_graph;
pub mod node;

pub use edge::Edge;
pub use network_graph::TopologyGraph;
pub use node::DeviceNode;
