use std::collections::{BTreeSet, HashMap};

use petgraph::{
    Directed,
    graph::{EdgeIndex, NodeIndex},
    prelude::StableGraph,
};
use serde::{Serialize, ser::SerializeStruct};

use crate::network::{edge::Edge, node::DeviceNode};

/// Device multigraph built up during one discovery run.
///
/// node_id_to_index_map maps device ids to graph indices so repeated sightings of the same
/// device land on one node. Parallel edges are kept: two links between the same pair of
/// devices are two edges.
#[derive(Debug, Clone, Default)]
pub struct TopologyGraph {
    graph: StableGraph<DeviceNode, Edge, Directed>,
    node_id_to_index_map: HashMap<String, NodeIndex>,
}

impl TopologyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts the node, or replaces the label of the node that already has its id.
    pub fn upsert_node(&mut self, node: DeviceNode) -> NodeIndex {
        if let Some(&index) = self.node_id_to_index_map.get(&node.id) {
            if let Some(existing) = self.graph.node_weight_mut(index) {
                existing.label = node.label;
            }
            return index;
        }
        let id = node.id.clone();
        let index = self.graph.add_node(node);
        self.node_id_to_index_map.insert(id, index);
        index
    }

    /// Index of `id`, adding a node labelled with the id if there is none yet. An existing label is left alone.
    fn ensure_node(&mut self, id: &str) -> NodeIndex {
        match self.node_id_to_index_map.get(id) {
            Some(&index) => index,
            None => self.upsert_node(DeviceNode::named(id)),
        }
    }

    /// Adds the edge, creating either endpoint if it does not exist.
    pub fn add_edge(&mut self, edge: Edge) -> EdgeIndex {
        let from = self.ensure_node(&edge.from);
        let to = self.ensure_node(&edge.to);
        self.graph.add_edge(from, to, edge)
    }

    pub fn node(&self, id: &str) -> Option<&DeviceNode> {
        self.node_id_to_index_map
            .get(id)
            .and_then(|&index| self.graph.node_weight(index))
    }

    pub fn contains_node(&self, id: &str) -> bool {
        self.node_id_to_index_map.contains_key(id)
    }

    pub fn node_ids(&self) -> BTreeSet<&str> {
        self.node_id_to_index_map.keys().map(String::as_str).collect()
    }

    /// Nodes ordered by id.
    pub fn nodes(&self) -> Vec<&DeviceNode> {
        let mut nodes: Vec<&DeviceNode> = self.graph.node_weights().collect();
        nodes.sort_by(|a, b| a.id.cmp(&b.id));
        nodes
    }

    /// Edges in a stable order, independent of insertion order.
    pub fn edges(&self) -> Vec<&Edge> {
        let mut edges: Vec<&Edge> = self.graph.edge_weights().collect();
        edges.sort();
        edges
    }

    pub fn edges_between(&self, from: &str, to: &str) -> Vec<&Edge> {
        self.edges()
            .into_iter()
            .filter(|edge| edge.from == from && edge.to == to)
            .collect()
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }
}

impl Serialize for TopologyGraph {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("TopologyGraph", 2)?;
        state.serialize_field("nodes", &self.nodes())?;
        state.serialize_field("edges", &self.edges())?;
        state.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upsert_replaces_label_without_duplicating() {
        let mut graph = TopologyGraph::new();
        let first = graph.upsert_node(DeviceNode::new("deviceX", "10.0.0.1"));
        let second = graph.upsert_node(DeviceNode::new("deviceX", "deviceX"));
        assert_eq!(first, second);
        assert_eq!(graph.node_count(), 1);
        assert_eq!(graph.node("deviceX").map(|n| n.label.as_str()), Some("deviceX"));
    }

    #[test]
    fn test_add_edge_creates_missing_endpoints() {
        let mut graph = TopologyGraph::new();
        graph.upsert_node(DeviceNode::new("deviceX", "core switch"));
        graph.add_edge(Edge::new("deviceX", "deviceY", "Gi0/1", "Gi0/24"));

        assert_eq!(graph.node_ids().into_iter().collect::<Vec<_>>(), ["deviceX", "deviceY"]);
        // The existing label survives
        assert_eq!(graph.node("deviceX").map(|n| n.label.as_str()), Some("core switch"));
        assert_eq!(graph.node("deviceY").map(|n| n.label.as_str()), Some("deviceY"));
    }

    #[test]
    fn test_parallel_edges_are_kept() {
        let mut graph = TopologyGraph::new();
        graph.add_edge(Edge::new("a", "b", "Gi0/1", "Gi0/1"));
        graph.add_edge(Edge::new("a", "b", "Gi0/2", "Gi0/2"));
        graph.add_edge(Edge::new("a", "b", "Gi0/2", "Gi0/2"));
        assert_eq!(graph.edge_count(), 3);
        assert_eq!(graph.edges_between("a", "b").len(), 3);
        assert!(graph.edges_between("b", "a").is_empty());
    }

    #[test]
    fn test_serialize() {
        let mut graph = TopologyGraph::new();
        graph.add_edge(Edge::new("b", "a", "Gi0/1", "N/A"));
        let json = serde_json::to_value(&graph).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "nodes": [{"id": "a", "label": "a"}, {"id": "b", "label": "b"}],
                "edges": [{"from": "b", "to": "a", "label": "Gi0/1", "local_port": "N/A"}],
            })
        );
    }
}
