use petgraph::{
    Graph,
    dot::{Config, Dot},
    graph::NodeIndex,
};
use std::collections::HashMap;
use thiserror::Error;

use crate::network::{DeviceNode, Edge, TopologyGraph};

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("cannot encode topology as JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Renders a finished graph into some artifact.
pub trait TopologyExporter {
    type Artifact;

    fn export(&self, graph: &TopologyGraph) -> Result<Self::Artifact, ExportError>;
}

/// `{"nodes": [...], "edges": [...]}`
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonExporter {
    pub pretty: bool,
}

impl JsonExporter {
    pub fn pretty() -> Self {
        Self { pretty: true }
    }
}

impl TopologyExporter for JsonExporter {
    type Artifact = String;

    fn export(&self, graph: &TopologyGraph) -> Result<String, ExportError> {
        let json = if self.pretty {
            serde_json::to_string_pretty(graph)?
        } else {
            serde_json::to_string(graph)?
        };
        Ok(json)
    }
}

/// Graphviz digraph. Edges carry the remote port as `label` and the local port as `taillabel`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DotExporter;

impl TopologyExporter for DotExporter {
    type Artifact = String;

    fn export(&self, graph: &TopologyGraph) -> Result<String, ExportError> {
        // Rebuilt in sorted order so the text does not depend on which device answered first
        let mut ordered: Graph<&DeviceNode, &Edge> = Graph::new();
        let mut indices: HashMap<&str, NodeIndex> = HashMap::new();
        for node in graph.nodes() {
            indices.insert(node.id.as_str(), ordered.add_node(node));
        }
        for edge in graph.edges() {
            if let (Some(&from), Some(&to)) =
                (indices.get(edge.from.as_str()), indices.get(edge.to.as_str()))
            {
                ordered.add_edge(from, to, edge);
            }
        }

        let dot = Dot::with_attr_getters(
            &ordered,
            &[Config::NodeNoLabel, Config::EdgeNoLabel],
            &|_, edge| {
                format!(
                    "label = {:?} taillabel = {:?}",
                    edge.weight().label,
                    edge.weight().local_port
                )
            },
            &|_, (_, node)| format!("label = {:?}", node.label),
        );
        Ok(format!("{:?}", dot))
    }
}
