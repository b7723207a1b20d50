//! Indexed graph wrapper for lookups.
//!
//! `NoteGraph` wraps petgraph and adds a string-ID index so the query
//! surfaces can resolve tokens without scanning. Dangling edge endpoints
//! (tokens never declared as nodes) are registered as implicit nodes whose
//! only attribute is their identity.

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use trellis_core::{Edge, GraphData, Node};

/// Unique identifier for a node in the graph.
pub type NodeId = NodeIndex;

/// The indexed note graph.
#[derive(Debug, Default)]
pub struct NoteGraph {
    graph: DiGraph<Node, Edge>,

    /// Maps token IDs to graph node indexes.
    id_index: HashMap<String, NodeId>,
}

impl NoteGraph {
    /// Creates an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the indexed graph from a snapshot.
    pub fn from_graph_data(data: &GraphData) -> Self {
        let mut graph = Self::new();

        for node in &data.nodes {
            graph.add_node(node.clone());
        }

        for edge in &data.edges {
            let from = graph.ensure_node(&edge.from);
            let to = graph.ensure_node(&edge.to);
            graph.graph.add_edge(from, to, edge.clone());
        }

        graph
    }

    /// Adds a node. The first registration of an ID wins; a duplicate
    /// returns the existing index.
    pub fn add_node(&mut self, node: Node) -> NodeId {
        if let Some(existing) = self.id_index.get(&node.id) {
            return *existing;
        }
        let id = node.id.clone();
        let index = self.graph.add_node(node);
        self.id_index.insert(id, index);
        index
    }

    /// Returns the index for a token, creating an implicit node if needed.
    fn ensure_node(&mut self, id: &str) -> NodeId {
        match self.id_index.get(id) {
            Some(index) => *index,
            None => self.add_node(Node::new(id, "")),
        }
    }

    /// Gets a node by its token ID.
    pub fn get(&self, id: &str) -> Option<&Node> {
        let index = self.id_index.get(id)?;
        self.graph.node_weight(*index)
    }

    /// Searches for nodes whose label contains the query, case-insensitive.
    pub fn search(&self, query: &str) -> Vec<&Node> {
        let query_lower = query.to_lowercase();
        self.graph
            .node_weights()
            .filter(|node| node.label.to_lowercase().contains(&query_lower))
            .collect()
    }

    /// Undirected neighbors of a token with the connecting edges, in edge
    /// insertion order.
    pub fn neighbors(&self, id: &str) -> Vec<(&Node, &Edge)> {
        let Some(&index) = self.id_index.get(id) else {
            return Vec::new();
        };

        let mut result = Vec::new();
        for edge_ref in self.graph.edge_references() {
            let other = if edge_ref.source() == index {
                edge_ref.target()
            } else if edge_ref.target() == index {
                edge_ref.source()
            } else {
                continue;
            };
            if let Some(node) = self.graph.node_weight(other) {
                result.push((node, edge_ref.weight()));
            }
        }
        result
    }

    /// Number of nodes, implicit ones included.
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Number of edges.
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Iterates over all nodes.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.graph.node_weights()
    }

    /// Returns graph statistics.
    pub fn stats(&self) -> GraphStats {
        let mut contexts: Vec<&str> = self
            .graph
            .node_weights()
            .map(|n| n.context.as_str())
            .filter(|c| !c.is_empty())
            .collect();
        contexts.sort_unstable();
        contexts.dedup();

        GraphStats {
            node_count: self.node_count(),
            edge_count: self.edge_count(),
            contexts: contexts.len(),
        }
    }
}

/// Graph statistics for the info surfaces.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphStats {
    pub node_count: usize,
    pub edge_count: usize,
    pub contexts: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_core::EdgeKind;

    fn snapshot() -> GraphData {
        GraphData {
            nodes: vec![Node::new("Victor", "Personnages")],
            edges: vec![Edge::new(EdgeKind::Relation, "Victor", "Manoir").with_label("habite")],
            positions: None,
        }
    }

    #[test]
    fn test_dangling_endpoint_becomes_implicit_node() {
        let graph = NoteGraph::from_graph_data(&snapshot());
        assert_eq!(graph.node_count(), 2);

        let manoir = graph.get("Manoir").unwrap();
        assert_eq!(manoir.label, "Manoir");
        assert!(manoir.context.is_empty());
    }

    #[test]
    fn test_search_case_insensitive() {
        let graph = NoteGraph::from_graph_data(&snapshot());
        assert_eq!(graph.search("victor").len(), 1);
        assert_eq!(graph.search("VICT").len(), 1);
        assert!(graph.search("absent").is_empty());
    }

    #[test]
    fn test_neighbors_are_undirected() {
        let graph = NoteGraph::from_graph_data(&snapshot());

        let from_victor = graph.neighbors("Victor");
        assert_eq!(from_victor.len(), 1);
        assert_eq!(from_victor[0].0.id, "Manoir");

        let from_manoir = graph.neighbors("Manoir");
        assert_eq!(from_manoir.len(), 1);
        assert_eq!(from_manoir[0].0.id, "Victor");
        assert_eq!(from_manoir[0].1.label, "habite");
    }

    #[test]
    fn test_stats_count_distinct_contexts() {
        let graph = NoteGraph::from_graph_data(&snapshot());
        let stats = graph.stats();
        assert_eq!(stats.node_count, 2);
        assert_eq!(stats.edge_count, 1);
        assert_eq!(stats.contexts, 1);
    }
}
