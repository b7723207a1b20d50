//! Value types for the note graph.
//!
//! Identity is the literal notation token: two nodes are the same node
//! exactly when their `id` strings match. Nothing here is interned or
//! deduplicated beyond map-key uniqueness at build time.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// The kind of relationship between two tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    /// Labeled arrow relation: `A -> label -> B`.
    Relation,

    /// Unlabeled equivalence: `A <-> B`.
    Equivalence,

    /// Group membership: one edge per child of `Parent => { ... }`.
    Group,
}

impl std::fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Relation => "relation",
            Self::Equivalence => "equivalence",
            Self::Group => "group",
        };
        write!(f, "{}", s)
    }
}

/// A node in the note graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    pub label: String,
    pub context: String,
}

impl Node {
    /// Creates a node whose label is its id.
    pub fn new(id: impl Into<String>, context: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            label: id.clone(),
            id,
            context: context.into(),
        }
    }
}

/// A directed edge between two tokens.
///
/// Edges are stored as parsed; most analyses treat them as undirected.
/// `from`/`to` may reference tokens that never appear as nodes — dangling
/// references are tolerated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    #[serde(default)]
    pub id: String,
    pub from: String,
    pub to: String,
    #[serde(default)]
    pub label: String,
    #[serde(rename = "type")]
    pub kind: EdgeKind,
    #[serde(default)]
    pub context: String,
}

impl Edge {
    /// Creates a new edge.
    pub fn new(kind: EdgeKind, from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            from: from.into(),
            to: to.into(),
            label: String::new(),
            kind,
            context: String::new(),
        }
    }

    /// Sets the relation label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Sets the originating context.
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = context.into();
        self
    }
}

/// A 2D position supplied by the caller or synthesized on demand.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

/// A graph snapshot: the unit every analysis consumes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphData {
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub edges: Vec<Edge>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub positions: Option<HashMap<String, Position>>,
}

/// Output of [`crate::NotationParser::parse`].
///
/// `notes` keeps per-context insertion order; contexts themselves iterate
/// in lexicographic order so every downstream analysis is reproducible.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParsedNotes {
    pub subjects: Vec<String>,
    pub notes: BTreeMap<String, Vec<String>>,
}

/// Tokens that must never become subjects or node identities.
pub(crate) fn is_noise_token(token: &str) -> bool {
    token.is_empty() || token == "\"\"" || token == "[" || token == "]"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edge_kind_serialization() {
        let json = serde_json::to_string(&EdgeKind::Equivalence).unwrap();
        assert_eq!(json, "\"equivalence\"");
        assert_eq!(EdgeKind::Group.to_string(), "group");
    }

    #[test]
    fn test_edge_type_field_name() {
        let edge = Edge::new(EdgeKind::Relation, "a", "b").with_label("cause");
        let value = serde_json::to_value(&edge).unwrap();
        assert_eq!(value["type"], "relation");
        assert_eq!(value["from"], "a");
        assert_eq!(value["label"], "cause");
    }

    #[test]
    fn test_graph_data_accepts_minimal_edges() {
        // Requests may omit id/label/context on edges.
        let json = r#"{"nodes":[],"edges":[{"from":"a","to":"b","type":"group"}]}"#;
        let graph: GraphData = serde_json::from_str(json).unwrap();
        assert_eq!(graph.edges[0].kind, EdgeKind::Group);
        assert!(graph.edges[0].label.is_empty());
    }

    #[test]
    fn test_noise_tokens() {
        assert!(is_noise_token(""));
        assert!(is_noise_token("\"\""));
        assert!(is_noise_token("["));
        assert!(!is_noise_token("Victor"));
    }
}
