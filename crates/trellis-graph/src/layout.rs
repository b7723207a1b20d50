//! Layered layout: nodes banded by heuristic role.
//!
//! Classification is a prioritized rule list over label and context
//! keywords; the rule order below is the contract, since reordering
//! changes outcomes. Each layer sits on a fixed Y band, members spread
//! horizontally and centered.

use crate::adjacency::node_degree;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use trellis_core::{Edge, GraphData};

/// Horizontal spacing between nodes of one layer.
const LAYER_SPACING: i64 = 150;

/// One Y band of the layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Layer {
    pub y: i64,
    pub color: String,
    pub label: String,
}

/// A positioned, styled node.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayeredNode {
    pub id: String,
    pub label: String,
    pub context: String,
    pub layer: String,
    pub x: f64,
    pub y: f64,
    pub color: String,
    pub shape: String,
    pub size: i64,
}

/// The layered rendering of a snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayeredGraph {
    pub nodes: Vec<LayeredNode>,
    pub edges: Vec<Edge>,
    pub layers: BTreeMap<String, Layer>,
}

/// The fixed layer bands.
fn layer_bands() -> BTreeMap<String, Layer> {
    let mut layers = BTreeMap::new();
    layers.insert(
        "actors".to_string(),
        Layer { y: 0, color: "#3b82f6".to_string(), label: "Acteurs".to_string() },
    );
    layers.insert(
        "locations".to_string(),
        Layer { y: 200, color: "#10b981".to_string(), label: "Lieux".to_string() },
    );
    layers.insert(
        "events".to_string(),
        Layer { y: 400, color: "#f59e0b".to_string(), label: "Événements".to_string() },
    );
    layers.insert(
        "evidence".to_string(),
        Layer { y: 600, color: "#ef4444".to_string(), label: "Preuves".to_string() },
    );
    layers.insert(
        "concepts".to_string(),
        Layer { y: 800, color: "#8b5cf6".to_string(), label: "Concepts".to_string() },
    );
    layers
}

/// Assigns a node to a layer. First matching rule wins:
///
/// 1. capitalized single-word label → actors
/// 2. person keywords in context or label → actors
/// 3. place keywords → locations
/// 4. time keywords → events
/// 5. evidence keywords → evidence
/// 6. default → concepts
fn classify_node_layer(label: &str, context: &str) -> &'static str {
    let lower_label = label.to_lowercase();
    let lower_context = context.to_lowercase();
    let contains_any =
        |haystack: &str, needles: &[&str]| needles.iter().any(|n| haystack.contains(n));

    if label.chars().next().is_some_and(|c| c.is_uppercase()) && !lower_label.contains(' ') {
        return "actors";
    }
    if contains_any(&lower_context, &["personnage", "suspect"])
        || contains_any(
            &lower_label,
            &["victime", "témoin", "enquêteur", "detective"],
        )
    {
        return "actors";
    }

    if contains_any(&lower_context, &["lieu"])
        || contains_any(
            &lower_label,
            &["scène", "maison", "bureau", "bibliothèque", "manoir", "jardin", "rue"],
        )
    {
        return "locations";
    }

    if contains_any(&lower_context, &["chronologie", "timeline"])
        || contains_any(
            &lower_label,
            &["arrivé", "découvert", "rencontré", "heure", "moment", "avant", "après"],
        )
    {
        return "events";
    }

    if contains_any(&lower_context, &["preuve", "indice"])
        || contains_any(
            &lower_label,
            &["document", "trace", "empreinte", "tasse", "livre", "lettre"],
        )
    {
        return "evidence";
    }

    "concepts"
}

fn node_shape(layer: &str) -> &'static str {
    match layer {
        "actors" => "circle",
        "locations" => "square",
        "events" => "diamond",
        "evidence" => "triangle",
        _ => "box",
    }
}

/// Organizes the graph into layers, sizing nodes by degree and centering
/// each band horizontally.
pub fn layered_graph(graph: &GraphData) -> LayeredGraph {
    let layers = layer_bands();
    let mut nodes: Vec<LayeredNode> = Vec::new();
    let mut per_layer: BTreeMap<&'static str, i64> = BTreeMap::new();

    for node in &graph.nodes {
        let layer = classify_node_layer(&node.label, &node.context);
        let band = &layers[layer];
        *per_layer.entry(layer).or_default() += 1;

        nodes.push(LayeredNode {
            id: node.id.clone(),
            label: node.label.clone(),
            context: node.context.clone(),
            layer: layer.to_string(),
            x: 0.0,
            y: band.y as f64,
            color: band.color.clone(),
            shape: node_shape(layer).to_string(),
            size: 25 + 3 * node_degree(graph, &node.id) as i64,
        });
    }

    // Center each band: members spaced LAYER_SPACING apart around 0.
    for (layer, count) in &per_layer {
        let start_x = -(count * LAYER_SPACING) / 2;
        let mut index = 0i64;
        for node in nodes.iter_mut().filter(|n| n.layer == *layer) {
            node.x = (start_x + index * LAYER_SPACING) as f64;
            index += 1;
        }
    }

    LayeredGraph {
        nodes,
        edges: graph.edges.clone(),
        layers,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_core::{EdgeKind, Node};

    #[test]
    fn test_rule_order_capitalized_single_word_is_actor() {
        // The capitalization rule outranks the place keywords.
        assert_eq!(classify_node_layer("Manoir", "general"), "actors");
        assert_eq!(classify_node_layer("le manoir", "general"), "locations");
    }

    #[test]
    fn test_context_keywords() {
        assert_eq!(classify_node_layer("le suspect", "personnages"), "actors");
        assert_eq!(classify_node_layer("divers", "lieux"), "locations");
        assert_eq!(classify_node_layer("divers", "chronologie"), "events");
        assert_eq!(classify_node_layer("divers", "preuves"), "evidence");
        assert_eq!(classify_node_layer("divers", "general"), "concepts");
    }

    #[test]
    fn test_label_keywords() {
        assert_eq!(classify_node_layer("la victime", "general"), "actors");
        assert_eq!(classify_node_layer("tasse de thé", "general"), "evidence");
        assert_eq!(classify_node_layer("arrivée avant minuit", "general"), "events");
    }

    #[test]
    fn test_node_size_follows_degree() {
        let graph = GraphData {
            nodes: vec![Node::new("hub", "general"), Node::new("leaf", "general")],
            edges: vec![
                Edge::new(EdgeKind::Relation, "hub", "leaf"),
                Edge::new(EdgeKind::Relation, "hub", "other"),
            ],
            positions: None,
        };
        let layered = layered_graph(&graph);

        let hub = layered.nodes.iter().find(|n| n.id == "hub").unwrap();
        let leaf = layered.nodes.iter().find(|n| n.id == "leaf").unwrap();
        assert_eq!(hub.size, 31);
        assert_eq!(leaf.size, 28);
    }

    #[test]
    fn test_layer_band_y_and_centering() {
        let graph = GraphData {
            nodes: vec![
                Node::new("Alice", "general"),
                Node::new("Bob", "general"),
                Node::new("la maison", "general"),
            ],
            edges: Vec::new(),
            positions: None,
        };
        let layered = layered_graph(&graph);

        let actors: Vec<&LayeredNode> =
            layered.nodes.iter().filter(|n| n.layer == "actors").collect();
        assert_eq!(actors.len(), 2);
        assert!(actors.iter().all(|n| n.y == 0.0));
        // Two members, spaced 150 apart, centered: -150 and 0.
        let xs: Vec<f64> = actors.iter().map(|n| n.x).collect();
        assert_eq!(xs, vec![-150.0, 0.0]);

        let location = layered.nodes.iter().find(|n| n.layer == "locations").unwrap();
        assert_eq!(location.y, 200.0);
    }

    #[test]
    fn test_empty_graph() {
        let layered = layered_graph(&GraphData::default());
        assert!(layered.nodes.is_empty());
        assert_eq!(layered.layers.len(), 5);
    }
}
