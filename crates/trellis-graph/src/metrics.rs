//! Global graph metrics.
//!
//! Density, degree and clustering figures over the whole snapshot, plus
//! the compact [`GraphMetrics`] record embedded in saved versions and the
//! richer [`DensityMetrics`] report served to callers.

use crate::adjacency::{node_degree, Adjacency};
use crate::cluster::{identify_clusters, identify_territories, ConceptualTerritories};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use trellis_core::GraphData;

/// Compact metrics snapshot attached to saved versions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphMetrics {
    pub node_count: usize,
    pub edge_count: usize,
    pub density: f64,
    pub components: usize,
    pub average_degree: f64,
    pub orphan_nodes: usize,
    pub max_path_length: usize,
    pub clustering_coeff: f64,
}

/// The full density report.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DensityMetrics {
    pub global_density: f64,
    pub average_degree: f64,
    pub clustering_coefficient: f64,
    pub degree_distribution: BTreeMap<usize, usize>,
    pub hubs: Vec<String>,
    pub peripherals: Vec<String>,
    pub high_density_zones: usize,
    pub low_density_zones: usize,
    pub frontier_zones: usize,
    pub balance_score: f64,
    pub recommendations: Vec<String>,
}

/// `|E| / (n·(n−1)/2)` for the undirected simple-graph maximum; exactly 0
/// for graphs of one node or fewer.
pub fn global_density(graph: &GraphData) -> f64 {
    let n = graph.nodes.len();
    if n <= 1 {
        return 0.0;
    }
    let max_edges = n * (n - 1) / 2;
    if max_edges == 0 {
        return 0.0;
    }
    graph.edges.len() as f64 / max_edges as f64
}

/// `2·|E| / n`; 0 for empty graphs.
pub fn global_average_degree(graph: &GraphData) -> f64 {
    if graph.nodes.is_empty() {
        return 0.0;
    }
    (graph.edges.len() * 2) as f64 / graph.nodes.len() as f64
}

/// Mean local clustering coefficient over nodes of degree ≥ 2, with
/// triangles counted by checking adjacency among neighbor pairs.
pub fn global_clustering_coefficient(graph: &GraphData) -> f64 {
    let adj = Adjacency::from_graph(graph);

    let mut total = 0.0;
    let mut counted = 0usize;

    for node in &graph.nodes {
        let neighbors = adj.unique_neighbors(&node.id);
        let degree = neighbors.len();
        if degree < 2 {
            continue;
        }
        counted += 1;

        let mut triangles = 0usize;
        for i in 0..neighbors.len() {
            let u_neighbors: HashSet<&str> = adj
                .unique_neighbors(neighbors[i])
                .into_iter()
                .collect();
            for v in &neighbors[i + 1..] {
                if u_neighbors.contains(v) {
                    triangles += 1;
                }
            }
        }

        total += (2 * triangles) as f64 / (degree * (degree - 1)) as f64;
    }

    if counted == 0 {
        return 0.0;
    }
    total / counted as f64
}

/// Nodes whose degree exceeds `1.5·avg + 1`.
pub fn identify_hubs(graph: &GraphData) -> Vec<String> {
    let avg = global_average_degree(graph);
    graph
        .nodes
        .iter()
        .filter(|n| node_degree(graph, &n.id) as f64 > avg * 1.5 + 1.0)
        .map(|n| n.id.clone())
        .collect()
}

/// Nodes of degree ≤ 1.
pub fn identify_peripherals(graph: &GraphData) -> Vec<String> {
    graph
        .nodes
        .iter()
        .filter(|n| node_degree(graph, &n.id) <= 1)
        .map(|n| n.id.clone())
        .collect()
}

/// `1 / (1 + CV)` over the sizes of territories larger than one node.
///
/// Returns 0.8 when fewer than two comparable territories exist: not
/// enough data to judge imbalance, treated as good by convention.
pub fn balance_score(territories: &ConceptualTerritories) -> f64 {
    let sizes: Vec<f64> = territories
        .all()
        .filter(|t| t.size > 1)
        .map(|t| t.size as f64)
        .collect();

    if sizes.len() < 2 {
        return 0.8;
    }

    let n = sizes.len() as f64;
    let mean = sizes.iter().sum::<f64>() / n;
    if mean == 0.0 {
        return 0.0;
    }

    let variance = sizes.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / n;
    let coefficient_of_variation = variance.sqrt() / mean;

    1.0 / (1.0 + coefficient_of_variation)
}

/// The compact metrics record reused by the versioning engine.
pub fn graph_metrics(graph: &GraphData) -> GraphMetrics {
    let node_count = graph.nodes.len();
    let edge_count = graph.edges.len();

    // Coarse upper-bound estimate, kept from the original design.
    let max_path_length = if edge_count == 0 { 0 } else { node_count / 2 };

    GraphMetrics {
        node_count,
        edge_count,
        density: global_density(graph),
        components: identify_clusters(graph).len(),
        average_degree: global_average_degree(graph),
        orphan_nodes: crate::cluster::find_orphans(graph).len(),
        max_path_length,
        clustering_coeff: global_clustering_coefficient(graph),
    }
}

/// The full density report for a snapshot.
pub fn density_metrics(graph: &GraphData) -> DensityMetrics {
    if graph.nodes.is_empty() {
        return DensityMetrics::default();
    }

    let mut degree_distribution: BTreeMap<usize, usize> = BTreeMap::new();
    for node in &graph.nodes {
        *degree_distribution
            .entry(node_degree(graph, &node.id))
            .or_default() += 1;
    }

    let territories = identify_territories(graph);

    let mut metrics = DensityMetrics {
        global_density: global_density(graph),
        average_degree: global_average_degree(graph),
        clustering_coefficient: global_clustering_coefficient(graph),
        degree_distribution,
        hubs: identify_hubs(graph),
        peripherals: identify_peripherals(graph),
        high_density_zones: territories.explored.len(),
        low_density_zones: territories.unexplored.len(),
        frontier_zones: territories.frontier.len(),
        balance_score: balance_score(&territories),
        recommendations: Vec::new(),
    };
    metrics.recommendations = recommendations(&metrics, graph);
    metrics
}

/// Textual advice derived from the metric thresholds.
fn recommendations(metrics: &DensityMetrics, graph: &GraphData) -> Vec<String> {
    let node_count = graph.nodes.len();
    let mut out = Vec::new();
    if node_count == 0 {
        return out;
    }

    if metrics.global_density < 0.01 {
        out.push(
            "Le graphe est très peu dense. Ajoutez plus de connexions entre les concepts."
                .to_string(),
        );
    } else if metrics.global_density > 0.2 {
        out.push(
            "Le graphe est très dense. Envisagez de créer des sous-groupes ou des contextes pour clarifier."
                .to_string(),
        );
    }

    if metrics.peripherals.len() > node_count / 2 {
        out.push(
            "Plus de la moitié des nœuds sont périphériques ou isolés. Intégrez-les davantage au cœur du graphe."
                .to_string(),
        );
    }

    if metrics.balance_score < 0.4 {
        out.push(
            "Le graphe est déséquilibré, avec des zones de tailles très différentes. Essayez d'équilibrer les territoires."
                .to_string(),
        );
    }

    if metrics.low_density_zones > metrics.high_density_zones + metrics.frontier_zones {
        out.push(
            "Beaucoup de territoires sont inexplorés. Concentrez-vous sur le développement de ces zones."
                .to_string(),
        );
    }

    out
}
