//! Connected components, cluster density and territory classification.
//!
//! A cluster is a connected component of the undirected graph. Territories
//! classify clusters as explored / unexplored / frontier against thresholds
//! derived from the graph's own average cluster density, so the labels are
//! relative to the graph, not absolute.

use crate::adjacency::{node_degree, Adjacency};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;
use trellis_core::GraphData;

/// Classification of a territory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TerritoryKind {
    Explored,
    Unexplored,
    Frontier,
    Isolated,
}

/// Degree and connectivity figures for one territory.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TerritoryMetrics {
    pub internal_edges: usize,
    pub external_edges: usize,
    pub average_degree: f64,
    pub centrality: f64,
}

/// A cluster of node IDs with derived scalar attributes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Territory {
    pub id: usize,
    #[serde(rename = "type")]
    pub kind: TerritoryKind,
    pub nodes: Vec<String>,
    pub density: f64,
    pub size: usize,
    pub description: String,
    pub central_node: String,
    pub metrics: TerritoryMetrics,
}

/// The explored / unexplored / frontier partition of a graph.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConceptualTerritories {
    pub explored: Vec<Territory>,
    pub unexplored: Vec<Territory>,
    pub frontier: Vec<Territory>,
}

impl ConceptualTerritories {
    /// Iterates over every territory in all three classes.
    pub fn all(&self) -> impl Iterator<Item = &Territory> {
        self.explored
            .iter()
            .chain(self.frontier.iter())
            .chain(self.unexplored.iter())
    }
}

/// Partitions the graph into connected components.
///
/// Iterative depth-first search seeded in node-list order, so the
/// partition and its ordering are deterministic for a given snapshot.
/// Every node appears in exactly one cluster.
pub fn identify_clusters(graph: &GraphData) -> Vec<Vec<String>> {
    let adj = Adjacency::from_graph(graph);
    let mut visited: HashSet<String> = HashSet::new();
    let mut clusters = Vec::new();

    for node in &graph.nodes {
        if visited.contains(&node.id) {
            continue;
        }

        let mut cluster = Vec::new();
        let mut stack = vec![node.id.clone()];
        visited.insert(node.id.clone());

        while let Some(current) = stack.pop() {
            for neighbor in adj.neighbors(&current) {
                if !visited.contains(neighbor) {
                    visited.insert(neighbor.clone());
                    stack.push(neighbor.clone());
                }
            }
            cluster.push(current);
        }

        clusters.push(cluster);
    }

    clusters
}

/// Edges with both endpoints inside the cluster.
pub fn count_internal_edges(cluster: &[String], graph: &GraphData) -> usize {
    let set: HashSet<&str> = cluster.iter().map(String::as_str).collect();
    graph
        .edges
        .iter()
        .filter(|e| set.contains(e.from.as_str()) && set.contains(e.to.as_str()))
        .count()
}

/// Edges with exactly one endpoint inside the cluster.
pub fn count_external_connections(cluster: &[String], graph: &GraphData) -> usize {
    let set: HashSet<&str> = cluster.iter().map(String::as_str).collect();
    graph
        .edges
        .iter()
        .filter(|e| set.contains(e.from.as_str()) != set.contains(e.to.as_str()))
        .count()
}

/// Internal edges over the undirected simple-graph maximum; 0 for
/// clusters of one.
pub fn cluster_density(cluster: &[String], graph: &GraphData) -> f64 {
    if cluster.len() <= 1 {
        return 0.0;
    }
    let max_possible = cluster.len() * (cluster.len() - 1) / 2;
    if max_possible == 0 {
        return 0.0;
    }
    count_internal_edges(cluster, graph) as f64 / max_possible as f64
}

/// Mean cluster density over all components. Only clusters of more than
/// one node contribute density, but the divisor is the full cluster count.
pub fn average_cluster_density(graph: &GraphData) -> f64 {
    let clusters = identify_clusters(graph);
    if clusters.is_empty() {
        return 0.0;
    }
    let total: f64 = clusters
        .iter()
        .filter(|c| c.len() > 1)
        .map(|c| cluster_density(c, graph))
        .sum();
    total / clusters.len() as f64
}

/// The member with the highest internal degree; ties go to cluster order.
pub fn find_central_node(cluster: &[String], graph: &GraphData) -> String {
    let Some(first) = cluster.first() else {
        return String::new();
    };

    let set: HashSet<&str> = cluster.iter().map(String::as_str).collect();
    let internal_degree = |id: &str| {
        graph
            .edges
            .iter()
            .filter(|e| {
                set.contains(e.from.as_str())
                    && set.contains(e.to.as_str())
                    && (e.from == id || e.to == id)
            })
            .count()
    };

    let mut central = first.clone();
    let mut best = internal_degree(first);
    for node in &cluster[1..] {
        let degree = internal_degree(node);
        if degree > best {
            best = degree;
            central = node.clone();
        }
    }
    central
}

/// Nodes that participate in no edge at all.
pub fn find_orphans(graph: &GraphData) -> Vec<String> {
    let mut connected: HashSet<&str> = HashSet::new();
    for edge in &graph.edges {
        connected.insert(edge.from.as_str());
        connected.insert(edge.to.as_str());
    }

    graph
        .nodes
        .iter()
        .filter(|n| !connected.contains(n.id.as_str()))
        .map(|n| n.id.clone())
        .collect()
}

/// Average full degree over the cluster's members.
fn cluster_average_degree(cluster: &[String], graph: &GraphData) -> f64 {
    if cluster.is_empty() {
        return 0.0;
    }
    let total: usize = cluster.iter().map(|n| node_degree(graph, n)).sum();
    total as f64 / cluster.len() as f64
}

/// Share of the cluster's edges that leave it.
fn cluster_centrality(cluster: &[String], graph: &GraphData) -> f64 {
    let external = count_external_connections(cluster, graph);
    let internal = count_internal_edges(cluster, graph);
    if internal + external == 0 {
        return 0.0;
    }
    external as f64 / (internal + external) as f64
}

/// Classifies every cluster as explored, unexplored or frontier using
/// thresholds derived from the average cluster density:
/// `explored > max(avg·1.5, 0.2)`, `unexplored < min(avg·0.7, 0.1)` with
/// size > 1, everything else frontier. Isolated nodes are appended to the
/// unexplored list as singleton territories with IDs offset by +1000 so
/// they never collide with cluster-index IDs.
pub fn identify_territories(graph: &GraphData) -> ConceptualTerritories {
    let mut territories = ConceptualTerritories::default();

    let clusters = identify_clusters(graph);
    let avg_density = average_cluster_density(graph);

    let explored_threshold = (avg_density * 1.5).max(0.2);
    let unexplored_threshold = (avg_density * 0.7).min(0.1);
    debug!(
        explored_threshold,
        unexplored_threshold,
        clusters = clusters.len(),
        "classifying territories"
    );

    for (i, cluster) in clusters.iter().enumerate() {
        let density = cluster_density(cluster, graph);
        let metrics = TerritoryMetrics {
            internal_edges: count_internal_edges(cluster, graph),
            external_edges: count_external_connections(cluster, graph),
            average_degree: cluster_average_degree(cluster, graph),
            centrality: cluster_centrality(cluster, graph),
        };

        let (kind, description) = if density > explored_threshold {
            (
                TerritoryKind::Explored,
                "Zone bien explorée avec de nombreuses connexions",
            )
        } else if density < unexplored_threshold && cluster.len() > 1 {
            (
                TerritoryKind::Unexplored,
                "Territoire peu exploré nécessitant plus de connexions",
            )
        } else {
            (
                TerritoryKind::Frontier,
                "Zone frontière avec potentiel d'expansion",
            )
        };

        let territory = Territory {
            id: i,
            kind,
            nodes: cluster.clone(),
            density,
            size: cluster.len(),
            description: description.to_string(),
            central_node: find_central_node(cluster, graph),
            metrics,
        };

        match kind {
            TerritoryKind::Explored => territories.explored.push(territory),
            TerritoryKind::Unexplored => territories.unexplored.push(territory),
            _ => territories.frontier.push(territory),
        }
    }

    for orphan in find_orphans(graph) {
        territories.unexplored.push(Territory {
            id: territories.unexplored.len() + 1000,
            kind: TerritoryKind::Isolated,
            nodes: vec![orphan.clone()],
            density: 0.0,
            size: 1,
            description: "Nœud isolé sans connexions".to_string(),
            central_node: orphan,
            metrics: TerritoryMetrics::default(),
        });
    }

    territories
}

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_core::{Edge, EdgeKind, Node};

    fn make_graph(nodes: &[&str], edges: &[(&str, &str)]) -> GraphData {
        GraphData {
            nodes: nodes.iter().map(|n| Node::new(*n, "general")).collect(),
            edges: edges
                .iter()
                .map(|(a, b)| Edge::new(EdgeKind::Relation, *a, *b))
                .collect(),
            positions: None,
        }
    }

    #[test]
    fn test_clusters_partition_all_nodes() {
        let graph = make_graph(
            &["a", "b", "c", "d", "lonely"],
            &[("a", "b"), ("b", "c"), ("d", "c")],
        );
        let clusters = identify_clusters(&graph);

        let mut all: Vec<String> = clusters.iter().flatten().cloned().collect();
        all.sort();
        assert_eq!(all, vec!["a", "b", "c", "d", "lonely"]);

        // Every node in exactly one cluster.
        let total: usize = clusters.iter().map(Vec::len).sum();
        assert_eq!(total, graph.nodes.len());
        assert_eq!(clusters.len(), 2);
    }

    #[test]
    fn test_clusters_with_self_loop() {
        let graph = make_graph(&["a", "b"], &[("a", "a")]);
        let clusters = identify_clusters(&graph);
        assert_eq!(clusters.len(), 2);
    }

    #[test]
    fn test_cluster_density_bounds() {
        // Triangle: 3 internal edges, max 3.
        let graph = make_graph(&["a", "b", "c"], &[("a", "b"), ("b", "c"), ("c", "a")]);
        let cluster: Vec<String> = ["a", "b", "c"].iter().map(|s| s.to_string()).collect();
        assert!((cluster_density(&cluster, &graph) - 1.0).abs() < 1e-9);

        let single = vec!["a".to_string()];
        assert_eq!(cluster_density(&single, &graph), 0.0);
    }

    #[test]
    fn test_central_node_is_highest_internal_degree() {
        // Star centered on hub.
        let graph = make_graph(
            &["hub", "s1", "s2", "s3"],
            &[("hub", "s1"), ("hub", "s2"), ("hub", "s3")],
        );
        let cluster: Vec<String> = ["s1", "hub", "s2", "s3"].iter().map(|s| s.to_string()).collect();
        assert_eq!(find_central_node(&cluster, &graph), "hub");
    }

    #[test]
    fn test_isolated_nodes_reported_with_offset_ids() {
        let graph = make_graph(&["a", "b", "seul"], &[("a", "b")]);
        let territories = identify_territories(&graph);

        let isolated: Vec<&Territory> = territories
            .unexplored
            .iter()
            .filter(|t| t.kind == TerritoryKind::Isolated)
            .collect();
        assert_eq!(isolated.len(), 1);
        assert_eq!(isolated[0].nodes, vec!["seul"]);
        assert!(isolated[0].id >= 1000);
        assert_eq!(isolated[0].size, 1);
    }

    #[test]
    fn test_dense_cluster_classified_explored() {
        // One triangle (density 1.0) plus isolated singletons that dilute
        // the average: avg = 1.0/5, threshold = max(0.3, 0.2) = 0.3.
        let graph = make_graph(
            &["a", "b", "c", "x1", "x2", "x3", "x4"],
            &[("a", "b"), ("b", "c"), ("c", "a")],
        );
        let territories = identify_territories(&graph);

        assert!(territories
            .explored
            .iter()
            .any(|t| t.nodes.contains(&"a".to_string())));
    }

    #[test]
    fn test_territory_metrics_populated() {
        let graph = make_graph(&["a", "b"], &[("a", "b")]);
        let territories = identify_territories(&graph);
        let territory = territories.all().next().unwrap();

        assert_eq!(territory.metrics.internal_edges, 1);
        assert_eq!(territory.metrics.external_edges, 0);
        assert!((territory.metrics.average_degree - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_territory_wire_format() {
        let graph = make_graph(&["a", "b"], &[("a", "b")]);
        let territories = identify_territories(&graph);
        let value = serde_json::to_value(&territories).unwrap();

        let territory = &value["frontier"][0];
        assert_eq!(territory["type"], "frontier");
        assert_eq!(territory["centralNode"], "a");
        assert_eq!(territory["metrics"]["internalEdges"], 1);
    }

    #[test]
    fn test_empty_graph_yields_empty_territories() {
        let graph = GraphData::default();
        let territories = identify_territories(&graph);
        assert!(territories.explored.is_empty());
        assert!(territories.unexplored.is_empty());
        assert!(territories.frontier.is_empty());
    }
}
