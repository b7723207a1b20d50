//! Expansion cones and path search.
//!
//! All traversal here is breadth-first over the undirected adjacency, so
//! every returned path is a shortest path and cone membership follows
//! exact hop-count semantics.

use crate::adjacency::Adjacency;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet, VecDeque};
use tracing::debug;
use trellis_core::{Edge, GraphData};

/// Nodes reachable within a hop bound plus the edges they induce.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpansionCone {
    pub node_ids: BTreeSet<String>,
    pub edges: Vec<Edge>,
}

/// Result of a term-driven cluster search.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterSearch {
    /// `cluster-N` → member node IDs.
    pub clusters: BTreeMap<String, Vec<String>>,
    /// Shortest connecting path per cluster pair, where one exists.
    pub connecting_paths: Vec<Vec<String>>,
}

/// Breadth-first cone from `node_id`, capped at `depth` hops.
///
/// `depth = 0` returns just the start node. The edge set contains every
/// original edge whose endpoints both landed in the cone.
pub fn expansion_cone(node_id: &str, depth: usize, graph: &GraphData) -> ExpansionCone {
    let adj = Adjacency::from_graph(graph);
    let mut in_cone: BTreeSet<String> = BTreeSet::new();
    let mut visited: HashSet<String> = HashSet::new();
    let mut queue: VecDeque<(String, usize)> = VecDeque::new();

    queue.push_back((node_id.to_string(), 0));
    visited.insert(node_id.to_string());

    while let Some((current, level)) = queue.pop_front() {
        in_cone.insert(current.clone());

        if level >= depth {
            continue;
        }

        for neighbor in adj.neighbors(&current) {
            if visited.insert(neighbor.clone()) {
                queue.push_back((neighbor.clone(), level + 1));
            }
        }
    }

    let edges = graph
        .edges
        .iter()
        .filter(|e| in_cone.contains(&e.from) && in_cone.contains(&e.to))
        .cloned()
        .collect();

    ExpansionCone {
        node_ids: in_cone,
        edges,
    }
}

/// Finds the clusters of nodes matching the search terms and the shortest
/// paths connecting those clusters.
///
/// Matching is a case-insensitive substring test against node labels.
/// Clusters are connected components of the subgraph induced on matched
/// nodes only; connecting paths run over the full adjacency.
pub fn find_clusters_and_paths(terms: &[String], graph: &GraphData) -> ClusterSearch {
    let adj = Adjacency::from_graph(graph);

    // Matched set, in node-list order for deterministic cluster numbering.
    let lowered: Vec<String> = terms.iter().map(|t| t.to_lowercase()).collect();
    let mut matched_order: Vec<&str> = Vec::new();
    let mut matched: HashSet<&str> = HashSet::new();
    for node in &graph.nodes {
        let label = node.label.to_lowercase();
        if lowered.iter().any(|t| label.contains(t)) && matched.insert(node.id.as_str()) {
            matched_order.push(node.id.as_str());
        }
    }
    debug!(terms = terms.len(), matched = matched_order.len(), "cluster search");

    // Components of the matched-node-induced subgraph: traversal may only
    // step onto neighbors that are themselves matched.
    let mut clusters: Vec<Vec<String>> = Vec::new();
    let mut visited: HashSet<&str> = HashSet::new();
    for &start in &matched_order {
        if visited.contains(start) {
            continue;
        }
        let mut component = Vec::new();
        let mut stack = vec![start];
        visited.insert(start);
        while let Some(current) = stack.pop() {
            component.push(current.to_string());
            for neighbor in adj.neighbors(current) {
                if let Some(&member) = matched.get(neighbor.as_str()) {
                    if visited.insert(member) {
                        stack.push(member);
                    }
                }
            }
        }
        clusters.push(component);
    }

    // Shortest bridge per cluster pair, over the unrestricted adjacency.
    let mut connecting_paths = Vec::new();
    for i in 0..clusters.len() {
        for j in (i + 1)..clusters.len() {
            let mut shortest: Option<Vec<String>> = None;
            for a in &clusters[i] {
                for b in &clusters[j] {
                    if let Some(path) = adj.shortest_path(a, b) {
                        if shortest.as_ref().is_none_or(|s| path.len() < s.len()) {
                            shortest = Some(path);
                        }
                    }
                }
            }
            if let Some(path) = shortest {
                connecting_paths.push(path);
            }
        }
    }

    let clusters = clusters
        .into_iter()
        .enumerate()
        .map(|(i, c)| (format!("cluster-{}", i), c))
        .collect();

    ClusterSearch {
        clusters,
        connecting_paths,
    }
}

/// Shortest path between every unordered pair of connected tokens,
/// keeping paths with at least one intermediate hop (node count > 2).
///
/// Quadratic in node count; intended for small graphs only.
pub fn find_all_paths(graph: &GraphData) -> Vec<Vec<String>> {
    let adj = Adjacency::from_graph(graph);
    let nodes = adj.node_ids();

    let mut paths = Vec::new();
    for i in 0..nodes.len() {
        for j in (i + 1)..nodes.len() {
            if let Some(path) = adj.shortest_path(nodes[i], nodes[j]) {
                if path.len() > 2 {
                    paths.push(path);
                }
            }
        }
    }
    paths
}

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_core::{EdgeKind, Node};

    fn path_graph(ids: &[&str]) -> GraphData {
        GraphData {
            nodes: ids.iter().map(|id| Node::new(*id, "general")).collect(),
            edges: ids
                .windows(2)
                .map(|w| Edge::new(EdgeKind::Relation, w[0], w[1]))
                .collect(),
            positions: None,
        }
    }

    fn star_graph(center: &str, leaves: &[&str]) -> GraphData {
        let mut nodes = vec![Node::new(center, "general")];
        nodes.extend(leaves.iter().map(|id| Node::new(*id, "general")));
        GraphData {
            nodes,
            edges: leaves
                .iter()
                .map(|leaf| Edge::new(EdgeKind::Relation, center, *leaf))
                .collect(),
            positions: None,
        }
    }

    #[test]
    fn test_cone_depth_zero_is_start_only() {
        let graph = path_graph(&["a", "b", "c"]);
        let cone = expansion_cone("a", 0, &graph);
        assert_eq!(cone.node_ids.len(), 1);
        assert!(cone.node_ids.contains("a"));
        assert!(cone.edges.is_empty());
    }

    #[test]
    fn test_cone_depth_bound_on_path_graph() {
        let graph = path_graph(&["a", "b", "c", "d", "e"]);
        let cone = expansion_cone("a", 2, &graph);

        // Exactly the nodes within 2 hops, nothing beyond.
        let expected: BTreeSet<String> =
            ["a", "b", "c"].iter().map(|s| s.to_string()).collect();
        assert_eq!(cone.node_ids, expected);
        assert_eq!(cone.edges.len(), 2);
    }

    #[test]
    fn test_cone_on_star_graph() {
        let graph = star_graph("hub", &["s1", "s2", "s3"]);
        let cone = expansion_cone("s1", 2, &graph);

        // Two hops from a leaf reach the whole star.
        assert_eq!(cone.node_ids.len(), 4);
        assert_eq!(cone.edges.len(), 3);

        let one_hop = expansion_cone("s1", 1, &graph);
        assert_eq!(one_hop.node_ids.len(), 2);
    }

    #[test]
    fn test_cone_unknown_start() {
        let graph = path_graph(&["a", "b"]);
        let cone = expansion_cone("ghost", 3, &graph);
        assert_eq!(cone.node_ids.len(), 1);
        assert!(cone.edges.is_empty());
    }

    #[test]
    fn test_cluster_search_bridges_through_unmatched_nodes() {
        // alpha1 - link - alpha2: both ends match, the bridge does not.
        let mut graph = path_graph(&["alpha1", "link", "alpha2"]);
        graph.nodes.push(Node::new("beta", "general"));

        let result = find_clusters_and_paths(&["alpha".to_string()], &graph);

        // The matched subgraph has two components: link is not matched, so
        // alpha1 and alpha2 cannot join through it.
        assert_eq!(result.clusters.len(), 2);

        // But the connecting path may pass through it.
        assert_eq!(result.connecting_paths.len(), 1);
        assert_eq!(result.connecting_paths[0], vec!["alpha1", "link", "alpha2"]);
    }

    #[test]
    fn test_cluster_search_connected_matches_form_one_cluster() {
        let graph = path_graph(&["alpha1", "alpha2", "alpha3"]);
        let result = find_clusters_and_paths(&["alpha".to_string()], &graph);

        assert_eq!(result.clusters.len(), 1);
        assert_eq!(result.clusters["cluster-0"].len(), 3);
        assert!(result.connecting_paths.is_empty());
    }

    #[test]
    fn test_find_all_paths_requires_intermediate_hop() {
        let graph = path_graph(&["a", "b", "c"]);
        let paths = find_all_paths(&graph);

        // Only a..c has an intermediate node; a-b and b-c are too short.
        assert_eq!(paths.len(), 1);
        assert_eq!(paths[0], vec!["a", "b", "c"]);
    }

    #[test]
    fn test_find_all_paths_empty_graph() {
        assert!(find_all_paths(&GraphData::default()).is_empty());
    }
}
