//! Undirected adjacency over edge endpoint tokens.
//!
//! This is the one canonical traversal substrate: every analysis builds an
//! `Adjacency` from the `GraphData` it was handed and walks that, so the
//! notes-map and graph representations can never drift apart.
//!
//! Keys are edge endpoints, which may include tokens that never appear in
//! the node list (dangling references are legal). Parallel edges keep
//! their duplicate neighbor entries.

use std::collections::{HashMap, HashSet, VecDeque};
use trellis_core::GraphData;

/// Undirected neighbor lists keyed by token.
#[derive(Debug, Default, Clone)]
pub struct Adjacency {
    map: HashMap<String, Vec<String>>,
}

impl Adjacency {
    /// Builds the adjacency from every edge of a snapshot, both directions.
    pub fn from_graph(graph: &GraphData) -> Self {
        let mut map: HashMap<String, Vec<String>> = HashMap::new();
        for edge in &graph.edges {
            map.entry(edge.from.clone()).or_default().push(edge.to.clone());
            map.entry(edge.to.clone()).or_default().push(edge.from.clone());
        }
        Self { map }
    }

    /// Neighbors of a token, duplicates preserved; empty for unknown tokens.
    pub fn neighbors(&self, id: &str) -> &[String] {
        self.map.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Neighbors with duplicates removed, in first-seen order.
    pub fn unique_neighbors(&self, id: &str) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.neighbors(id)
            .iter()
            .filter(|n| seen.insert(n.as_str()))
            .map(String::as_str)
            .collect()
    }

    /// All tokens that participate in at least one edge, sorted.
    pub fn node_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.map.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    /// True if the token participates in any edge.
    pub fn contains(&self, id: &str) -> bool {
        self.map.contains_key(id)
    }

    /// Shortest path between two tokens by breadth-first search.
    ///
    /// Returns the full node sequence including both endpoints, or `None`
    /// when no path exists. `start == end` yields the single-node path.
    pub fn shortest_path(&self, start: &str, end: &str) -> Option<Vec<String>> {
        let mut queue: VecDeque<Vec<String>> = VecDeque::new();
        let mut visited: HashSet<String> = HashSet::new();

        queue.push_back(vec![start.to_string()]);
        visited.insert(start.to_string());

        while let Some(path) = queue.pop_front() {
            let node = path.last().expect("paths are never empty");

            if node == end {
                return Some(path);
            }

            for neighbor in self.neighbors(node) {
                if visited.insert(neighbor.clone()) {
                    let mut next = path.clone();
                    next.push(neighbor.clone());
                    queue.push_back(next);
                }
            }
        }

        None
    }
}

/// Degree of a token: the number of edges incident to it.
pub fn node_degree(graph: &GraphData, id: &str) -> usize {
    graph
        .edges
        .iter()
        .filter(|e| e.from == id || e.to == id)
        .count()
}

/// Endpoint occurrence counts per token (a self-loop counts twice).
pub fn degree_counts(graph: &GraphData) -> HashMap<String, usize> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for edge in &graph.edges {
        *counts.entry(edge.from.clone()).or_default() += 1;
        *counts.entry(edge.to.clone()).or_default() += 1;
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_core::{Edge, EdgeKind};

    fn chain() -> GraphData {
        // a - b - c
        GraphData {
            nodes: Vec::new(),
            edges: vec![
                Edge::new(EdgeKind::Relation, "a", "b"),
                Edge::new(EdgeKind::Relation, "b", "c"),
            ],
            positions: None,
        }
    }

    #[test]
    fn test_adjacency_is_undirected() {
        let adj = Adjacency::from_graph(&chain());
        assert_eq!(adj.neighbors("a"), ["b"]);
        assert_eq!(adj.neighbors("b"), ["a", "c"]);
        assert!(adj.neighbors("missing").is_empty());
    }

    #[test]
    fn test_shortest_path_endpoints_included() {
        let adj = Adjacency::from_graph(&chain());
        let path = adj.shortest_path("a", "c").unwrap();
        assert_eq!(path, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_shortest_path_self() {
        let adj = Adjacency::from_graph(&chain());
        assert_eq!(adj.shortest_path("a", "a").unwrap(), vec!["a"]);
    }

    #[test]
    fn test_shortest_path_disconnected() {
        let mut graph = chain();
        graph.edges.push(Edge::new(EdgeKind::Relation, "x", "y"));
        let adj = Adjacency::from_graph(&graph);
        assert!(adj.shortest_path("a", "y").is_none());
    }

    #[test]
    fn test_degrees() {
        let graph = chain();
        assert_eq!(node_degree(&graph, "b"), 2);
        assert_eq!(node_degree(&graph, "a"), 1);
        assert_eq!(node_degree(&graph, "zz"), 0);

        let counts = degree_counts(&graph);
        assert_eq!(counts["b"], 2);
    }
}
