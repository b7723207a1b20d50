//! Exploration suggestions: where to connect, bridge and rebalance.

use crate::adjacency::node_degree;
use crate::cluster::{identify_territories, Territory};
use crate::metrics::global_average_degree;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use trellis_core::GraphData;

/// Suggested direction for a density correction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BalancingAction {
    Densify,
    Distribute,
}

/// A concrete connection worth creating.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionSuggestion {
    pub from: String,
    pub to: String,
    pub reason: String,
    pub impact: String,
    pub priority: u32,
}

/// A bridge between two unconnected territories.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeSuggestion {
    pub cluster1: Vec<String>,
    pub cluster2: Vec<String>,
    pub suggested_node1: String,
    pub suggested_node2: String,
    pub impact: f64,
    pub description: String,
}

/// A zone whose density should move toward the average.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalancingSuggestion {
    pub zone: Vec<String>,
    pub current_density: f64,
    pub target_density: f64,
    pub action: BalancingAction,
    pub description: String,
}

/// All three suggestion families for one snapshot.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExplorationSuggestions {
    pub priority_connections: Vec<ConnectionSuggestion>,
    pub bridge_opportunities: Vec<BridgeSuggestion>,
    pub density_balancing: Vec<BalancingSuggestion>,
}

/// Generates exploration suggestions from the territory partition.
pub fn exploration_suggestions(graph: &GraphData) -> ExplorationSuggestions {
    let mut suggestions = ExplorationSuggestions::default();

    let territories = identify_territories(graph);
    let avg_density = crate::cluster::average_cluster_density(graph);

    // Connect each under-explored zone to well-connected nodes elsewhere.
    for territory in &territories.unexplored {
        let Some(anchor) = territory.nodes.first() else {
            continue;
        };
        for target in nearby_high_density_nodes(anchor, graph) {
            suggestions.priority_connections.push(ConnectionSuggestion {
                from: anchor.clone(),
                to: target,
                reason: "Connecter zone isolée au réseau principal".to_string(),
                impact: "high".to_string(),
                priority: 1,
            });
        }
    }

    // Bridges between territory pairs with no edge between them.
    let all: Vec<&Territory> = territories.all().collect();
    for i in 0..all.len() {
        for j in (i + 1)..all.len() {
            let (t1, t2) = (all[i], all[j]);
            if t1.nodes.is_empty() || t2.nodes.is_empty() {
                continue;
            }
            if clusters_connected(&t1.nodes, &t2.nodes, graph) {
                continue;
            }
            suggestions.bridge_opportunities.push(BridgeSuggestion {
                cluster1: t1.nodes.clone(),
                cluster2: t2.nodes.clone(),
                suggested_node1: t1.central_node.clone(),
                suggested_node2: t2.central_node.clone(),
                impact: bridge_impact(t1, t2),
                description: "Créer un pont entre deux zones thématiques".to_string(),
            });
        }
    }

    // Density corrections toward the average.
    for territory in &territories.explored {
        if territory.density > avg_density * 1.5 {
            suggestions.density_balancing.push(BalancingSuggestion {
                zone: territory.nodes.clone(),
                current_density: territory.density,
                target_density: avg_density,
                action: BalancingAction::Distribute,
                description: "Zone surdense - envisager de créer des sous-groupes".to_string(),
            });
        }
    }
    for territory in &territories.unexplored {
        if territory.density < avg_density * 0.5 && territory.nodes.len() > 1 {
            suggestions.density_balancing.push(BalancingSuggestion {
                zone: territory.nodes.clone(),
                current_density: territory.density,
                target_density: avg_density,
                action: BalancingAction::Densify,
                description: "Zone sous-dense - ajouter des connexions internes".to_string(),
            });
        }
    }

    suggestions
        .priority_connections
        .sort_by_key(|c| c.priority);
    suggestions.bridge_opportunities.sort_by(|a, b| {
        b.impact
            .partial_cmp(&a.impact)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    suggestions
}

/// Up to three nodes noticeably better connected than average.
fn nearby_high_density_nodes(anchor: &str, graph: &GraphData) -> Vec<String> {
    let avg = global_average_degree(graph);
    let mut candidates = Vec::new();

    for node in &graph.nodes {
        if node.id != anchor && node_degree(graph, &node.id) as f64 > avg * 1.2 {
            candidates.push(node.id.clone());
            if candidates.len() >= 3 {
                break;
            }
        }
    }
    candidates
}

/// True if any edge joins the two node sets.
fn clusters_connected(cluster1: &[String], cluster2: &[String], graph: &GraphData) -> bool {
    let set1: HashSet<&str> = cluster1.iter().map(String::as_str).collect();
    let set2: HashSet<&str> = cluster2.iter().map(String::as_str).collect();

    graph.edges.iter().any(|e| {
        (set1.contains(e.from.as_str()) && set2.contains(e.to.as_str()))
            || (set2.contains(e.from.as_str()) && set1.contains(e.to.as_str()))
    })
}

/// Impact of bridging two territories, weighted toward their densities,
/// capped at 1.0.
fn bridge_impact(t1: &Territory, t2: &Territory) -> f64 {
    let size_impact = ((t1.size * t2.size + 1) as f64).ln();
    let density_impact = (t1.density + t2.density) / 2.0;
    (size_impact * 0.4 + density_impact * 0.6).min(1.0)
}
