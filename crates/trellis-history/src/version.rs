//! Version records and the semantic diff between snapshots.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use trellis_core::{Edge, GraphData, Node};
use trellis_graph::{graph_metrics, identify_clusters, GraphMetrics};

/// What changed between two snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    NodeAdded,
    EdgeAdded,
    NodeRemoved,
    EdgeRemoved,
    StructuralChange,
}

/// How much a change matters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Impact {
    Low,
    Medium,
    High,
}

/// One semantic change.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SemanticChange {
    #[serde(rename = "type")]
    pub kind: ChangeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub element_id: Option<String>,
    pub description: String,
    pub impact: Impact,
}

/// A saved, hashed, timestamped snapshot plus its computed diff.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SemanticVersion {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub graph_hash: String,
    pub graph_data: GraphData,
    pub changes: Vec<SemanticChange>,
    pub insights: Vec<String>,
    pub confidence: f64,
    pub description: String,
    pub tags: Vec<String>,
    pub metrics: GraphMetrics,
    pub is_eureka_moment: bool,
    pub is_restore: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restored_from: Option<String>,
}

/// Field-by-field difference between two versions.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionComparison {
    pub version1: SemanticVersion,
    pub version2: SemanticVersion,
    pub added_nodes: Vec<Node>,
    pub removed_nodes: Vec<Node>,
    pub added_edges: Vec<Edge>,
    pub removed_edges: Vec<Edge>,
    pub metrics_delta: MetricsDelta,
}

/// Metric deltas between two versions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsDelta {
    pub node_count_delta: i64,
    pub edge_count_delta: i64,
    pub density_delta: f64,
    pub components_delta: i64,
}

/// One entry of the evolution timeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvolutionEvent {
    pub timestamp: DateTime<Utc>,
    pub version_id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub description: String,
    pub impact: Impact,
    pub metrics: GraphMetrics,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub insights: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delta_from_previous: Option<VersionDelta>,
}

/// Difference from the preceding version in the timeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionDelta {
    pub elapsed_seconds: i64,
    pub changes_count: usize,
    pub confidence_delta: f64,
}

/// Content hash of the serialized snapshot, hex-encoded.
pub(crate) fn graph_hash(graph: &GraphData) -> String {
    let bytes = serde_json::to_vec(graph).unwrap_or_default();
    hex::encode(Sha256::digest(&bytes))
}

fn edge_key(edge: &Edge) -> String {
    format!("{}->{}", edge.from, edge.to)
}

/// Diffs two snapshots into semantic changes: added nodes, added edges
/// and a coarse structural-change flag.
pub(crate) fn detect_semantic_changes(
    current: &GraphData,
    previous: &GraphData,
) -> Vec<SemanticChange> {
    let mut changes = Vec::new();

    let prev_nodes: HashSet<&str> = previous.nodes.iter().map(|n| n.id.as_str()).collect();
    for node in &current.nodes {
        if !prev_nodes.contains(node.id.as_str()) {
            changes.push(SemanticChange {
                kind: ChangeKind::NodeAdded,
                element_id: Some(node.id.clone()),
                description: format!("Ajout du concept '{}'", node.label),
                impact: Impact::Low,
            });
        }
    }

    let prev_edges: HashSet<String> = previous.edges.iter().map(edge_key).collect();
    for edge in &current.edges {
        let key = edge_key(edge);
        if !prev_edges.contains(&key) {
            let impact = if is_critical_connection(edge, current) {
                Impact::High
            } else {
                Impact::Medium
            };
            changes.push(SemanticChange {
                kind: ChangeKind::EdgeAdded,
                element_id: Some(key),
                description: format!(
                    "Nouvelle relation: {} -> {} -> {}",
                    edge.from, edge.label, edge.to
                ),
                impact,
            });
        }
    }

    if detect_structural_change(current, previous) {
        changes.push(SemanticChange {
            kind: ChangeKind::StructuralChange,
            element_id: None,
            description: "Réorganisation majeure de la structure du graphe".to_string(),
            impact: Impact::High,
        });
    }

    changes
}

/// An edge is critical when it joins two distinct, named contexts.
fn is_critical_connection(edge: &Edge, graph: &GraphData) -> bool {
    let context_of = |id: &str| {
        graph
            .nodes
            .iter()
            .find(|n| n.id == id)
            .map(|n| n.context.as_str())
            .unwrap_or("")
    };
    let from_context = context_of(&edge.from);
    let to_context = context_of(&edge.to);

    from_context != to_context && !from_context.is_empty() && !to_context.is_empty()
}

/// Coarse structural-change test: component count shifted by two or
/// more, or density moved by more than 0.3 in absolute value.
fn detect_structural_change(current: &GraphData, previous: &GraphData) -> bool {
    let prev_components = identify_clusters(previous).len() as i64;
    let curr_components = identify_clusters(current).len() as i64;
    if (prev_components - curr_components).abs() >= 2 {
        return true;
    }

    let density_change =
        trellis_graph::global_density(current) - trellis_graph::global_density(previous);
    density_change.abs() > 0.3
}

/// Scalar confidence in the snapshot: connectivity ratio discounted by
/// the orphan share, clamped to 1.0.
pub(crate) fn calculate_confidence(graph: &GraphData) -> f64 {
    if graph.nodes.is_empty() {
        return 0.0;
    }

    let node_count = graph.nodes.len() as f64;
    let connectivity_ratio = graph.edges.len() as f64 / node_count;

    let mut connected: HashSet<&str> = HashSet::new();
    for edge in &graph.edges {
        connected.insert(edge.from.as_str());
        connected.insert(edge.to.as_str());
    }
    let orphans = graph
        .nodes
        .iter()
        .filter(|n| !connected.contains(n.id.as_str()))
        .count() as f64;
    let orphan_penalty = orphans / node_count;

    let confidence = (connectivity_ratio / 3.0) * (1.0 - orphan_penalty * 0.5);
    confidence.min(1.0)
}

/// Free-text insights from simple counting rules.
pub(crate) fn detect_insights(changes: &[SemanticChange], graph: &GraphData) -> Vec<String> {
    let mut insights = Vec::new();

    let high_impact = changes.iter().filter(|c| c.impact == Impact::High).count();
    if high_impact >= 3 {
        insights.push("Connexions multiples établies - pattern émergent détecté".to_string());
    }

    if changes.len() > 5 {
        insights.push(
            "Expansion rapide du graphe - nouvelle zone de connaissance explorée".to_string(),
        );
    }

    for change in changes {
        if change.kind == ChangeKind::EdgeAdded && is_bridge_connection(change, graph) {
            insights.push(format!("Pont conceptuel créé: {}", change.description));
        }
    }

    insights
}

/// Coarse bridge test kept from the original design: only meaningful on
/// graphs already carrying some structure.
fn is_bridge_connection(change: &SemanticChange, graph: &GraphData) -> bool {
    graph.edges.len() > 10 && change.element_id.as_ref().is_some_and(|id| !id.is_empty())
}

/// A version is a eureka moment when insights or high-impact changes
/// concentrate: ≥ 3 insights, any structural change, or ≥ 5 high-impact
/// changes.
pub(crate) fn is_eureka_moment(changes: &[SemanticChange], insights: &[String]) -> bool {
    if insights.len() >= 3 {
        return true;
    }
    if changes.iter().any(|c| c.kind == ChangeKind::StructuralChange) {
        return true;
    }
    changes.iter().filter(|c| c.impact == Impact::High).count() >= 5
}

/// Tags summarizing the change mix.
pub(crate) fn generate_tags(changes: &[SemanticChange], insights: &[String]) -> Vec<String> {
    let mut tags = Vec::new();
    if changes.iter().any(|c| c.kind == ChangeKind::NodeAdded) {
        tags.push("expansion".to_string());
    }
    if changes.iter().any(|c| c.kind == ChangeKind::EdgeAdded) {
        tags.push("connexion".to_string());
    }
    if changes.iter().any(|c| c.kind == ChangeKind::StructuralChange) {
        tags.push("restructuration".to_string());
    }
    if !insights.is_empty() {
        tags.push("insight".to_string());
    }
    tags
}

/// Builds a complete version record from the caller's snapshots.
pub(crate) fn build_version(
    id: String,
    current: GraphData,
    previous: &GraphData,
    description: String,
) -> SemanticVersion {
    let changes = detect_semantic_changes(&current, previous);
    let insights = detect_insights(&changes, &current);
    let eureka = is_eureka_moment(&changes, &insights);

    SemanticVersion {
        id,
        timestamp: Utc::now(),
        graph_hash: graph_hash(&current),
        confidence: calculate_confidence(&current),
        tags: generate_tags(&changes, &insights),
        metrics: graph_metrics(&current),
        is_eureka_moment: eureka,
        is_restore: false,
        restored_from: None,
        graph_data: current,
        changes,
        insights,
        description,
    }
}

/// Nodes present in `b` but not `a`.
pub(crate) fn added_nodes(a: &GraphData, b: &GraphData) -> Vec<Node> {
    let known: HashSet<&str> = a.nodes.iter().map(|n| n.id.as_str()).collect();
    b.nodes
        .iter()
        .filter(|n| !known.contains(n.id.as_str()))
        .cloned()
        .collect()
}

/// Edges present in `b` but not `a`, by endpoint pair.
pub(crate) fn added_edges(a: &GraphData, b: &GraphData) -> Vec<Edge> {
    let known: HashSet<String> = a.edges.iter().map(edge_key).collect();
    b.edges
        .iter()
        .filter(|e| !known.contains(&edge_key(e)))
        .cloned()
        .collect()
}

pub(crate) fn metrics_delta(m1: &GraphMetrics, m2: &GraphMetrics) -> MetricsDelta {
    MetricsDelta {
        node_count_delta: m2.node_count as i64 - m1.node_count as i64,
        edge_count_delta: m2.edge_count as i64 - m1.edge_count as i64,
        density_delta: m2.density - m1.density,
        components_delta: m2.components as i64 - m1.components as i64,
    }
}

/// Event type of a version in the evolution timeline. Eureka and restore
/// override the change-count classes.
pub(crate) fn classify_event_type(version: &SemanticVersion) -> &'static str {
    if version.is_eureka_moment {
        return "eureka";
    }
    if version.is_restore {
        return "restore";
    }
    match version.changes.len() {
        0 => "checkpoint",
        1..=3 => "minor",
        4..=10 => "major",
        _ => "massive",
    }
}

/// Impact class of a version for the timeline.
pub(crate) fn classify_impact(version: &SemanticVersion) -> Impact {
    let high = version
        .changes
        .iter()
        .filter(|c| c.impact == Impact::High)
        .count();

    if high >= 3 || version.is_eureka_moment {
        Impact::High
    } else if high >= 1 || version.changes.len() >= 5 {
        Impact::Medium
    } else {
        Impact::Low
    }
}

pub(crate) fn version_delta(prev: &SemanticVersion, curr: &SemanticVersion) -> VersionDelta {
    VersionDelta {
        elapsed_seconds: (curr.timestamp - prev.timestamp).num_seconds(),
        changes_count: curr.changes.len(),
        confidence_delta: curr.confidence - prev.confidence,
    }
}
