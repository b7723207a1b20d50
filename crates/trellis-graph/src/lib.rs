//! Trellis Graph - connectivity analytics over note graphs
//!
//! Every analysis in this crate is a pure function from a
//! [`trellis_core::GraphData`] snapshot (or a notes-by-context map for the
//! text-driven ones) to a derived view. Nothing is cached and nothing is
//! shared: each call recomputes from scratch, which is the intended
//! trade-off for graphs of tens to low hundreds of nodes.
//!
//! Edges are stored directed but traversed as undirected everywhere except
//! the temporal-cycle detector, which follows relation direction.
//!
//! # Architecture
//!
//! - [`Adjacency`] is the canonical undirected neighbor map every traversal
//!   consumes.
//! - [`NoteGraph`] wraps petgraph with string-ID indexes for lookups and
//!   shortest paths on behalf of the query surfaces.
//! - The remaining modules each own one analysis family and its result
//!   types.

mod adjacency;
mod cluster;
mod cone;
mod consistency;
mod density_map;
mod graph;
mod layout;
mod metrics;
mod questions;
mod suggestions;
mod temporal;
mod timeline;

pub use adjacency::{degree_counts, node_degree, Adjacency};
pub use cluster::{
    average_cluster_density, cluster_density, count_external_connections, count_internal_edges,
    find_central_node, find_orphans, identify_clusters, identify_territories,
    ConceptualTerritories, Territory, TerritoryKind, TerritoryMetrics,
};
pub use cone::{expansion_cone, find_all_paths, find_clusters_and_paths, ClusterSearch, ExpansionCone};
pub use consistency::{
    ConsistencyChecker, ConsistencyRules, Inconsistency, InconsistencyKind, Severity,
};
pub use density_map::{density_map, synthesize_positions, DensityMap, DensityZone, EmptyZone, HeatmapPoint, ZoneKind};
pub use graph::{GraphStats, NoteGraph};
pub use layout::{layered_graph, Layer, LayeredGraph, LayeredNode};
pub use metrics::{
    balance_score, density_metrics, global_average_degree, global_clustering_coefficient,
    global_density, graph_metrics, identify_hubs, identify_peripherals, DensityMetrics,
    GraphMetrics,
};
pub use questions::{generate_investigation_questions, InvestigationQuestion, Priority, QuestionKind};
pub use suggestions::{
    exploration_suggestions, BalancingAction, BalancingSuggestion, BridgeSuggestion,
    ConnectionSuggestion, ExplorationSuggestions,
};
pub use temporal::{TemporalAnalyzer, TemporalLexicon, TemporalPattern};
pub use timeline::{timeline_events, Importance, TimelineEvent};
