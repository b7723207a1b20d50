//! Request handlers, one per protocol method.
//!
//! Each handler decodes its params, calls one core operation and wraps
//! the result. Analyses never fail on degenerate input; only the oracle
//! and the version store produce error responses.

use crate::protocol::Response;
use crate::SharedState;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::debug;
use trellis_core::{Edge, GraphData, Node};
use trellis_graph::{
    density_map, density_metrics, expansion_cone, exploration_suggestions, find_all_paths,
    find_clusters_and_paths, generate_investigation_questions, identify_territories,
    layered_graph, timeline_events, ConsistencyChecker, NoteGraph, TemporalAnalyzer,
};
use trellis_history::StoreError;

type Notes = BTreeMap<String, Vec<String>>;

#[derive(Debug, Deserialize)]
pub struct ParseParams {
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct NotesParams {
    pub notes: Notes,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConeParams {
    pub node_id: String,
    #[serde(default = "default_depth")]
    pub depth: usize,
    pub graph_data: GraphData,
}

fn default_depth() -> usize {
    2
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchParams {
    pub terms: Vec<String>,
    pub graph_data: GraphData,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphParams {
    pub graph_data: GraphData,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeGetParams {
    pub id: String,
    pub graph_data: GraphData,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PathAnalysisParams {
    pub path: Vec<String>,
    pub notes: Notes,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterAnalysisParams {
    pub clusters: BTreeMap<String, Vec<String>>,
    pub graph_data: GraphData,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveVersionParams {
    pub graph_data: GraphData,
    #[serde(default)]
    pub previous_graph_data: GraphData,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionIdParams {
    pub version_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompareParams {
    pub version1_id: String,
    pub version2_id: String,
}

/// notes.parse — raw notation text to subjects and notes-by-context.
pub async fn handle_parse(state: SharedState, id: Option<Value>, params: ParseParams) -> Response {
    debug!(bytes = params.text.len(), "parsing notation");
    Response::success(id, state.parser.parse(&params.text))
}

/// graph.build — notes-by-context to a graph snapshot.
pub async fn handle_build(state: SharedState, id: Option<Value>, params: NotesParams) -> Response {
    Response::success(id, state.parser.parse_to_graph(&params.notes))
}

/// graph.cone — bounded-depth reachability from one node.
pub async fn handle_cone(_state: SharedState, id: Option<Value>, params: ConeParams) -> Response {
    let cone = expansion_cone(&params.node_id, params.depth, &params.graph_data);
    Response::success(id, cone)
}

/// graph.search — term-matched clusters and their connecting paths.
pub async fn handle_search(
    _state: SharedState,
    id: Option<Value>,
    params: SearchParams,
) -> Response {
    let terms: Vec<String> = params
        .terms
        .iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect();
    if terms.is_empty() {
        return Response::invalid_params(id, "no search terms supplied");
    }

    Response::success(id, find_clusters_and_paths(&terms, &params.graph_data))
}

/// graph.paths — all shortest paths with at least one intermediate hop.
pub async fn handle_paths(
    _state: SharedState,
    id: Option<Value>,
    params: GraphParams,
) -> Response {
    Response::success(id, find_all_paths(&params.graph_data))
}

/// graph.node — one node with its undirected neighborhood.
pub async fn handle_node_get(
    _state: SharedState,
    id: Option<Value>,
    params: NodeGetParams,
) -> Response {
    let graph = NoteGraph::from_graph_data(&params.graph_data);

    let Some(node) = graph.get(&params.id) else {
        return Response::not_found(id, format!("Node not found: {}", params.id));
    };

    #[derive(Serialize)]
    #[serde(rename_all = "camelCase")]
    struct Neighbor<'a> {
        node: &'a Node,
        edge: &'a Edge,
    }

    #[derive(Serialize)]
    #[serde(rename_all = "camelCase")]
    struct NodeResult<'a> {
        node: &'a Node,
        neighbors: Vec<Neighbor<'a>>,
    }

    let neighbors = graph
        .neighbors(&params.id)
        .into_iter()
        .map(|(node, edge)| Neighbor { node, edge })
        .collect();

    Response::success(
        id,
        NodeResult {
            node,
            neighbors,
        },
    )
}

/// graph.layered — role-banded layout.
pub async fn handle_layered(
    _state: SharedState,
    id: Option<Value>,
    params: GraphParams,
) -> Response {
    Response::success(id, layered_graph(&params.graph_data))
}

/// analysis.temporal — marker-driven temporal patterns over notes.
pub async fn handle_temporal(
    _state: SharedState,
    id: Option<Value>,
    params: NotesParams,
) -> Response {
    let analyzer = TemporalAnalyzer::default();
    Response::success(id, analyzer.detect_patterns(&params.notes))
}

/// analysis.consistency — the five consistency detectors.
pub async fn handle_consistency(
    _state: SharedState,
    id: Option<Value>,
    params: GraphParams,
) -> Response {
    let checker = ConsistencyChecker::default();
    Response::success(id, checker.check(&params.graph_data))
}

/// analysis.questions — investigation question generation.
pub async fn handle_questions(
    _state: SharedState,
    id: Option<Value>,
    params: GraphParams,
) -> Response {
    Response::success(id, generate_investigation_questions(&params.graph_data))
}

/// analysis.summary — oracle-written situation summary.
pub async fn handle_summary(
    state: SharedState,
    id: Option<Value>,
    params: GraphParams,
) -> Response {
    match state.oracle.analyze_graph(&params.graph_data).await {
        Ok(text) => Response::success(id, text),
        Err(e) => Response::upstream_error(id, e.to_string()),
    }
}

/// analysis.path — oracle reading of one discovered path.
pub async fn handle_path_analysis(
    state: SharedState,
    id: Option<Value>,
    params: PathAnalysisParams,
) -> Response {
    match state.oracle.analyze_path(&params.path, &params.notes).await {
        Ok(text) => Response::success(id, text),
        Err(e) => Response::upstream_error(id, e.to_string()),
    }
}

/// analysis.clusters — oracle interpretation of a cluster partition.
pub async fn handle_cluster_analysis(
    state: SharedState,
    id: Option<Value>,
    params: ClusterAnalysisParams,
) -> Response {
    if params.clusters.is_empty() {
        return Response::invalid_params(id, "no clusters to analyze");
    }
    match state
        .oracle
        .analyze_clusters(&params.clusters, &params.graph_data)
        .await
    {
        Ok(text) => Response::success(id, text),
        Err(e) => Response::upstream_error(id, e.to_string()),
    }
}

/// density.map — zones, heatmap and empty space.
pub async fn handle_density_map(
    _state: SharedState,
    id: Option<Value>,
    params: GraphParams,
) -> Response {
    Response::success(id, density_map(&params.graph_data))
}

/// density.territories — explored / unexplored / frontier partition.
pub async fn handle_territories(
    _state: SharedState,
    id: Option<Value>,
    params: GraphParams,
) -> Response {
    Response::success(id, identify_territories(&params.graph_data))
}

/// density.suggestions — connection, bridge and balancing advice.
pub async fn handle_suggestions(
    _state: SharedState,
    id: Option<Value>,
    params: GraphParams,
) -> Response {
    Response::success(id, exploration_suggestions(&params.graph_data))
}

/// density.metrics — the full metric report.
pub async fn handle_density_metrics(
    _state: SharedState,
    id: Option<Value>,
    params: GraphParams,
) -> Response {
    Response::success(id, density_metrics(&params.graph_data))
}

/// timeline.events — dated events extracted from notes.
pub async fn handle_timeline(
    _state: SharedState,
    id: Option<Value>,
    params: NotesParams,
) -> Response {
    Response::success(id, timeline_events(&params.notes))
}

/// history.save — snapshot, diff and append a version.
pub async fn handle_history_save(
    state: SharedState,
    id: Option<Value>,
    params: SaveVersionParams,
) -> Response {
    match state.history.save_version(
        params.graph_data,
        params.previous_graph_data,
        params.description,
    ) {
        Ok(version) => Response::success(id, version),
        Err(e) => store_error(id, e),
    }
}

/// history.list — the full history, newest first.
pub async fn handle_history_list(state: SharedState, id: Option<Value>) -> Response {
    Response::success(id, state.history.list())
}

/// history.restore — re-save an old snapshot as a new version.
pub async fn handle_history_restore(
    state: SharedState,
    id: Option<Value>,
    params: VersionIdParams,
) -> Response {
    match state.history.restore_version(&params.version_id) {
        Ok(version) => Response::success(id, version),
        Err(e) => store_error(id, e),
    }
}

/// history.compare — set differences and metric deltas between versions.
pub async fn handle_history_compare(
    state: SharedState,
    id: Option<Value>,
    params: CompareParams,
) -> Response {
    match state
        .history
        .compare_versions(&params.version1_id, &params.version2_id)
    {
        Ok(comparison) => Response::success(id, comparison),
        Err(e) => store_error(id, e),
    }
}

/// history.delete — remove one version.
pub async fn handle_history_delete(
    state: SharedState,
    id: Option<Value>,
    params: VersionIdParams,
) -> Response {
    match state.history.delete_version(&params.version_id) {
        Ok(()) => Response::success(
            id,
            serde_json::json!({ "message": format!("Version {} supprimée", params.version_id) }),
        ),
        Err(e) => store_error(id, e),
    }
}

/// history.clear — drop the whole history.
pub async fn handle_history_clear(state: SharedState, id: Option<Value>) -> Response {
    match state.history.clear() {
        Ok(()) => Response::success(id, serde_json::json!({ "message": "Historique effacé" })),
        Err(e) => store_error(id, e),
    }
}

/// history.evolution — the evolution timeline.
pub async fn handle_history_evolution(state: SharedState, id: Option<Value>) -> Response {
    Response::success(id, state.history.evolution_timeline())
}

fn store_error(id: Option<Value>, error: StoreError) -> Response {
    match error {
        StoreError::NotFound(version) => {
            Response::not_found(id, format!("Version not found: {}", version))
        }
        other => Response::error(id, -32603, other.to_string()),
    }
}
