//! Density map: zones, heatmap and empty-space detection.
//!
//! Positions are caller-supplied; when absent, a plain grid layout is
//! synthesized so the spatial figures stay meaningful. Nothing here is
//! persisted — positions are a per-request rendering aid, not ground
//! truth.

use crate::adjacency::{degree_counts, Adjacency};
use crate::cluster::{average_cluster_density, cluster_density, identify_clusters};
use crate::metrics::global_density;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use trellis_core::{GraphData, Position};

/// Grid cell size for empty-zone detection, in layout units.
const EMPTY_ZONE_GRID: f64 = 200.0;

/// Relative density classification of a zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ZoneKind {
    High,
    Medium,
    Low,
}

/// One cluster rendered as a spatial zone.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DensityZone {
    pub nodes: Vec<String>,
    pub center_x: f64,
    pub center_y: f64,
    pub radius: f64,
    pub density: f64,
    #[serde(rename = "type")]
    pub kind: ZoneKind,
    pub color: String,
}

/// One node's contribution to the heatmap.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeatmapPoint {
    pub x: f64,
    pub y: f64,
    pub intensity: f64,
    pub node_id: String,
    pub node_label: String,
}

/// A grid cell with no node in it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmptyZone {
    pub x: f64,
    pub y: f64,
    pub radius: f64,
}

/// The complete density picture of a snapshot.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DensityMap {
    pub zones: Vec<DensityZone>,
    pub heatmap_data: Vec<HeatmapPoint>,
    pub global_density: f64,
    pub empty_zones: Vec<EmptyZone>,
}

/// Lays the nodes out on a square grid, 100 units apart.
pub fn synthesize_positions(graph: &GraphData) -> HashMap<String, Position> {
    let grid = (graph.nodes.len() as f64).sqrt().ceil() as usize;
    let mut positions = HashMap::new();
    if grid == 0 {
        return positions;
    }

    for (i, node) in graph.nodes.iter().enumerate() {
        positions.insert(
            node.id.clone(),
            Position {
                x: ((i % grid) * 100) as f64,
                y: ((i / grid) * 100) as f64,
            },
        );
    }
    positions
}

/// Computes the full density map of a snapshot.
pub fn density_map(graph: &GraphData) -> DensityMap {
    if graph.nodes.is_empty() {
        return DensityMap::default();
    }

    let positions = match &graph.positions {
        Some(p) if !p.is_empty() => p.clone(),
        _ => synthesize_positions(graph),
    };

    let degrees = degree_counts(graph);
    let avg_density = average_cluster_density(graph);

    let zones = identify_clusters(graph)
        .iter()
        .filter(|c| !c.is_empty())
        .map(|cluster| density_zone(cluster, graph, &positions, avg_density))
        .collect();

    let adj = Adjacency::from_graph(graph);
    let max_degree = degrees.values().copied().max().unwrap_or(0);
    let heatmap_data = graph
        .nodes
        .iter()
        .filter_map(|node| {
            let pos = positions.get(&node.id)?;
            Some(HeatmapPoint {
                x: pos.x,
                y: pos.y,
                intensity: node_intensity(&node.id, &adj, &degrees, max_degree),
                node_id: node.id.clone(),
                node_label: node.label.clone(),
            })
        })
        .collect();

    DensityMap {
        zones,
        heatmap_data,
        global_density: global_density(graph),
        empty_zones: find_empty_zones(&positions),
    }
}

/// Builds the spatial zone for one cluster.
fn density_zone(
    cluster: &[String],
    graph: &GraphData,
    positions: &HashMap<String, Position>,
    avg_density: f64,
) -> DensityZone {
    let placed: Vec<&Position> = cluster.iter().filter_map(|id| positions.get(id)).collect();

    let (center_x, center_y) = if placed.is_empty() {
        (0.0, 0.0)
    } else {
        (
            placed.iter().map(|p| p.x).sum::<f64>() / placed.len() as f64,
            placed.iter().map(|p| p.y).sum::<f64>() / placed.len() as f64,
        )
    };

    let max_dist = placed
        .iter()
        .map(|p| ((p.x - center_x).powi(2) + (p.y - center_y).powi(2)).sqrt())
        .fold(0.0f64, f64::max);

    let density = cluster_density(cluster, graph);
    let (kind, color) = if density > avg_density * 1.5 {
        (ZoneKind::High, "#ef4444")
    } else if density > avg_density * 0.7 {
        (ZoneKind::Medium, "#f59e0b")
    } else {
        (ZoneKind::Low, "#3b82f6")
    };

    DensityZone {
        nodes: cluster.to_vec(),
        center_x,
        center_y,
        radius: max_dist + 50.0,
        density,
        kind,
        color: color.to_string(),
    }
}

/// Heat at one node: its own degree weighted 0.5 plus each unique
/// neighbor's degree weighted 0.2, normalized by twice the maximum
/// degree and clamped to 1.0.
fn node_intensity(
    id: &str,
    adj: &Adjacency,
    degrees: &HashMap<String, usize>,
    max_degree: usize,
) -> f64 {
    let own = degrees.get(id).copied().unwrap_or(0) as f64;
    let mut intensity = own * 0.5;
    for neighbor in adj.unique_neighbors(id) {
        intensity += degrees.get(neighbor).copied().unwrap_or(0) as f64 * 0.2;
    }

    if max_degree > 0 {
        intensity /= (max_degree * 2) as f64;
    }
    intensity.min(1.0)
}

/// Scans the bounding box on a fixed grid and reports unoccupied cells.
///
/// Cell keys are decimal `"x,y"` pairs, so negative and large coordinates
/// can never collide.
fn find_empty_zones(positions: &HashMap<String, Position>) -> Vec<EmptyZone> {
    let mut empty = Vec::new();
    if positions.is_empty() {
        return empty;
    }

    let cell = |v: f64| (v / EMPTY_ZONE_GRID).floor() as i64;

    let mut occupied: HashSet<String> = HashSet::new();
    let mut min_x = f64::MAX;
    let mut max_x = f64::MIN;
    let mut min_y = f64::MAX;
    let mut max_y = f64::MIN;

    for pos in positions.values() {
        min_x = min_x.min(pos.x);
        max_x = max_x.max(pos.x);
        min_y = min_y.min(pos.y);
        max_y = max_y.max(pos.y);
        occupied.insert(format!("{},{}", cell(pos.x), cell(pos.y)));
    }

    let start_x = cell(min_x) - 1;
    let end_x = (max_x / EMPTY_ZONE_GRID).ceil() as i64 + 1;
    let start_y = cell(min_y) - 1;
    let end_y = (max_y / EMPTY_ZONE_GRID).ceil() as i64 + 1;

    for x in start_x..=end_x {
        for y in start_y..=end_y {
            if !occupied.contains(&format!("{},{}", x, y)) {
                empty.push(EmptyZone {
                    x: x as f64 * EMPTY_ZONE_GRID + EMPTY_ZONE_GRID / 2.0,
                    y: y as f64 * EMPTY_ZONE_GRID + EMPTY_ZONE_GRID / 2.0,
                    radius: EMPTY_ZONE_GRID / 2.0,
                });
            }
        }
    }

    empty
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
    fn test_empty_graph_yields_empty_map() {
        let map = density_map(&GraphData::default());
        assert!(map.zones.is_empty());
        assert!(map.heatmap_data.is_empty());
        assert_eq!(map.global_density, 0.0);
    }

    #[test]
    fn test_positions_synthesized_on_grid() {
        let graph = make_graph(&["a", "b", "c", "d", "e"], &[]);
        let positions = synthesize_positions(&graph);

        assert_eq!(positions.len(), 5);
        // Grid side is ceil(sqrt(5)) = 3; the fourth node wraps.
        assert_eq!(positions["d"], Position { x: 0.0, y: 100.0 });
    }

    #[test]
    fn test_heatmap_uses_supplied_positions() {
        let mut graph = make_graph(&["a", "b"], &[("a", "b")]);
        let mut positions = HashMap::new();
        positions.insert("a".to_string(), Position { x: 10.0, y: 20.0 });
        positions.insert("b".to_string(), Position { x: 30.0, y: 40.0 });
        graph.positions = Some(positions);

        let map = density_map(&graph);
        let point_a = map.heatmap_data.iter().find(|p| p.node_id == "a").unwrap();
        assert_eq!((point_a.x, point_a.y), (10.0, 20.0));
    }

    #[test]
    fn test_intensity_clamped_to_one() {
        let graph = make_graph(&["a", "b"], &[("a", "b"), ("a", "b"), ("a", "b")]);
        let map = density_map(&graph);
        for point in &map.heatmap_data {
            assert!(point.intensity <= 1.0);
            assert!(point.intensity >= 0.0);
        }
    }

    #[test]
    fn test_empty_zones_use_composite_keys() {
        // Two nodes in the same 200-unit cell: the surrounding ring of
        // cells is empty.
        let mut positions = HashMap::new();
        positions.insert("a".to_string(), Position { x: 10.0, y: 10.0 });
        positions.insert("b".to_string(), Position { x: 50.0, y: 50.0 });

        let zones = find_empty_zones(&positions);
        // 4×4 scan window (one cell padding each side) minus the occupied cell.
        assert_eq!(zones.len(), 15);
        assert!(zones
            .iter()
            .all(|z| !(z.x == 100.0 && z.y == 100.0)));
    }

    #[test]
    fn test_negative_coordinates_do_not_collide() {
        let mut positions = HashMap::new();
        positions.insert("a".to_string(), Position { x: -250.0, y: 10.0 });
        positions.insert("b".to_string(), Position { x: 250.0, y: 10.0 });

        let zones = find_empty_zones(&positions);
        // Cells (-2,0) and (1,0) are occupied and must not be reported.
        assert!(zones.iter().all(|z| z.x != -300.0 || z.y != 100.0));
        assert!(zones.iter().all(|z| z.x != 300.0 || z.y != 100.0));
    }

    #[test]
    fn test_zone_classification_against_average() {
        // Triangle plus isolated nodes: the triangle zone is high-density.
        let graph = make_graph(
            &["a", "b", "c", "x", "y"],
            &[("a", "b"), ("b", "c"), ("c", "a")],
        );
        let map = density_map(&graph);

        let triangle_zone = map
            .zones
            .iter()
            .find(|z| z.nodes.contains(&"a".to_string()))
            .unwrap();
        assert_eq!(triangle_zone.kind, ZoneKind::High);
    }
}
