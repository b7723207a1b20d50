//! Flat-file version store.
//!
//! One coarse mutex guards the whole list; every mutation rewrites the
//! backing JSON file via write-to-temp-then-rename, so a failed save
//! leaves the previous file intact.

use crate::version::{
    added_edges, added_nodes, build_version, classify_event_type, classify_impact, graph_hash,
    metrics_delta, version_delta, EvolutionEvent, SemanticVersion, VersionComparison,
};
use chrono::Utc;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;
use tracing::{debug, warn};
use trellis_core::GraphData;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Version not found: {0}")]
    NotFound(String),
}

struct Inner {
    versions: Vec<SemanticVersion>,
    next_id: u64,
}

/// The version history, mirrored to a single JSON file.
pub struct HistoryStore {
    path: PathBuf,
    inner: Mutex<Inner>,
}

impl HistoryStore {
    /// Opens the store, loading any existing history file. A missing file
    /// is an empty history, not an error.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();

        let versions: Vec<SemanticVersion> = match fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };

        // IDs stay monotonic across deletions: resume after the highest
        // numeric suffix ever persisted.
        let next_id = versions
            .iter()
            .filter_map(|v| v.id.strip_prefix('v'))
            .filter_map(|n| n.parse::<u64>().ok())
            .max()
            .unwrap_or(0)
            + 1;

        debug!(versions = versions.len(), path = %path.display(), "history loaded");

        Ok(Self {
            path,
            inner: Mutex::new(Inner { versions, next_id }),
        })
    }

    /// Saves a new version: hashes the snapshot, diffs it against the
    /// supplied previous snapshot and appends the record.
    pub fn save_version(
        &self,
        current: GraphData,
        previous: GraphData,
        description: String,
    ) -> Result<SemanticVersion, StoreError> {
        let mut inner = self.inner.lock().expect("history lock poisoned");

        let id = format!("v{}", inner.next_id);
        inner.next_id += 1;

        let version = build_version(id, current, &previous, description);
        inner.versions.push(version.clone());
        self.persist(&inner.versions)?;

        Ok(version)
    }

    /// Returns the history, most recent first.
    pub fn list(&self) -> Vec<SemanticVersion> {
        let inner = self.inner.lock().expect("history lock poisoned");
        let mut sorted = inner.versions.clone();
        sorted.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        sorted
    }

    /// Re-saves an old snapshot as a new version flagged as a restore.
    pub fn restore_version(&self, version_id: &str) -> Result<SemanticVersion, StoreError> {
        let mut inner = self.inner.lock().expect("history lock poisoned");

        let target = inner
            .versions
            .iter()
            .find(|v| v.id == version_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(version_id.to_string()))?;

        let id = format!("v{}", inner.next_id);
        inner.next_id += 1;

        let restored = SemanticVersion {
            id,
            timestamp: Utc::now(),
            graph_hash: graph_hash(&target.graph_data),
            graph_data: target.graph_data.clone(),
            changes: Vec::new(),
            insights: Vec::new(),
            confidence: target.confidence,
            description: format!("Restauration de {}", target.id),
            tags: Vec::new(),
            metrics: target.metrics.clone(),
            is_eureka_moment: false,
            is_restore: true,
            restored_from: Some(target.id.clone()),
        };

        inner.versions.push(restored.clone());
        self.persist(&inner.versions)?;

        Ok(restored)
    }

    /// Compares two stored versions by ID.
    pub fn compare_versions(
        &self,
        id1: &str,
        id2: &str,
    ) -> Result<VersionComparison, StoreError> {
        let inner = self.inner.lock().expect("history lock poisoned");

        let find = |id: &str| {
            inner
                .versions
                .iter()
                .find(|v| v.id == id)
                .cloned()
                .ok_or_else(|| StoreError::NotFound(id.to_string()))
        };
        let v1 = find(id1)?;
        let v2 = find(id2)?;

        Ok(VersionComparison {
            added_nodes: added_nodes(&v1.graph_data, &v2.graph_data),
            removed_nodes: added_nodes(&v2.graph_data, &v1.graph_data),
            added_edges: added_edges(&v1.graph_data, &v2.graph_data),
            removed_edges: added_edges(&v2.graph_data, &v1.graph_data),
            metrics_delta: metrics_delta(&v1.metrics, &v2.metrics),
            version1: v1,
            version2: v2,
        })
    }

    /// Deletes one version by ID.
    pub fn delete_version(&self, version_id: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().expect("history lock poisoned");

        let before = inner.versions.len();
        inner.versions.retain(|v| v.id != version_id);
        if inner.versions.len() == before {
            return Err(StoreError::NotFound(version_id.to_string()));
        }

        self.persist(&inner.versions)
    }

    /// Clears the whole history.
    pub fn clear(&self) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().expect("history lock poisoned");
        inner.versions.clear();
        self.persist(&inner.versions)
    }

    /// The evolution timeline, in storage order.
    pub fn evolution_timeline(&self) -> Vec<EvolutionEvent> {
        let inner = self.inner.lock().expect("history lock poisoned");

        inner
            .versions
            .iter()
            .enumerate()
            .map(|(i, version)| EvolutionEvent {
                timestamp: version.timestamp,
                version_id: version.id.clone(),
                kind: classify_event_type(version).to_string(),
                description: version.description.clone(),
                impact: classify_impact(version),
                metrics: version.metrics.clone(),
                insights: if version.is_eureka_moment {
                    version.insights.clone()
                } else {
                    Vec::new()
                },
                delta_from_previous: (i > 0)
                    .then(|| version_delta(&inner.versions[i - 1], version)),
            })
            .collect()
    }

    /// Writes the full list to a temp file and renames it over the
    /// previous one.
    fn persist(&self, versions: &[SemanticVersion]) -> Result<(), StoreError> {
        let data = serde_json::to_vec_pretty(versions)?;

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, &data)?;
        if let Err(e) = fs::rename(&tmp, &self.path) {
            warn!(error = %e, "history rename failed, removing temp file");
            let _ = fs::remove_file(&tmp);
            return Err(e.into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_core::{Edge, EdgeKind, Node};

    fn graph_with(node_ids: &[&str], edges: &[(&str, &str)]) -> GraphData {
        GraphData {
            nodes: node_ids.iter().map(|id| Node::new(*id, "general")).collect(),
            edges: edges
                .iter()
                .map(|(a, b)| Edge::new(EdgeKind::Relation, *a, *b).with_label("lie"))
                .collect(),
            positions: None,
        }
    }

    fn open_store(dir: &tempfile::TempDir) -> HistoryStore {
        HistoryStore::open(dir.path().join("versions_history.json")).unwrap()
    }

    #[test]
    fn test_save_detects_added_node() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir);

        let previous = graph_with(&["A"], &[]);
        let current = graph_with(&["A", "X"], &[]);

        let version = store
            .save_version(current, previous, "ajout de X".to_string())
            .unwrap();

        let additions: Vec<_> = version
            .changes
            .iter()
            .filter(|c| c.kind == crate::ChangeKind::NodeAdded)
            .collect();
        assert_eq!(additions.len(), 1);
        assert_eq!(additions[0].element_id.as_deref(), Some("X"));
    }

    #[test]
    fn test_history_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("versions_history.json");

        {
            let store = HistoryStore::open(&path).unwrap();
            store
                .save_version(graph_with(&["A"], &[]), GraphData::default(), String::new())
                .unwrap();
        }

        let reopened = HistoryStore::open(&path).unwrap();
        let versions = reopened.list();
        assert_eq!(versions.len(), 1);
        assert_eq!(versions[0].id, "v1");
    }

    #[test]
    fn test_ids_monotonic_after_delete() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir);

        let v1 = store
            .save_version(graph_with(&["A"], &[]), GraphData::default(), String::new())
            .unwrap();
        store
            .save_version(graph_with(&["B"], &[]), GraphData::default(), String::new())
            .unwrap();

        store.delete_version(&v1.id).unwrap();
        let v3 = store
            .save_version(graph_with(&["C"], &[]), GraphData::default(), String::new())
            .unwrap();

        assert_eq!(v3.id, "v3");
    }

    #[test]
    fn test_restore_flags_new_version() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir);

        let original = store
            .save_version(graph_with(&["A"], &[]), GraphData::default(), String::new())
            .unwrap();
        let restored = store.restore_version(&original.id).unwrap();

        assert!(restored.is_restore);
        assert_eq!(restored.restored_from.as_deref(), Some("v1"));
        assert_eq!(restored.graph_data.nodes.len(), 1);
        assert_eq!(store.list().len(), 2);
    }

    #[test]
    fn test_unknown_version_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir);

        assert!(matches!(
            store.restore_version("v99"),
            Err(StoreError::NotFound(_))
        ));
        assert!(matches!(
            store.delete_version("v99"),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn test_compare_versions() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir);

        let v1 = store
            .save_version(graph_with(&["A"], &[]), GraphData::default(), String::new())
            .unwrap();
        let v2 = store
            .save_version(
                graph_with(&["A", "B"], &[("A", "B")]),
                graph_with(&["A"], &[]),
                String::new(),
            )
            .unwrap();

        let comparison = store.compare_versions(&v1.id, &v2.id).unwrap();
        assert_eq!(comparison.added_nodes.len(), 1);
        assert_eq!(comparison.added_edges.len(), 1);
        assert!(comparison.removed_nodes.is_empty());
        assert_eq!(comparison.metrics_delta.node_count_delta, 1);
    }

    #[test]
    fn test_evolution_timeline_delta() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir);

        store
            .save_version(graph_with(&["A"], &[]), GraphData::default(), "un".to_string())
            .unwrap();
        store
            .save_version(
                graph_with(&["A", "B"], &[]),
                graph_with(&["A"], &[]),
                "deux".to_string(),
            )
            .unwrap();

        let timeline = store.evolution_timeline();
        assert_eq!(timeline.len(), 2);
        assert!(timeline[0].delta_from_previous.is_none());

        let delta = timeline[1].delta_from_previous.as_ref().unwrap();
        assert_eq!(delta.changes_count, 1);
    }

    #[test]
    fn test_clear_empties_store_and_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir);

        store
            .save_version(graph_with(&["A"], &[]), GraphData::default(), String::new())
            .unwrap();
        store.clear().unwrap();
        assert!(store.list().is_empty());

        let reopened = open_store(&dir);
        assert!(reopened.list().is_empty());
    }
}
