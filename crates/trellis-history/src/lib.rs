//! Trellis History - semantic versioning of graph snapshots
//!
//! Saved versions are hash-addressed, timestamped snapshots carrying the
//! semantic diff against the snapshot the caller supplied as "previous".
//! The list is append-only in memory, guarded by one coarse lock, and
//! mirrored to a single pretty-printed JSON file after every mutation.

mod store;
mod version;

pub use store::{HistoryStore, StoreError};
pub use version::{
    ChangeKind, EvolutionEvent, Impact, MetricsDelta, SemanticChange, SemanticVersion,
    VersionComparison, VersionDelta,
};
