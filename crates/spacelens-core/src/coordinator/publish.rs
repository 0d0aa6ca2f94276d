/// Projections handed to the presentation layer, and the [`Publisher`] seam
/// that receives them.
///
/// The coordinator calls its publisher on the control thread every time a
/// projection changes. [`SnapshotPublisher`] keeps only the latest of each in
/// a [`SharedView`] that any frontend thread can read, in the same way the
/// scanner once exposed its live tree behind a `RwLock`.
use crate::model::entry::{serialize_opt_path_lossy, serialize_paths_lossy};
use crate::model::Entry;
use parking_lot::RwLock;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

/// Size-limited, size-sorted view of the current directory.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ListProjection {
    /// Directory being displayed. `None` in the empty state.
    #[serde(serialize_with = "serialize_opt_path_lossy")]
    pub current_path: Option<PathBuf>,
    /// At most `display_limit` children, largest first.
    pub entries: Vec<Entry>,
    /// `true` while enumeration or any subdirectory size is outstanding.
    pub is_scanning: bool,
    /// Transient error, e.g. after a denied directory.
    pub error_message: Option<String>,
    /// Ancestor chain from the filesystem root to `current_path`.
    #[serde(serialize_with = "serialize_paths_lossy")]
    pub breadcrumb: Vec<PathBuf>,
    /// Sum of every known child, not only the displayed ones.
    pub total_size: u64,
    /// Number of known children, not only the displayed ones.
    pub total_entries: usize,
    /// Every known child is access-denied.
    pub all_denied: bool,
}

/// Depth-bounded tree of the current directory.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HierarchyProjection {
    pub root: Option<Entry>,
    pub is_refreshing: bool,
}

/// Receiver of projections. Called on the control thread only.
pub trait Publisher: Send {
    fn publish_list(&mut self, projection: &ListProjection);
    fn publish_hierarchy(&mut self, projection: &HierarchyProjection);
}

/// Latest projections, with revision counters bumped on every publish.
#[derive(Debug, Clone, Default)]
pub struct ViewSnapshot {
    pub list: ListProjection,
    pub hierarchy: HierarchyProjection,
    pub list_revision: u64,
    pub hierarchy_revision: u64,
}

/// A shared, concurrently-readable view of the latest projections.
///
/// The control thread holds the write lock only to swap in a new projection.
pub type SharedView = Arc<RwLock<ViewSnapshot>>;

/// Publisher that stores the latest projections in a [`SharedView`].
#[derive(Debug, Clone, Default)]
pub struct SnapshotPublisher {
    view: SharedView,
}

impl SnapshotPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle for readers on other threads.
    pub fn view(&self) -> SharedView {
        Arc::clone(&self.view)
    }
}

impl Publisher for SnapshotPublisher {
    fn publish_list(&mut self, projection: &ListProjection) {
        let mut view = self.view.write();
        view.list = projection.clone();
        view.list_revision += 1;
    }

    fn publish_hierarchy(&mut self, projection: &HierarchyProjection) {
        let mut view = self.view.write();
        view.hierarchy = projection.clone();
        view.hierarchy_revision += 1;
    }
}
