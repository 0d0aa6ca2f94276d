/// Depth-bounded hierarchy snapshot for the radial view.
///
/// Children are descended in parallel with rayon while the depth budget
/// lasts. At the cutoff the builder does not stop at zero: it substitutes the
/// full aggregate size of the elided subtree, so the outermost ring still
/// reflects true size.
use crate::model::size::SizeMetric;
use crate::model::{sort_by_size_desc, Entry};
use crate::scanner::aggregate::compute_folder_size;
use crate::scanner::probe;
use rayon::prelude::*;
use std::path::{Path, PathBuf};

/// Build the hierarchy rooted at `path`, descending at most `max_depth`
/// levels.
///
/// - Directories with enumerated children: size = sum of the children.
/// - Directories at the cutoff: size = aggregate size, no children.
/// - Unreadable directories: size 0, `access_denied`, no children.
///
/// Nothing is cached between calls, so the result only depends on the tree
/// on disk and rebuilding an unchanged tree yields an equal value.
pub fn build_hierarchy(path: &Path, max_depth: usize, metric: SizeMetric) -> Entry {
    build_node(path.to_path_buf(), max_depth, metric)
}

fn build_node(path: PathBuf, depth_left: usize, metric: SizeMetric) -> Entry {
    let entry = probe::probe_entry(path, metric, false);
    if !entry.is_dir {
        return entry;
    }

    if depth_left == 0 {
        // Only the directory itself is checked: an empty but readable
        // subtree at the cutoff is not denied.
        if !probe::is_listable(&entry.path) {
            return entry.deny();
        }
        let size = compute_folder_size(&entry.path, metric);
        return Entry { size, ..entry };
    }

    let Some(child_paths) = probe::enumerate(&entry.path) else {
        return entry.deny();
    };

    let mut children: Vec<Entry> = child_paths
        .into_par_iter()
        .map(|child| build_node(child, depth_left - 1, metric))
        .collect();
    sort_by_size_desc(&mut children);

    let size = children.iter().map(|c| c.size).sum();
    Entry {
        size,
        children,
        ..entry
    }
}

/// Number of levels below `root` (0 for a leaf).
pub fn depth_of(root: &Entry) -> usize {
    root.children
        .iter()
        .map(|c| 1 + depth_of(c))
        .max()
        .unwrap_or(0)
}
