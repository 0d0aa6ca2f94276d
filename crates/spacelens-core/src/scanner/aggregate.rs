/// Subtree size aggregation using `jwalk`.
///
/// Each call walks one subtree serially: the caller already runs on a worker
/// of the shared pool, and independent subtrees are spread across workers,
/// so a nested rayon pool per walk would only add contention.
///
/// Links are never followed, which also rules out symlink cycles. Entries
/// that vanish or cannot be read mid-walk are skipped and logged at trace
/// level; they never abort the walk.
use crate::error::ScanFault;
use crate::model::size::SizeMetric;
use std::path::Path;
use tracing::trace;

/// Totals collected by a single subtree walk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WalkTotals {
    /// Sum of all non-directory entries below the root.
    pub bytes: u64,
    /// Number of entries below the root whose metadata could be read.
    pub readable: u64,
    /// Number of entries skipped because they could not be read.
    pub skipped: u64,
}

/// Walk the subtree below `root` and sum its sizes.
pub fn walk_totals(root: &Path, metric: SizeMetric) -> WalkTotals {
    let mut totals = WalkTotals::default();

    let walker = jwalk::WalkDir::new(root)
        .skip_hidden(true)
        .follow_links(false)
        .parallelism(jwalk::Parallelism::Serial);

    for entry_result in walker {
        let entry = match entry_result {
            Ok(e) => e,
            Err(err) => {
                totals.skipped += 1;
                if let Some(path) = err.path() {
                    trace!(
                        "{}",
                        ScanFault::PartialReadSkip {
                            path: path.to_path_buf()
                        }
                    );
                }
                continue;
            }
        };

        if entry.depth == 0 {
            continue;
        }

        match entry.metadata() {
            Ok(meta) => {
                totals.readable += 1;
                if !meta.is_dir() {
                    totals.bytes += metric.measure(&meta);
                }
            }
            Err(_) => {
                totals.skipped += 1;
                trace!("{}", ScanFault::PartialReadSkip { path: entry.path() });
            }
        }
    }

    totals
}

/// Sum a subtree and classify it.
///
/// Returns `(total, access_denied)`. The subtree counts as denied when the
/// walk reads not a single entry below the root. This cannot tell an empty
/// but readable directory apart from a denied one: both report
/// `(0, true)`.
pub fn try_compute_folder_size(path: &Path, metric: SizeMetric) -> (u64, bool) {
    let totals = walk_totals(path, metric);
    if totals.readable == 0 {
        trace!("{}", ScanFault::AggregateDenied { path: path.to_path_buf() });
        return (0, true);
    }
    (totals.bytes, false)
}

/// Sum a subtree without denial classification.
///
/// Used to correct directory entries left at a stale size of zero, and
/// where the hierarchy builder stops descending.
pub fn compute_folder_size(path: &Path, metric: SizeMetric) -> u64 {
    walk_totals(path, metric).bytes
}
