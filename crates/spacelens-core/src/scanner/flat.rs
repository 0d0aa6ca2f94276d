/// Flat scanner: lists one directory's immediate children right away and
/// resolves the true size of each child directory in the background.
///
/// # Ordering
///
/// Every `on_discover` call of a scan happens on the calling thread, before
/// any aggregate computation is spawned. A consumer that forwards both
/// callbacks into one FIFO channel therefore always sees all discoveries of a
/// scan ahead of its resolutions. Resolutions complete in any order.
use crate::model::size::SizeMetric;
use crate::model::Entry;
use crate::scanner::aggregate::try_compute_folder_size;
use crate::scanner::probe;
use crate::scanner::WorkerPool;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Enumerates a single directory level.
#[derive(Clone)]
pub struct FlatScanner {
    pool: WorkerPool,
    metric: SizeMetric,
}

impl FlatScanner {
    pub fn new(pool: WorkerPool, metric: SizeMetric) -> Self {
        Self { pool, metric }
    }

    /// Scan the children of `dir`.
    ///
    /// `on_discover` fires once per non-hidden child, immediately: files with
    /// their final size, directories with size 0 and `loading` set. Each
    /// directory then gets one `on_size_resolved` call from a worker thread
    /// with its aggregate size and `loading` cleared.
    ///
    /// Returns the number of children reported. 0 means the directory was
    /// empty or could not be listed; no callback fires in either case.
    pub fn scan_children<D, R>(&self, dir: &Path, mut on_discover: D, on_size_resolved: R) -> usize
    where
        D: FnMut(Entry),
        R: Fn(Entry) + Send + Sync + 'static,
    {
        let Some(children) = probe::enumerate(dir) else {
            debug!("Could not enumerate {}", dir.display());
            return 0;
        };

        let count = children.len();
        let mut pending_dirs = Vec::new();
        for path in children {
            let entry = probe::probe_entry(path, self.metric, true);
            if entry.is_dir {
                pending_dirs.push(entry.clone());
            }
            on_discover(entry);
        }

        debug!(
            "Enumerated {}: {} children, {} directories pending",
            dir.display(),
            count,
            pending_dirs.len()
        );

        let on_size_resolved = Arc::new(on_size_resolved);
        for entry in pending_dirs {
            let callback = Arc::clone(&on_size_resolved);
            let metric = self.metric;
            self.pool.spawn(move || {
                let (size, denied) = try_compute_folder_size(&entry.path, metric);
                callback(entry.resolve(size, denied));
            });
        }

        count
    }
}
