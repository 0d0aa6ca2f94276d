/// Scanner module: filesystem traversal primitives.
///
/// Leaf-first:
/// - [`probe`]: stats one path, fails soft.
/// - [`aggregate`]: recursive subtree sizing (`jwalk`).
/// - [`flat`]: one-level enumeration with asynchronous subdirectory sizing.
/// - [`hierarchy`]: depth-bounded snapshot for the radial view.
/// - [`progress`]: messages between workers, frontends and the control thread.
///
/// All traversal runs on a shared rayon [`WorkerPool`], never on the control
/// thread.
pub mod aggregate;
pub mod flat;
pub mod hierarchy;
pub mod probe;
pub mod progress;

use crate::error::Result;
use std::sync::Arc;

/// Shared pool that runs every filesystem task.
pub type WorkerPool = Arc<rayon::ThreadPool>;

/// Maximum number of worker messages that may queue up for the control
/// thread.
///
/// Workers block on `send` once the queue is full, so a control thread that
/// falls behind slows the scan down instead of growing the heap without
/// bound.
pub const WORKER_CHANNEL_CAPACITY: usize = 4_096;

/// Build the worker pool with `threads` named threads.
pub fn build_worker_pool(threads: usize) -> Result<WorkerPool> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(threads.max(1))
        .thread_name(|i| format!("spacelens-worker-{i}"))
        .build()?;
    Ok(Arc::new(pool))
}
