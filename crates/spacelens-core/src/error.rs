/// Error types for the scanning engine.
///
/// Two families:
/// - [`CoreError`]: setup failures returned as `Result` (worker pool,
///   control thread, configuration).
/// - [`ScanFault`]: conditions met while scanning. None of them is fatal:
///   each degrades to a zero size and/or a denial flag.
use std::path::PathBuf;
use thiserror::Error;

/// Result alias for fallible setup operations.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Failures that prevent the engine from starting.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The rayon worker pool could not be built.
    #[error("failed to build worker pool: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),

    /// The control thread could not be spawned.
    #[error("failed to spawn control thread: {0}")]
    ControlThread(#[source] std::io::Error),

    /// A configuration file could not be read.
    #[error("failed to read config {}: {source}", path.display())]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A configuration file is not valid JSON for [`crate::config::CoreConfig`].
    #[error("invalid config: {0}")]
    ConfigParse(#[from] serde_json::Error),
}

/// Non-fatal conditions encountered while scanning.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScanFault {
    /// The requested directory could not be listed at all.
    /// User-visible; triggers recovery to the last valid path.
    #[error("Access denied: {}", path.display())]
    EnumerationDenied { path: PathBuf },

    /// A subtree walk found nothing readable. Scoped to one entry.
    #[error("subtree unreadable: {}", path.display())]
    AggregateDenied { path: PathBuf },

    /// One entry could not be read during aggregation and was left out of
    /// the sum.
    #[error("skipped unreadable entry: {}", path.display())]
    PartialReadSkip { path: PathBuf },
}
