/// Engine configuration.
///
/// Every field has a default, so an empty JSON object (or no file at all)
/// yields a working configuration. Frontends override individual fields
/// from their own flags.
use crate::error::{CoreError, Result};
use crate::model::size::SizeMetric;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Default number of entries published per list projection.
pub const DEFAULT_DISPLAY_LIMIT: usize = 100;

/// Default depth of the hierarchy projection.
pub const DEFAULT_HIERARCHY_DEPTH: usize = 3;

/// Default quiet period before a hierarchy rebuild starts.
pub const DEFAULT_HIERARCHY_DEBOUNCE_MS: u64 = 350;

/// Settings for the scanning engine.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    /// Base display limit, restored every time a directory is opened.
    pub display_limit: usize,
    /// Depth of the hierarchy projection.
    pub hierarchy_depth: usize,
    /// Debounce delay for hierarchy rebuilds, in milliseconds.
    pub hierarchy_debounce_ms: u64,
    /// Worker pool size. `None` uses one thread per logical CPU.
    pub worker_threads: Option<usize>,
    /// Which file size is counted.
    pub size_metric: SizeMetric,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            display_limit: DEFAULT_DISPLAY_LIMIT,
            hierarchy_depth: DEFAULT_HIERARCHY_DEPTH,
            hierarchy_debounce_ms: DEFAULT_HIERARCHY_DEBOUNCE_MS,
            worker_threads: None,
            size_metric: SizeMetric::Logical,
        }
    }
}

impl CoreConfig {
    /// Parse a configuration from JSON text.
    pub fn from_json_str(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Load a configuration from a JSON file.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| CoreError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    /// Number of worker threads to start.
    pub fn worker_count(&self) -> usize {
        self.worker_threads.unwrap_or_else(num_cpus::get).max(1)
    }

    /// Debounce delay as a `Duration`.
    pub fn hierarchy_debounce(&self) -> Duration {
        Duration::from_millis(self.hierarchy_debounce_ms)
    }
}
