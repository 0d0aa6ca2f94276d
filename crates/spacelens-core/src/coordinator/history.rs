/// Navigation history: the stack of directories that were successfully
/// displayed.
///
/// Paths are pushed only after a directory was shown, and popped only by
/// explicit back-navigation or forced recovery.
use std::path::{Path, PathBuf};

/// Maximum number of entries kept. The oldest entry is dropped first.
///
/// Prevents unbounded growth under rapid or scripted navigation.
pub const MAX_NAV_HISTORY: usize = 256;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct NavigationHistory {
    stack: Vec<PathBuf>,
}

impl NavigationHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push `path` unless it already is the top entry.
    /// Returns `true` if the history changed.
    pub fn push_if_new(&mut self, path: &Path) -> bool {
        if self.top() == Some(path) {
            return false;
        }
        if self.stack.len() >= MAX_NAV_HISTORY {
            self.stack.remove(0);
        }
        self.stack.push(path.to_path_buf());
        true
    }

    /// Pop the top entry if it equals `path`.
    pub fn pop_if_top(&mut self, path: &Path) -> bool {
        if self.top() == Some(path) {
            self.stack.pop();
            true
        } else {
            false
        }
    }

    pub fn top(&self) -> Option<&Path> {
        self.stack.last().map(PathBuf::as_path)
    }

    pub fn clear(&mut self) {
        self.stack.clear();
    }

    pub fn len(&self) -> usize {
        self.stack.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    /// Entries from oldest to most recent.
    pub fn paths(&self) -> &[PathBuf] {
        &self.stack
    }
}
