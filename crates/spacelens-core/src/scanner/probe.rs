/// File-system probe: stats a single path without ever failing the caller.
use crate::model::size::SizeMetric;
use crate::model::Entry;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::trace;

/// Result of probing one path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stat {
    pub is_dir: bool,
    /// Final size for files, provisional 0 for directories.
    pub size: u64,
    pub modified: Option<SystemTime>,
    /// `false` if the metadata could not be read at all.
    pub readable: bool,
}

impl Stat {
    const UNREADABLE: Stat = Stat {
        is_dir: false,
        size: 0,
        modified: None,
        readable: false,
    };
}

/// Stat `path` without following symbolic links.
///
/// A link is reported as a non-directory carrying its own size, so probing
/// never escapes the subtree or loops on a cycle.
pub fn stat(path: &Path, metric: SizeMetric) -> Stat {
    match fs::symlink_metadata(path) {
        Ok(meta) => {
            let is_dir = meta.is_dir();
            Stat {
                is_dir,
                size: if is_dir { 0 } else { metric.measure(&meta) },
                modified: meta.modified().ok(),
                readable: true,
            }
        }
        Err(err) => {
            trace!("stat failed for {}: {err}", path.display());
            Stat::UNREADABLE
        }
    }
}

/// Build the initial [`Entry`] for a path.
///
/// Directories come back with size 0 and `loading` set to `pending_size`.
pub fn probe_entry(path: PathBuf, metric: SizeMetric, pending_size: bool) -> Entry {
    let st = stat(&path, metric);
    if st.is_dir {
        Entry::new_dir(path, st.modified, pending_size)
    } else {
        Entry::new_file(path, st.size, st.modified)
    }
}

/// Hidden entries (dot-files) are never reported.
pub fn is_hidden(name: &std::ffi::OsStr) -> bool {
    name.to_string_lossy().starts_with('.')
}

/// `dir` can be opened for listing.
pub fn is_listable(dir: &Path) -> bool {
    match fs::read_dir(dir) {
        Ok(_) => true,
        Err(err) => {
            trace!("read_dir failed for {}: {err}", dir.display());
            false
        }
    }
}

/// List the direct, non-hidden children of `dir` in enumeration order.
///
/// Returns `None` when the directory itself cannot be listed. Individual
/// unreadable entries are skipped.
pub fn enumerate(dir: &Path) -> Option<Vec<PathBuf>> {
    let read_dir = match fs::read_dir(dir) {
        Ok(rd) => rd,
        Err(err) => {
            trace!("read_dir failed for {}: {err}", dir.display());
            return None;
        }
    };
    Some(
        read_dir
            .filter_map(|entry| entry.ok())
            .filter(|entry| !is_hidden(&entry.file_name()))
            .map(|entry| entry.path())
            .collect(),
    )
}
