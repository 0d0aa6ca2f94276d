/// A single file-system node as tracked by the scanning engine.
///
/// Entries are plain values: the coordinator copies them into its cache and
/// into published projections instead of sharing them across threads.
use compact_str::CompactString;
use serde::{Serialize, Serializer};
use std::cmp::Ordering;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// A file or directory discovered by a scan.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Entry {
    /// Full path. Identity of the entry inside a listing.
    #[serde(serialize_with = "serialize_path_lossy")]
    pub path: PathBuf,

    /// File or directory name only, used for display.
    pub name: CompactString,

    /// Size in bytes.
    /// For directories this is 0 until the aggregate size has been resolved.
    pub size: u64,

    /// `true` if this entry represents a directory.
    pub is_dir: bool,

    /// Last-modified timestamp, if the metadata could be read.
    #[serde(skip)]
    pub modified: Option<SystemTime>,

    /// Child entries. Only populated by the hierarchy builder.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Entry>,

    /// `true` if the subtree could not be read.
    pub access_denied: bool,

    /// `true` only while the aggregate size of this directory is pending.
    pub loading: bool,
}

impl Entry {
    /// Create a file entry with its final size.
    pub fn new_file(path: PathBuf, size: u64, modified: Option<SystemTime>) -> Self {
        Self {
            name: display_name(&path),
            path,
            size,
            is_dir: false,
            modified,
            children: Vec::new(),
            access_denied: false,
            loading: false,
        }
    }

    /// Create a directory entry with a provisional size of 0.
    ///
    /// `loading` is set when an aggregate-size computation will follow.
    pub fn new_dir(path: PathBuf, modified: Option<SystemTime>, loading: bool) -> Self {
        Self {
            name: display_name(&path),
            path,
            size: 0,
            is_dir: true,
            modified,
            children: Vec::new(),
            access_denied: false,
            loading,
        }
    }

    /// Finish a pending directory: set its size and denial flag and clear
    /// `loading`. Consumes the entry so a resolved value is never re-armed.
    pub fn resolve(mut self, size: u64, access_denied: bool) -> Self {
        self.size = if access_denied { 0 } else { size };
        self.access_denied = access_denied;
        self.loading = false;
        self
    }

    /// Mark a directory as unreadable: size 0, no children.
    pub fn deny(mut self) -> Self {
        self.size = 0;
        self.children.clear();
        self.access_denied = true;
        self.loading = false;
        self
    }

    /// Sum of the direct children's sizes.
    pub fn children_size(&self) -> u64 {
        self.children.iter().map(|c| c.size).sum()
    }
}

/// Display name for a path: the last component, or the path itself for roots
/// such as `/`.
pub fn display_name(path: &Path) -> CompactString {
    match path.file_name() {
        Some(name) => CompactString::new(name.to_string_lossy()),
        None => CompactString::new(path.to_string_lossy()),
    }
}

fn size_desc(a: &Entry, b: &Entry) -> Ordering {
    b.size.cmp(&a.size).then_with(|| a.name.cmp(&b.name))
}

/// Sort entries by size descending. Ties are broken by name so the order of
/// a listing does not depend on enumeration or completion order.
pub fn sort_by_size_desc(entries: &mut [Entry]) {
    entries.sort_unstable_by(size_desc);
}

/// Merge `batch` into `entries`, which must already be sorted by
/// [`sort_by_size_desc`]. An entry of `batch` replaces any entry with the
/// same path.
///
/// Linear in `entries` plus a sort of `batch`.
pub fn merge_by_size_desc(entries: &mut Vec<Entry>, mut batch: Vec<Entry>) {
    if batch.is_empty() {
        return;
    }
    let replaced: HashSet<PathBuf> = batch.iter().map(|e| e.path.clone()).collect();
    sort_by_size_desc(&mut batch);

    let existing = std::mem::take(entries);
    let mut merged = Vec::with_capacity(existing.len() + batch.len());
    let mut old = existing
        .into_iter()
        .filter(|e| !replaced.contains(&e.path))
        .peekable();
    let mut new = batch.into_iter().peekable();
    loop {
        let take_old = match (old.peek(), new.peek()) {
            (Some(a), Some(b)) => size_desc(a, b) != Ordering::Greater,
            (Some(_), None) => true,
            (None, Some(_)) => false,
            (None, None) => break,
        };
        merged.extend(if take_old { old.next() } else { new.next() });
    }
    *entries = merged;
}

/// Serialize a path as a string, replacing invalid UTF-8 with U+FFFD.
/// serde's own impl fails on such paths.
pub fn serialize_path_lossy<P, S>(path: &P, serializer: S) -> Result<S::Ok, S::Error>
where
    P: AsRef<Path>,
    S: Serializer,
{
    serializer.serialize_str(&path.as_ref().to_string_lossy())
}

/// [`serialize_path_lossy`] for an optional path.
pub fn serialize_opt_path_lossy<S: Serializer>(
    path: &Option<PathBuf>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match path {
        Some(path) => serializer.serialize_some(&path.to_string_lossy()),
        None => serializer.serialize_none(),
    }
}

/// [`serialize_path_lossy`] for a list of paths.
pub fn serialize_paths_lossy<S: Serializer>(
    paths: &[PathBuf],
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(paths.iter().map(|p| p.to_string_lossy()))
}
