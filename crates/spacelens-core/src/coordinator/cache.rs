/// Directory listing cache owned by the coordinator.
///
/// Maps a directory to its children, sorted by size descending. A listing is
/// replaced wholesale only when a scan commits its enumeration, and patched
/// entry by entry as subdirectory sizes resolve.
use crate::model::{merge_by_size_desc, sort_by_size_desc, Entry};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Cached children of one directory.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Listing {
    /// Children, sorted by size descending.
    pub entries: Vec<Entry>,
    /// `true` once a scan finished enumerating the directory. A placeholder
    /// left by an interrupted scan may hold a few resolved entries but is
    /// never committed.
    pub committed: bool,
}

impl Listing {
    /// A committed listing whose every entry has its final size.
    pub fn is_complete(&self) -> bool {
        self.committed && self.entries.iter().all(|e| !e.loading)
    }

    /// Sum of all children.
    pub fn total_size(&self) -> u64 {
        self.entries.iter().map(|e| e.size).sum()
    }
}

#[derive(Debug, Default)]
pub struct ListingCache {
    listings: HashMap<PathBuf, Listing>,
}

impl ListingCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, dir: &Path) -> Option<&Listing> {
        self.listings.get(dir)
    }

    /// Children of `dir` if its listing can be shown without scanning.
    pub fn hit(&self, dir: &Path) -> Option<&[Entry]> {
        self.listings
            .get(dir)
            .filter(|l| l.is_complete())
            .map(|l| l.entries.as_slice())
    }

    /// Replace the listing of `dir` with an empty, uncommitted placeholder.
    pub fn reset_placeholder(&mut self, dir: &Path) {
        self.listings.insert(dir.to_path_buf(), Listing::default());
    }

    pub fn remove(&mut self, dir: &Path) -> Option<Listing> {
        self.listings.remove(dir)
    }

    /// Commit a finished enumeration as the new listing of `dir`.
    pub fn commit(&mut self, dir: &Path, mut entries: Vec<Entry>) {
        sort_by_size_desc(&mut entries);
        self.listings.insert(
            dir.to_path_buf(),
            Listing {
                entries,
                committed: true,
            },
        );
    }

    /// Replace the entry with the same path, or insert it in size order.
    ///
    /// Does nothing when `dir` has no listing at all.
    pub fn patch(&mut self, dir: &Path, entry: Entry) {
        self.patch_many(dir, vec![entry]);
    }

    /// [`patch`](Self::patch) for a batch of entries.
    pub fn patch_many(&mut self, dir: &Path, entries: Vec<Entry>) {
        let Some(listing) = self.listings.get_mut(dir) else {
            return;
        };
        merge_by_size_desc(&mut listing.entries, entries);
    }

    /// Apply corrected sizes to existing entries of `dir`.
    ///
    /// Unlike [`patch`](Self::patch) nothing is appended. Returns `true` if
    /// any entry changed.
    pub fn apply_corrections(&mut self, dir: &Path, updates: &[Entry]) -> bool {
        let Some(listing) = self.listings.get_mut(dir) else {
            return false;
        };
        let mut changed = false;
        for update in updates {
            if let Some(slot) = listing.entries.iter_mut().find(|e| e.path == update.path) {
                if slot != update {
                    *slot = update.clone();
                    changed = true;
                }
            }
        }
        if changed {
            sort_by_size_desc(&mut listing.entries);
        }
        changed
    }

    pub fn len(&self) -> usize {
        self.listings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listings.is_empty()
    }
}
