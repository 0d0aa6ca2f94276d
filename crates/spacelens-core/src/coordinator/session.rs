/// In-flight state of one scan, discarded wholesale when superseded.
use crate::model::Entry;
use crate::scanner::progress::ScanToken;
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

/// How a directory is being opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenMode {
    /// Push the directory onto the history once it is displayed.
    pub record_history: bool,
    /// The open is an automatic recovery after a denied scan.
    pub recovering: bool,
}

impl OpenMode {
    pub const USER: OpenMode = OpenMode {
        record_history: true,
        recovering: false,
    };
    pub const REVISIT: OpenMode = OpenMode {
        record_history: false,
        recovering: false,
    };
    pub const RECOVERY: OpenMode = OpenMode {
        record_history: false,
        recovering: true,
    };
}

#[derive(Debug)]
pub struct ScanSession {
    pub token: ScanToken,
    pub path: PathBuf,
    pub mode: OpenMode,
    /// Children reported by the enumeration so far.
    pub discovered: usize,
    /// Child directories whose size is still being computed.
    pub pending: HashSet<PathBuf>,
    pub enumeration_finished: bool,
    /// Entries reported since the last [`take_staged`](Self::take_staged),
    /// latest state per path.
    staged: HashMap<PathBuf, Entry>,
    /// Resolved directories not yet patched into the cache.
    resolved: Vec<Entry>,
    /// At least one staged entry is a discovery.
    discoveries_staged: bool,
}

/// Entries taken from a session in one batch.
#[derive(Debug, Default)]
pub struct StagedBatch {
    /// Every staged entry, for the visible list.
    pub entries: Vec<Entry>,
    /// The resolved subset, for the cache.
    pub resolved: Vec<Entry>,
}

impl ScanSession {
    pub fn new(token: ScanToken, path: PathBuf, mode: OpenMode) -> Self {
        Self {
            token,
            path,
            mode,
            discovered: 0,
            pending: HashSet::new(),
            enumeration_finished: false,
            staged: HashMap::new(),
            resolved: Vec::new(),
            discoveries_staged: false,
        }
    }

    pub fn discover(&mut self, entry: Entry) {
        if entry.is_dir && entry.loading {
            self.pending.insert(entry.path.clone());
        }
        self.discovered += 1;
        self.discoveries_staged = true;
        self.staged.insert(entry.path.clone(), entry);
    }

    pub fn resolve(&mut self, entry: Entry) {
        self.pending.remove(&entry.path);
        self.resolved.push(entry.clone());
        self.staged.insert(entry.path.clone(), entry);
    }

    /// Enumeration is over and no size is outstanding.
    pub fn is_settled(&self) -> bool {
        self.enumeration_finished && self.pending.is_empty()
    }

    pub fn has_staged(&self) -> bool {
        !self.staged.is_empty()
    }

    /// Discoveries are waiting to be shown.
    pub fn has_staged_discoveries(&self) -> bool {
        self.discoveries_staged
    }

    /// Hand over everything staged since the last call.
    pub fn take_staged(&mut self) -> StagedBatch {
        self.discoveries_staged = false;
        StagedBatch {
            entries: self.staged.drain().map(|(_, entry)| entry).collect(),
            resolved: std::mem::take(&mut self.resolved),
        }
    }
}
