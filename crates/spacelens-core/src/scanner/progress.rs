/// Messages exchanged with the control thread.
///
/// Workers report through [`WorkerMessage`]s, each tagged with the token of
/// the work that produced it. The presentation layer drives the coordinator
/// through [`Command`]s.
use crate::model::Entry;
use std::path::PathBuf;

/// Opaque tag identifying one scan invocation.
///
/// Minted by the coordinator for every `open`. Messages carrying any other
/// token than the current one are stale and dropped on arrival.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScanToken(pub u64);

/// Tag identifying one scheduled hierarchy rebuild.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RefreshTicket(pub u64);

/// Results sent from worker tasks to the control thread.
#[derive(Debug)]
pub enum WorkerMessage {
    /// A child of the scanned directory was enumerated.
    Discovered { token: ScanToken, entry: Entry },
    /// The aggregate size of a child directory is known.
    SizeResolved { token: ScanToken, entry: Entry },
    /// Enumeration of the scanned directory finished. Size resolutions may
    /// still be outstanding.
    EnumerationFinished { token: ScanToken, children: usize },
    /// Background recomputation of zero-sized directories after a cache hit.
    SizesCorrected {
        token: ScanToken,
        dir: PathBuf,
        updates: Vec<Entry>,
    },
    /// A hierarchy snapshot was built for `path`.
    HierarchyBuilt {
        ticket: RefreshTicket,
        path: PathBuf,
        root: Entry,
    },
}

impl WorkerMessage {
    /// Scan token carried by the message, if it belongs to a scan.
    pub fn token(&self) -> Option<ScanToken> {
        match self {
            Self::Discovered { token, .. }
            | Self::SizeResolved { token, .. }
            | Self::EnumerationFinished { token, .. }
            | Self::SizesCorrected { token, .. } => Some(*token),
            Self::HierarchyBuilt { .. } => None,
        }
    }
}

/// Commands sent from the presentation layer to the control thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Open a directory, recording it in history on success.
    Open(PathBuf),
    /// Return to the previous successfully displayed directory.
    GoBack,
    /// Choose a new root: clears history and opens it.
    ChooseRoot(PathBuf),
    /// Clear history and reopen the chosen root.
    ResetToRoot,
    /// Change how many entries the list projection carries.
    SetDisplayLimit(usize),
    /// Change the depth of the hierarchy projection.
    SetHierarchyDepth(usize),
    /// Stop the control thread.
    Shutdown,
}
