/// Scan coordinator: single owner of the listing cache, the navigation
/// history and everything published to the presentation layer.
///
/// # State machine
///
/// Every opened directory goes `Idle → Scanning → Resolved | Denied`. A
/// complete cached listing short-circuits straight to `Resolved`.
///
/// # Threading
///
/// The coordinator lives on one control thread and is the only writer of its
/// state, so nothing here is locked. Filesystem work is spawned on the worker
/// pool; workers answer with [`WorkerMessage`]s tagged with the
/// [`ScanToken`] that was current when the work was issued. Opening a new
/// directory mints a new token, and any message carrying an older one is
/// dropped on arrival. Superseded workers are never interrupted: their
/// results simply go nowhere.
pub mod cache;
pub mod history;
pub mod publish;
pub mod service;
pub mod session;

use crate::config::CoreConfig;
use crate::error::{Result, ScanFault};
use crate::model::{merge_by_size_desc, Entry};
use crate::scanner::aggregate::compute_folder_size;
use crate::scanner::flat::FlatScanner;
use crate::scanner::hierarchy::build_hierarchy;
use crate::scanner::progress::{Command, RefreshTicket, ScanToken, WorkerMessage};
use crate::scanner::{build_worker_pool, WorkerPool, WORKER_CHANNEL_CAPACITY};
use cache::ListingCache;
use crossbeam_channel::{Receiver, Sender};
use history::NavigationHistory;
use publish::{HierarchyProjection, ListProjection, Publisher};
use session::{OpenMode, ScanSession};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, trace, warn};

/// Maximum number of worker messages handled, and published as one batch,
/// by a single [`ScanCoordinator::process_messages`] call.
pub const MAX_MESSAGES_PER_PASS: usize = 1_024;

/// Where the currently requested directory stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanPhase {
    /// Nothing is displayed.
    Idle,
    /// Enumeration or at least one subdirectory size is outstanding.
    Scanning,
    /// Every child of the current directory has its final size.
    Resolved,
    /// The current directory could not be listed.
    Denied,
}

/// Counters exposed for diagnostics and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CoordinatorStats {
    /// Flat scans launched.
    pub scans_started: u64,
    /// Opens served from the cache.
    pub cache_hits: u64,
    /// Worker messages dropped because their token was superseded.
    pub stale_messages: u64,
    /// Hierarchy builds launched after the debounce expired.
    pub hierarchy_builds: u64,
}

struct PendingRefresh {
    due: Instant,
    path: PathBuf,
    depth: usize,
}

/// Debounced hierarchy rebuilds: at most one pending deadline, any number of
/// builds in flight, and only the newest applicable result is kept.
#[derive(Default)]
struct HierarchyState {
    pending: Option<PendingRefresh>,
    next_ticket: u64,
    latest_issued: Option<RefreshTicket>,
    applied: Option<RefreshTicket>,
    root: Option<Entry>,
    published_refreshing: bool,
}

impl HierarchyState {
    fn is_refreshing(&self) -> bool {
        self.pending.is_some() || self.latest_issued > self.applied
    }
}

pub struct ScanCoordinator {
    config: CoreConfig,
    pool: WorkerPool,
    scanner: FlatScanner,
    worker_tx: Sender<WorkerMessage>,
    worker_rx: Receiver<WorkerMessage>,
    publisher: Box<dyn Publisher>,

    cache: ListingCache,
    history: NavigationHistory,
    root: Option<PathBuf>,
    current: Option<PathBuf>,
    phase: ScanPhase,
    error_message: Option<String>,
    display_limit: usize,
    hierarchy_depth: usize,

    next_token: u64,
    active_token: Option<ScanToken>,
    session: Option<ScanSession>,
    /// All known children of the current directory, largest first.
    visible: Vec<Entry>,

    hierarchy: HierarchyState,
    stats: CoordinatorStats,
}

impl ScanCoordinator {
    /// Create a coordinator with its own worker pool.
    pub fn new(config: CoreConfig, publisher: impl Publisher + 'static) -> Result<Self> {
        let pool = build_worker_pool(config.worker_count())?;
        let scanner = FlatScanner::new(Arc::clone(&pool), config.size_metric);
        let (worker_tx, worker_rx) = crossbeam_channel::bounded(WORKER_CHANNEL_CAPACITY);
        info!(
            "Coordinator ready: {} workers, display limit {}, hierarchy depth {}",
            pool.current_num_threads(),
            config.display_limit,
            config.hierarchy_depth
        );

        Ok(Self {
            display_limit: config.display_limit,
            hierarchy_depth: config.hierarchy_depth,
            config,
            pool,
            scanner,
            worker_tx,
            worker_rx,
            publisher: Box::new(publisher),
            cache: ListingCache::new(),
            history: NavigationHistory::new(),
            root: None,
            current: None,
            phase: ScanPhase::Idle,
            error_message: None,
            next_token: 0,
            active_token: None,
            session: None,
            visible: Vec::new(),
            hierarchy: HierarchyState::default(),
            stats: CoordinatorStats::default(),
        })
    }

    // ── Entry points ─────────────────────────────────────────────

    /// Open a directory, recording it in history once it is displayed.
    pub fn open(&mut self, path: &Path) {
        self.open_with(path, OpenMode::USER);
    }

    /// Return to the previous successfully displayed directory.
    pub fn go_back(&mut self) {
        if let Some(current) = self.current.clone() {
            self.history.pop_if_top(&current);
        }
        match self.history.top().map(Path::to_path_buf) {
            Some(previous) => self.open_with(&previous, OpenMode::REVISIT),
            None => {
                self.error_message = None;
                self.reset_to_empty();
            }
        }
    }

    /// Make `path` the new root: history starts over from it.
    pub fn choose_root(&mut self, path: &Path) {
        let root = canonicalize(path);
        self.root = Some(root.clone());
        self.history.clear();
        self.open_with(&root, OpenMode::USER);
    }

    /// Clear history and reopen the chosen root, or go to the empty state
    /// when no root was chosen.
    pub fn reset_to_root(&mut self) {
        self.history.clear();
        match self.root.clone() {
            Some(root) => self.open_with(&root, OpenMode::USER),
            None => {
                self.error_message = None;
                self.reset_to_empty();
            }
        }
    }

    /// Change how many entries the list projection carries.
    /// Reset to the configured default by the next `open`.
    pub fn set_display_limit(&mut self, limit: usize) {
        self.display_limit = limit;
        self.publish_list();
    }

    /// Change the depth of the hierarchy projection and schedule a rebuild.
    pub fn set_hierarchy_depth(&mut self, depth: usize) {
        self.hierarchy_depth = depth;
        self.schedule_hierarchy_refresh();
    }

    /// Apply a command. Returns `false` for [`Command::Shutdown`].
    pub fn handle_command(&mut self, command: Command) -> bool {
        debug!("Command: {command:?}");
        match command {
            Command::Open(path) => self.open(&path),
            Command::GoBack => self.go_back(),
            Command::ChooseRoot(path) => self.choose_root(&path),
            Command::ResetToRoot => self.reset_to_root(),
            Command::SetDisplayLimit(limit) => self.set_display_limit(limit),
            Command::SetHierarchyDepth(depth) => self.set_hierarchy_depth(depth),
            Command::Shutdown => return false,
        }
        true
    }

    // ── Message processing ───────────────────────────────────────

    /// Wait up to `wait` for worker messages, drain what is queued, publish
    /// the result once, then start a hierarchy rebuild if its debounce has
    /// expired.
    ///
    /// Returns the number of messages handled. Capped per call so a large
    /// backlog cannot starve the caller.
    pub fn process_messages(&mut self, wait: Duration) -> usize {
        let mut handled = 0usize;
        if let Ok(msg) = self.worker_rx.recv_timeout(wait) {
            self.handle_message(msg);
            handled = 1 + self.drain_queued(MAX_MESSAGES_PER_PASS - 1);
        }
        self.flush();
        self.fire_due_refresh(Instant::now());
        handled
    }

    /// Handle up to `max` messages that are already queued, without waiting.
    /// Nothing is published; call [`flush`](Self::flush) afterwards.
    pub fn drain_queued(&mut self, max: usize) -> usize {
        let mut handled = 0usize;
        while handled < max {
            match self.worker_rx.try_recv() {
                Ok(msg) => {
                    self.handle_message(msg);
                    handled += 1;
                }
                Err(_) => break,
            }
        }
        handled
    }

    /// Publish entries staged by handled messages: merge them into the list,
    /// publish it once and re-arm the hierarchy debounce.
    pub fn flush(&mut self) {
        if self.merge_staged() {
            self.publish_list();
            self.schedule_hierarchy_refresh();
        }
    }

    /// Apply one worker message. Messages of superseded scans are dropped.
    ///
    /// Discoveries and resolutions are staged until the next
    /// [`flush`](Self::flush); everything else publishes immediately.
    pub fn handle_message(&mut self, msg: WorkerMessage) {
        if let Some(token) = msg.token() {
            if Some(token) != self.active_token {
                self.stats.stale_messages += 1;
                trace!("Dropping stale message from scan {}", token.0);
                return;
            }
        }

        match msg {
            WorkerMessage::Discovered { entry, .. } => self.on_discovered(entry),
            WorkerMessage::SizeResolved { entry, .. } => self.on_size_resolved(entry),
            WorkerMessage::EnumerationFinished { children, .. } => {
                self.on_enumeration_finished(children)
            }
            WorkerMessage::SizesCorrected { dir, updates, .. } => {
                self.on_sizes_corrected(&dir, &updates)
            }
            WorkerMessage::HierarchyBuilt { ticket, path, root } => {
                self.on_hierarchy_built(ticket, path, root)
            }
        }
    }

    /// Deadline of the pending hierarchy rebuild, if one is scheduled.
    pub fn debounce_deadline(&self) -> Option<Instant> {
        self.hierarchy.pending.as_ref().map(|p| p.due)
    }

    /// Launch the pending hierarchy rebuild if its deadline has passed.
    /// Returns `true` if a build was started.
    pub fn fire_due_refresh(&mut self, now: Instant) -> bool {
        if !matches!(&self.hierarchy.pending, Some(p) if p.due <= now) {
            return false;
        }
        let Some(pending) = self.hierarchy.pending.take() else {
            return false;
        };

        let ticket = RefreshTicket(self.hierarchy.next_ticket);
        self.hierarchy.next_ticket += 1;
        self.hierarchy.latest_issued = Some(ticket);
        self.stats.hierarchy_builds += 1;

        debug!(
            "Building hierarchy of {} to depth {}",
            pending.path.display(),
            pending.depth
        );
        let tx = self.worker_tx.clone();
        let metric = self.config.size_metric;
        self.pool.spawn(move || {
            let root = build_hierarchy(&pending.path, pending.depth, metric);
            let _ = tx.send(WorkerMessage::HierarchyBuilt {
                ticket,
                path: pending.path,
                root,
            });
        });
        true
    }

    // ── Accessors ────────────────────────────────────────────────

    /// Receiver side of the worker channel, for `select!` loops.
    pub fn worker_receiver(&self) -> &Receiver<WorkerMessage> {
        &self.worker_rx
    }

    pub fn current_path(&self) -> Option<&Path> {
        self.current.as_deref()
    }

    pub fn root_path(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    pub fn phase(&self) -> ScanPhase {
        self.phase
    }

    pub fn is_scanning(&self) -> bool {
        self.phase == ScanPhase::Scanning
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    pub fn cache(&self) -> &ListingCache {
        &self.cache
    }

    pub fn history(&self) -> &NavigationHistory {
        &self.history
    }

    pub fn stats(&self) -> CoordinatorStats {
        self.stats
    }

    pub fn display_limit(&self) -> usize {
        self.display_limit
    }

    pub fn hierarchy_depth(&self) -> usize {
        self.hierarchy_depth
    }

    pub fn hierarchy_root(&self) -> Option<&Entry> {
        self.hierarchy.root.as_ref()
    }

    pub fn is_hierarchy_refreshing(&self) -> bool {
        self.hierarchy.is_refreshing()
    }

    /// No scan and no hierarchy rebuild is outstanding.
    pub fn is_settled(&self) -> bool {
        !self.is_scanning() && !self.is_hierarchy_refreshing()
    }

    /// The list projection as it would be published now.
    pub fn list_projection(&self) -> ListProjection {
        let total_size = self.visible.iter().map(|e| e.size).sum();
        ListProjection {
            current_path: self.current.clone(),
            entries: self.visible.iter().take(self.display_limit).cloned().collect(),
            is_scanning: self.is_scanning(),
            error_message: self.error_message.clone(),
            breadcrumb: self.current.as_deref().map(breadcrumb).unwrap_or_default(),
            total_size,
            total_entries: self.visible.len(),
            all_denied: !self.visible.is_empty() && self.visible.iter().all(|e| e.access_denied),
        }
    }

    // ── Internals ────────────────────────────────────────────────

    fn mint_token(&mut self) -> ScanToken {
        self.next_token += 1;
        let token = ScanToken(self.next_token);
        self.active_token = Some(token);
        token
    }

    fn open_with(&mut self, path: &Path, mode: OpenMode) {
        let target = canonicalize(path);
        let token = self.mint_token();
        self.session = None;
        self.current = Some(target.clone());
        self.display_limit = self.config.display_limit;
        if !mode.recovering {
            self.error_message = None;
        }

        if let Some(entries) = self.cache.hit(&target) {
            debug!("Cache hit for {}", target.display());
            self.visible = entries.to_vec();
            self.phase = ScanPhase::Resolved;
            self.stats.cache_hits += 1;
            if mode.record_history {
                self.history.push_if_new(&target);
            }
            self.publish_list();
            self.spawn_size_correction(token, target);
            self.schedule_hierarchy_refresh();
            return;
        }

        info!("Scanning {}", target.display());
        self.cache.reset_placeholder(&target);
        self.visible.clear();
        self.phase = ScanPhase::Scanning;
        self.stats.scans_started += 1;
        self.session = Some(ScanSession::new(token, target.clone(), mode));
        self.publish_list();
        self.spawn_scan(token, target);
        self.schedule_hierarchy_refresh();
    }

    fn spawn_scan(&self, token: ScanToken, dir: PathBuf) {
        let scanner = self.scanner.clone();
        let tx = self.worker_tx.clone();
        self.pool.spawn(move || {
            let resolve_tx = tx.clone();
            let children = scanner.scan_children(
                &dir,
                |entry| {
                    let _ = tx.send(WorkerMessage::Discovered { token, entry });
                },
                move |entry| {
                    let _ = resolve_tx.send(WorkerMessage::SizeResolved { token, entry });
                },
            );
            let _ = tx.send(WorkerMessage::EnumerationFinished { token, children });
        });
    }

    /// Recompute directories still shown with size 0 after a cache hit.
    ///
    /// An earlier scan may have committed a directory before its aggregate
    /// size landed; this pass catches those up in the background.
    fn spawn_size_correction(&self, token: ScanToken, dir: PathBuf) {
        let stale: Vec<Entry> = self
            .visible
            .iter()
            .filter(|e| e.is_dir && e.size == 0 && !e.access_denied)
            .cloned()
            .collect();
        if stale.is_empty() {
            return;
        }

        debug!(
            "Rechecking {} zero-sized directories in {}",
            stale.len(),
            dir.display()
        );
        let tx = self.worker_tx.clone();
        let metric = self.config.size_metric;
        self.pool.spawn(move || {
            let updates = stale
                .into_iter()
                .filter_map(|entry| {
                    let size = compute_folder_size(&entry.path, metric);
                    (size > 0).then(|| Entry { size, ..entry })
                })
                .collect();
            let _ = tx.send(WorkerMessage::SizesCorrected {
                token,
                dir,
                updates,
            });
        });
    }

    fn on_discovered(&mut self, entry: Entry) {
        if let Some(session) = self.session.as_mut() {
            session.discover(entry);
        }
    }

    fn on_size_resolved(&mut self, entry: Entry) {
        // Every discovery is published before a resolution can overtake it.
        if self.session.as_ref().is_some_and(|s| s.has_staged_discoveries()) {
            self.flush();
        }
        let Some(session) = self.session.as_mut() else {
            return;
        };
        session.resolve(entry);
        if session.is_settled() {
            debug!("Resolved {}", session.path.display());
            self.phase = ScanPhase::Resolved;
        }
    }

    /// Move staged entries into the visible list and the cache.
    /// Returns `false` if nothing was staged.
    fn merge_staged(&mut self) -> bool {
        let Some(session) = self.session.as_mut() else {
            return false;
        };
        if !session.has_staged() {
            return false;
        }
        let batch = session.take_staged();
        trace!("Merging {} entries into {}", batch.entries.len(), session.path.display());
        self.cache.patch_many(&session.path, batch.resolved);
        merge_by_size_desc(&mut self.visible, batch.entries);
        true
    }

    fn on_enumeration_finished(&mut self, children: usize) {
        let Some(mut session) = self.session.take() else {
            return;
        };
        session.enumeration_finished = true;

        if session.discovered == 0 {
            self.on_denied(session);
            return;
        }

        debug!(
            "Enumeration of {} finished: {} children, {} sizes pending",
            session.path.display(),
            children,
            session.pending.len()
        );
        merge_by_size_desc(&mut self.visible, session.take_staged().entries);
        self.cache.commit(&session.path, self.visible.clone());
        if session.mode.record_history {
            self.history.push_if_new(&session.path);
        }
        self.phase = if session.is_settled() {
            ScanPhase::Resolved
        } else {
            ScanPhase::Scanning
        };
        self.session = Some(session);
        self.publish_list();
        self.schedule_hierarchy_refresh();
    }

    /// Nothing could be listed: report it and fall back to the last valid
    /// directory, or to the empty state.
    fn on_denied(&mut self, session: ScanSession) {
        let fault = ScanFault::EnumerationDenied {
            path: session.path.clone(),
        };
        warn!("{fault}");
        self.error_message = Some(fault.to_string());
        self.phase = ScanPhase::Denied;
        self.visible.clear();
        self.cache.remove(&session.path);
        self.publish_list();

        // A denied directory leaves the top of the history, so recovery
        // never reopens it and always walks down the stack.
        self.history.pop_if_top(&session.path);

        match self.history.top().map(Path::to_path_buf) {
            Some(previous) => {
                info!("Recovering to {}", previous.display());
                self.open_with(&previous, OpenMode::RECOVERY);
            }
            None => self.reset_to_empty(),
        }
    }

    fn on_sizes_corrected(&mut self, dir: &Path, updates: &[Entry]) {
        if !self.cache.apply_corrections(dir, updates) {
            return;
        }
        debug!("Corrected {} sizes in {}", updates.len(), dir.display());
        if self.current.as_deref() == Some(dir) {
            if let Some(listing) = self.cache.get(dir) {
                self.visible = listing.entries.clone();
            }
            self.publish_list();
            self.schedule_hierarchy_refresh();
        }
    }

    fn on_hierarchy_built(&mut self, ticket: RefreshTicket, path: PathBuf, root: Entry) {
        if self.current.as_deref() != Some(path.as_path()) {
            debug!("Discarding hierarchy of {}: directory changed", path.display());
            return;
        }
        if self.hierarchy.applied.is_some_and(|applied| ticket <= applied) {
            trace!("Discarding outdated hierarchy build {}", ticket.0);
            return;
        }
        self.hierarchy.applied = Some(ticket);
        self.hierarchy.root = Some(root);
        self.publish_hierarchy();
    }

    /// (Re)arm the debounce for a hierarchy rebuild of the current path.
    fn schedule_hierarchy_refresh(&mut self) {
        let Some(path) = self.current.clone() else {
            return;
        };
        self.hierarchy.pending = Some(PendingRefresh {
            due: Instant::now() + self.config.hierarchy_debounce(),
            path,
            depth: self.hierarchy_depth,
        });
        if !self.hierarchy.published_refreshing {
            self.publish_hierarchy();
        }
    }

    fn reset_to_empty(&mut self) {
        debug!("Resetting to the empty state");
        self.active_token = None;
        self.session = None;
        self.current = None;
        self.visible.clear();
        self.phase = ScanPhase::Idle;
        self.hierarchy.pending = None;
        self.hierarchy.applied = self.hierarchy.latest_issued;
        self.hierarchy.root = None;
        self.publish_list();
        self.publish_hierarchy();
    }

    fn publish_list(&mut self) {
        let projection = self.list_projection();
        self.publisher.publish_list(&projection);
    }

    fn publish_hierarchy(&mut self) {
        let projection = HierarchyProjection {
            root: self.hierarchy.root.clone(),
            is_refreshing: self.hierarchy.is_refreshing(),
        };
        self.hierarchy.published_refreshing = projection.is_refreshing;
        self.publisher.publish_hierarchy(&projection);
    }
}

/// Resolve symlinks and relative components. Falls back to the path as
/// given, which then simply fails to enumerate.
fn canonicalize(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|err| {
        debug!("Could not canonicalize {}: {err}", path.display());
        path.to_path_buf()
    })
}

/// Ancestor chain from the filesystem root down to `path`.
pub fn breadcrumb(path: &Path) -> Vec<PathBuf> {
    let mut chain: Vec<PathBuf> = path.ancestors().map(Path::to_path_buf).collect();
    chain.reverse();
    chain
}
