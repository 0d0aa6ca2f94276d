/// End-to-end tests for `ScanCoordinator`: the cache, history and
/// generation-token state machine.
///
/// Each test owns a coordinator and pumps its worker channel itself, the way
/// a frontend's control loop would, against a real temporary filesystem.
///
/// **Scope:**
///   - Progressive publication (provisional 0 → resolved size, batching)
///   - Cache coherence: resolved sizes equal the sum of cached children
///   - Cache hits, idempotent reopen, background zero-size correction
///   - Stale-token isolation between superseded scans
///   - Denied directories and automatic recovery through history
///   - Back navigation, root reset, display limit, hierarchy projection
use parking_lot::Mutex;
use spacelens_core::coordinator::cache::Listing;
use spacelens_core::scanner::progress::{RefreshTicket, WorkerMessage};
use spacelens_core::{
    CoreConfig, Entry, HierarchyProjection, ListProjection, Publisher, ScanCoordinator, ScanPhase,
};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tempfile::TempDir;

// ── Helpers ───────────────────────────────────────────────────────────────────

/// Publisher that keeps every projection it receives, in order.
#[derive(Clone, Default)]
struct Recorder {
    lists: Arc<Mutex<Vec<ListProjection>>>,
    hierarchies: Arc<Mutex<Vec<HierarchyProjection>>>,
}

impl Publisher for Recorder {
    fn publish_list(&mut self, projection: &ListProjection) {
        self.lists.lock().push(projection.clone());
    }

    fn publish_hierarchy(&mut self, projection: &HierarchyProjection) {
        self.hierarchies.lock().push(projection.clone());
    }
}

fn write_bytes(path: &Path, n: usize) {
    let mut f = fs::File::create(path).unwrap();
    f.write_all(&vec![0u8; n]).unwrap();
}

/// Build the reference tree and return `(guard, canonical root)`:
///
/// ```text
/// root/
///   D/
///     a     (100 bytes)
///     b     (200 bytes)
///     E/
///       c   (50 bytes)
///   top.bin (10 bytes)
/// ```
fn make_tree() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().canonicalize().unwrap();
    let d = root.join("D");
    fs::create_dir_all(d.join("E")).unwrap();
    write_bytes(&d.join("a"), 100);
    write_bytes(&d.join("b"), 200);
    write_bytes(&d.join("E").join("c"), 50);
    write_bytes(&root.join("top.bin"), 10);
    (tmp, root)
}

fn coordinator_with(recorder: Recorder) -> ScanCoordinator {
    let config = CoreConfig {
        worker_threads: Some(4),
        hierarchy_debounce_ms: 20,
        ..CoreConfig::default()
    };
    ScanCoordinator::new(config, recorder).unwrap()
}

fn coordinator() -> ScanCoordinator {
    coordinator_with(Recorder::default())
}

/// Pump messages until no scan and no hierarchy rebuild is outstanding, or
/// fail after 30 seconds.
fn pump_until_settled(coord: &mut ScanCoordinator) {
    let deadline = Instant::now() + Duration::from_secs(30);
    loop {
        coord.process_messages(Duration::from_millis(10));
        if coord.is_settled() {
            return;
        }
        assert!(
            Instant::now() < deadline,
            "coordinator did not settle within 30 seconds"
        );
    }
}

fn open_and_settle(coord: &mut ScanCoordinator, path: &Path) {
    coord.open(path);
    pump_until_settled(coord);
}

fn cached_entry<'a>(coord: &'a ScanCoordinator, dir: &Path, name: &str) -> &'a Entry {
    coord
        .cache()
        .get(dir)
        .and_then(|l| l.entries.iter().find(|e| e.name == name))
        .unwrap_or_else(|| panic!("{name} not cached under {}", dir.display()))
}

// ── Progressive publication ───────────────────────────────────────────────────

/// D is first published with a provisional size of 0 while loading, then
/// with its resolved size of 350 bytes.
#[test]
fn directory_published_provisional_then_resolved() {
    let (_tmp, root) = make_tree();
    let recorder = Recorder::default();
    let mut coord = coordinator_with(recorder.clone());
    open_and_settle(&mut coord, &root);

    let lists = recorder.lists.lock();
    let d_states: Vec<(u64, bool)> = lists
        .iter()
        .filter_map(|p| p.entries.iter().find(|e| e.name == "D"))
        .map(|e| (e.size, e.loading))
        .collect();

    assert_eq!(d_states.first(), Some(&(0, true)));
    assert_eq!(d_states.last(), Some(&(350, false)));

    let last = lists.last().unwrap();
    assert!(!last.is_scanning);
    assert_eq!(last.current_path.as_deref(), Some(root.as_path()));
    assert_eq!(last.total_size, 360);
    assert_eq!(last.entries[0].name, "D");
    assert_eq!(coord.phase(), ScanPhase::Resolved);
    assert_eq!(coord.history().paths(), &[root.clone()]);
}

/// The first projection of a fresh scan is empty and flagged as scanning.
#[test]
fn fresh_scan_starts_empty_and_scanning() {
    let (_tmp, root) = make_tree();
    let recorder = Recorder::default();
    let mut coord = coordinator_with(recorder.clone());
    coord.open(&root);

    let first = recorder.lists.lock()[0].clone();
    assert!(first.is_scanning);
    assert!(first.entries.is_empty());
    assert_eq!(first.breadcrumb.last(), Some(&root));
    pump_until_settled(&mut coord);
}

/// A flat directory of many files lists in time linear in its size: each
/// drained batch of discoveries is merged into the list and published once.
#[test]
fn wide_directory_lists_in_batches() {
    const FILES: usize = 20_000;
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().canonicalize().unwrap();
    for i in 0..FILES {
        write_bytes(&root.join(format!("f{i:05}")), i % 97 + 1);
    }

    let recorder = Recorder::default();
    let mut coord = coordinator_with(recorder.clone());
    let started = Instant::now();
    coord.open(&root);
    while coord.is_scanning() {
        assert!(
            started.elapsed() < Duration::from_secs(30),
            "listing {FILES} files did not settle within 30 seconds"
        );
        coord.process_messages(Duration::from_millis(10));
    }

    let projection = coord.list_projection();
    assert_eq!(projection.total_entries, FILES);
    assert_eq!(projection.entries[0].size, 97);
    assert!(projection.entries.windows(2).all(|w| w[0].size >= w[1].size));
    let listing = coord.cache().get(&root).unwrap();
    assert!(listing.is_complete());
    assert_eq!(listing.entries.len(), FILES);
    assert!(recorder.lists.lock().len() < FILES / 2, "publishes were not batched");
    pump_until_settled(&mut coord);
}

// ── Cache coherence ──────────────────────────────────────────────────────────

/// A resolved directory's size equals the sum of its cached children.
#[test]
fn resolved_size_equals_sum_of_cached_children() {
    let (_tmp, root) = make_tree();
    let d = root.join("D");
    let e = d.join("E");
    let mut coord = coordinator();

    open_and_settle(&mut coord, &root);
    open_and_settle(&mut coord, &d);
    open_and_settle(&mut coord, &e);

    let d_listing = coord.cache().get(&d).unwrap();
    assert_eq!(cached_entry(&coord, &root, "D").size, d_listing.total_size());
    assert_eq!(d_listing.total_size(), 350);

    let e_listing = coord.cache().get(&e).unwrap();
    assert_eq!(cached_entry(&coord, &d, "E").size, e_listing.total_size());
    assert_eq!(e_listing.total_size(), 50);
}

/// Reopening an unchanged directory takes the cache-hit path: no new scan,
/// identical cache entry.
#[test]
fn reopen_is_cache_hit_and_idempotent() {
    let (_tmp, root) = make_tree();
    let d = root.join("D");
    let mut coord = coordinator();

    open_and_settle(&mut coord, &d);
    let before: Listing = coord.cache().get(&d).unwrap().clone();
    assert!(before.is_complete());
    assert_eq!(coord.stats().scans_started, 1);

    open_and_settle(&mut coord, &d);
    assert_eq!(coord.stats().scans_started, 1, "reopen must not rescan");
    assert_eq!(coord.stats().cache_hits, 1);
    assert_eq!(coord.cache().get(&d).unwrap(), &before);
    assert_eq!(coord.history().len(), 1, "same path is not pushed twice");
}

/// A cached directory left at 0 bytes is recomputed in the background on
/// the next cache hit.
#[test]
fn cache_hit_corrects_zero_sized_directories() {
    let (_tmp, root) = make_tree();
    let d = root.join("D");
    let grows = d.join("grows");
    fs::create_dir(&grows).unwrap();
    write_bytes(&grows.join("z"), 0);

    let mut coord = coordinator();
    open_and_settle(&mut coord, &d);
    let stale = cached_entry(&coord, &d, "grows");
    assert_eq!(stale.size, 0);
    assert!(!stale.access_denied, "a readable empty file counts as readable");

    write_bytes(&grows.join("z"), 70);
    coord.open(&d);
    assert_eq!(coord.stats().cache_hits, 1);

    let deadline = Instant::now() + Duration::from_secs(30);
    while cached_entry(&coord, &d, "grows").size == 0 {
        assert!(Instant::now() < deadline, "correction never arrived");
        coord.process_messages(Duration::from_millis(10));
    }
    assert_eq!(cached_entry(&coord, &d, "grows").size, 70);
    assert_eq!(coord.list_projection().entries[0].name, "b");
    assert_eq!(coord.list_projection().total_size, 420);
}

// ── Stale tokens ─────────────────────────────────────────────────────────────

/// Opening B while A is in flight: A's late results never reach the cache.
#[test]
fn superseded_scan_never_touches_cache() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().canonicalize().unwrap();
    let a = root.join("A");
    let b = root.join("B");
    fs::create_dir_all(a.join("sub")).unwrap();
    fs::create_dir_all(&b).unwrap();
    write_bytes(&a.join("x"), 10);
    write_bytes(&a.join("sub").join("y"), 5);
    write_bytes(&b.join("z"), 7);

    let mut coord = coordinator();
    coord.open(&a);
    coord.open(&b);
    pump_until_settled(&mut coord);

    // A produces 2 discoveries, 1 resolution and 1 completion.
    let deadline = Instant::now() + Duration::from_secs(30);
    while coord.stats().stale_messages < 4 {
        assert!(Instant::now() < deadline, "stale messages never arrived");
        coord.process_messages(Duration::from_millis(10));
    }

    let a_listing = coord.cache().get(&a).unwrap();
    assert_eq!(a_listing, &Listing::default(), "A keeps its empty placeholder");
    assert_eq!(coord.cache().get(&b).unwrap().total_size(), 7);
    assert_eq!(coord.current_path(), Some(b.as_path()));
    assert_eq!(coord.history().paths(), &[b.clone()]);
    assert_eq!(coord.stats().scans_started, 2);
}

/// A superseded placeholder is not a cache hit: A is rescanned on revisit.
#[test]
fn interrupted_directory_is_rescanned() {
    let (_tmp, root) = make_tree();
    let d = root.join("D");
    let mut coord = coordinator();
    coord.open(&d);
    open_and_settle(&mut coord, &root);

    open_and_settle(&mut coord, &d);
    assert_eq!(coord.stats().scans_started, 3);
    assert_eq!(coord.cache().get(&d).unwrap().total_size(), 350);
}

// ── Denial and recovery ──────────────────────────────────────────────────────

/// Nothing readable with no history: Denied, then the empty state.
///
/// Known limitation: an empty but readable directory is indistinguishable
/// from a denied one, so it is reported as denied too.
#[test]
fn denied_without_history_resets_to_empty() {
    let tmp = TempDir::new().unwrap();
    let empty = tmp.path().canonicalize().unwrap().join("empty");
    fs::create_dir(&empty).unwrap();

    let recorder = Recorder::default();
    let mut coord = coordinator_with(recorder.clone());
    open_and_settle(&mut coord, &empty);

    assert_eq!(coord.phase(), ScanPhase::Idle);
    assert!(coord.current_path().is_none());
    assert!(coord.history().is_empty());
    assert!(coord.cache().get(&empty).is_none());
    let message = coord.error_message().expect("denial must be surfaced");
    assert!(message.starts_with("Access denied"));

    let lists = recorder.lists.lock();
    assert!(lists
        .iter()
        .any(|p| p.error_message.is_some() && p.current_path.as_deref() == Some(empty.as_path())));
    assert!(lists.last().unwrap().current_path.is_none());
}

/// Nothing readable with history: recover to the last valid directory
/// without pushing it again.
#[test]
fn denied_recovers_to_previous_directory() {
    let (_tmp, root) = make_tree();
    let d = root.join("D");
    let missing = root.join("does-not-exist");
    let mut coord = coordinator();

    open_and_settle(&mut coord, &d);
    open_and_settle(&mut coord, &missing);

    assert_eq!(coord.current_path(), Some(d.as_path()));
    assert_eq!(coord.phase(), ScanPhase::Resolved);
    assert!(coord.error_message().is_some());
    assert_eq!(coord.history().paths(), &[d.clone()]);
    assert_eq!(coord.stats().cache_hits, 1, "recovery uses the cache");
}

/// A user open clears the error left behind by a recovery.
#[test]
fn next_open_clears_recovery_error() {
    let (_tmp, root) = make_tree();
    let d = root.join("D");
    let mut coord = coordinator();

    open_and_settle(&mut coord, &d);
    open_and_settle(&mut coord, &root.join("missing"));
    assert!(coord.error_message().is_some());

    open_and_settle(&mut coord, &d.join("E"));
    assert!(coord.error_message().is_none());
    assert_eq!(coord.history().len(), 2);
}

#[cfg(unix)]
#[test]
fn unreadable_subdirectory_is_flagged() {
    use std::os::unix::fs::PermissionsExt;

    let (_tmp, root) = make_tree();
    let locked = root.join("locked");
    fs::create_dir(&locked).unwrap();
    write_bytes(&locked.join("secret"), 99);
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();
    if fs::read_dir(&locked).is_ok() {
        // Running with privileges that bypass permission bits.
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
        return;
    }

    let mut coord = coordinator();
    open_and_settle(&mut coord, &root);
    let entry = cached_entry(&coord, &root, "locked").clone();
    assert!(entry.access_denied);
    assert_eq!(entry.size, 0);

    open_and_settle(&mut coord, &locked);
    assert_eq!(coord.current_path(), Some(root.as_path()));
    assert!(coord.error_message().is_some());

    fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
}

// ── Navigation ───────────────────────────────────────────────────────────────

#[test]
fn go_back_walks_history_then_empties() {
    let (_tmp, root) = make_tree();
    let d = root.join("D");
    let mut coord = coordinator();

    open_and_settle(&mut coord, &root);
    open_and_settle(&mut coord, &d);
    assert_eq!(coord.history().len(), 2);

    coord.go_back();
    pump_until_settled(&mut coord);
    assert_eq!(coord.current_path(), Some(root.as_path()));
    assert_eq!(coord.history().paths(), &[root.clone()]);

    coord.go_back();
    assert!(coord.current_path().is_none());
    assert_eq!(coord.phase(), ScanPhase::Idle);
    assert!(coord.history().is_empty());
}

#[test]
fn choose_root_and_reset_to_root() {
    let (_tmp, root) = make_tree();
    let d = root.join("D");
    let mut coord = coordinator();

    coord.choose_root(&root);
    pump_until_settled(&mut coord);
    open_and_settle(&mut coord, &d);
    assert_eq!(coord.history().len(), 2);

    coord.reset_to_root();
    pump_until_settled(&mut coord);
    assert_eq!(coord.root_path(), Some(root.as_path()));
    assert_eq!(coord.current_path(), Some(root.as_path()));
    assert_eq!(coord.history().paths(), &[root.clone()]);
}

#[test]
fn display_limit_bounds_projection() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().canonicalize().unwrap();
    for i in 0..5 {
        write_bytes(&root.join(format!("f{i}")), (i + 1) * 10);
    }

    let mut coord = coordinator();
    open_and_settle(&mut coord, &root);
    coord.set_display_limit(2);

    let projection = coord.list_projection();
    let sizes: Vec<u64> = projection.entries.iter().map(|e| e.size).collect();
    assert_eq!(sizes, vec![50, 40]);
    assert_eq!(projection.total_entries, 5);
    assert_eq!(projection.total_size, 150);
}

// ── Hierarchy ────────────────────────────────────────────────────────────────

/// At depth 1, E reports its full 50 bytes without being descended.
#[test]
fn hierarchy_projection_respects_depth() {
    let (_tmp, root) = make_tree();
    let d = root.join("D");
    let recorder = Recorder::default();
    let mut coord = coordinator_with(recorder.clone());

    coord.set_hierarchy_depth(1);
    open_and_settle(&mut coord, &d);

    let tree = coord.hierarchy_root().expect("hierarchy must be built");
    assert_eq!(tree.path, d);
    assert_eq!(tree.size, 350);
    let e = tree.children.iter().find(|c| c.name == "E").unwrap();
    assert_eq!(e.size, 50);
    assert!(e.children.is_empty());

    let last = recorder.hierarchies.lock().last().cloned().unwrap();
    assert!(!last.is_refreshing);
    assert_eq!(last.root.as_ref(), Some(tree));
}

/// A build that finishes after the user moved elsewhere is discarded.
#[test]
fn hierarchy_for_previous_directory_is_discarded() {
    let (_tmp, root) = make_tree();
    let d = root.join("D");
    let mut coord = coordinator();
    open_and_settle(&mut coord, &d);
    let shown = coord.hierarchy_root().cloned();

    coord.handle_message(WorkerMessage::HierarchyBuilt {
        ticket: RefreshTicket(1_000),
        path: root.clone(),
        root: Entry::new_dir(root.clone(), None, false),
    });
    assert_eq!(coord.hierarchy_root().cloned(), shown);
}

/// Debounce: many schedule requests collapse into few builds.
#[test]
fn hierarchy_refresh_is_debounced() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().canonicalize().unwrap();
    for i in 0..50 {
        write_bytes(&root.join(format!("f{i:02}")), 1);
    }

    let mut coord = coordinator();
    open_and_settle(&mut coord, &root);
    // 50 discoveries each rescheduled the refresh.
    assert!(coord.stats().hierarchy_builds < 50);
    assert!(coord.stats().hierarchy_builds >= 1);
}
