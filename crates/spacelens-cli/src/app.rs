/// One-shot driver: run the engine on a control thread, wait until the view
/// of the requested directory has settled, then print it.
///
/// The view is read from the [`SharedView`] the engine publishes into, the
/// same way an interactive frontend would poll it once per frame.
use crate::args::Cli;
use crate::{export, report};
use anyhow::{bail, Context};
use crossbeam_channel::{after, select, tick};
use spacelens_core::{spawn_coordinator, CoreConfig, SharedView, SnapshotPublisher, ViewSnapshot};
use std::io::{self, Write};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

/// How often the shared view is sampled while waiting.
const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Consecutive unchanged samples required before a settled view is trusted.
/// The list and the hierarchy are published separately, so one sample can
/// catch the two halfway through an update.
const QUIET_SAMPLES: u32 = 2;

/// Run the command line end to end.
pub fn run(cli: &Cli) -> anyhow::Result<()> {
    let config = cli.core_config()?;
    let view = scan(&cli.path, config, cli.timeout())?;

    if let Some(path) = &cli.csv {
        export::write_csv_file(path, &view.list)?;
    }

    let stdout = io::stdout();
    let mut out = stdout.lock();
    if cli.json {
        export::write_json(&mut out, &view)?;
        writeln!(out)?;
        return Ok(());
    }

    report::write_table(&mut out, &view.list)?;
    if cli.tree {
        writeln!(out)?;
        match &view.hierarchy.root {
            Some(root) => report::write_tree(&mut out, root)?,
            None => writeln!(out, "No hierarchy available.")?,
        }
    }
    Ok(())
}

/// Open `path` as the root and return the settled view.
///
/// Fails if the directory cannot be listed or the view does not settle
/// within `timeout`.
pub fn scan(path: &Path, config: CoreConfig, timeout: Duration) -> anyhow::Result<ViewSnapshot> {
    let publisher = SnapshotPublisher::new();
    let view = publisher.view();
    let handle = spawn_coordinator(config, publisher).context("failed to start the engine")?;

    info!("Exploring {}", path.display());
    handle.choose_root(path);
    let settled = wait_until_settled(&view, timeout);
    handle.shutdown();
    let snapshot = settled?;

    if snapshot.list.current_path.is_none() {
        match &snapshot.list.error_message {
            Some(message) => bail!("{message}"),
            None => bail!("nothing to show for {}", path.display()),
        }
    }
    Ok(snapshot)
}

/// A view is settled once the list has been published at least once, no
/// scan is outstanding, and the hierarchy is either built and current or
/// not expected (empty state).
fn is_settled(view: &ViewSnapshot) -> bool {
    if view.list_revision == 0 || view.list.is_scanning {
        return false;
    }
    if view.list.current_path.is_none() {
        return true;
    }
    view.hierarchy.root.is_some() && !view.hierarchy.is_refreshing
}

fn wait_until_settled(view: &SharedView, timeout: Duration) -> anyhow::Result<ViewSnapshot> {
    let ticker = tick(POLL_INTERVAL);
    let deadline = after(timeout);
    let mut last_revisions = (0, 0);
    let mut quiet = 0u32;

    loop {
        select! {
            recv(ticker) -> _ => {
                let snapshot = view.read();
                let revisions = (snapshot.list_revision, snapshot.hierarchy_revision);
                if is_settled(&snapshot) && revisions == last_revisions {
                    quiet += 1;
                    if quiet >= QUIET_SAMPLES {
                        debug!("View settled at revisions {revisions:?}");
                        return Ok(snapshot.clone());
                    }
                } else {
                    quiet = 0;
                }
                last_revisions = revisions;
            },
            recv(deadline) -> _ => {
                bail!("view did not settle within {} seconds", timeout.as_secs());
            },
        }
    }
}
