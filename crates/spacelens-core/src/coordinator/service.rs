/// Control-thread service: runs a [`ScanCoordinator`] on its own thread.
///
/// The thread blocks in a `select!` over three sources, processed strictly
/// in arrival order:
/// - [`Command`]s from the presentation layer,
/// - [`WorkerMessage`](crate::scanner::progress::WorkerMessage)s from the pool,
/// - the hierarchy debounce deadline (`never()` when nothing is scheduled).
///
/// Worker messages already queued behind the one that woke the thread are
/// handled with it and published as one batch.
use super::publish::Publisher;
use super::{ScanCoordinator, MAX_MESSAGES_PER_PASS};
use crate::config::CoreConfig;
use crate::error::{CoreError, Result};
use crate::scanner::progress::Command;
use crossbeam_channel::{select, Receiver, Sender};
use std::path::PathBuf;
use std::thread;
use std::time::Instant;
use tracing::{debug, info};

/// Handle to a running control thread.
///
/// Dropping the handle shuts the thread down and waits for it.
pub struct CoordinatorHandle {
    commands: Sender<Command>,
    thread: Option<thread::JoinHandle<()>>,
}

impl CoordinatorHandle {
    /// Queue a command. Silently ignored once the thread has stopped.
    pub fn send(&self, command: Command) {
        let _ = self.commands.send(command);
    }

    pub fn open(&self, path: impl Into<PathBuf>) {
        self.send(Command::Open(path.into()));
    }

    pub fn go_back(&self) {
        self.send(Command::GoBack);
    }

    pub fn choose_root(&self, path: impl Into<PathBuf>) {
        self.send(Command::ChooseRoot(path.into()));
    }

    pub fn reset_to_root(&self) {
        self.send(Command::ResetToRoot);
    }

    pub fn set_display_limit(&self, limit: usize) {
        self.send(Command::SetDisplayLimit(limit));
    }

    pub fn set_hierarchy_depth(&self, depth: usize) {
        self.send(Command::SetHierarchyDepth(depth));
    }

    /// Stop the control thread and wait for it to exit.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        if let Some(thread) = self.thread.take() {
            let _ = self.commands.send(Command::Shutdown);
            let _ = thread.join();
        }
    }
}

impl Drop for CoordinatorHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Start a coordinator on a dedicated control thread.
pub fn spawn_coordinator(
    config: CoreConfig,
    publisher: impl Publisher + 'static,
) -> Result<CoordinatorHandle> {
    let coordinator = ScanCoordinator::new(config, publisher)?;
    let (commands, command_rx) = crossbeam_channel::unbounded::<Command>();

    let thread = thread::Builder::new()
        .name("spacelens-control".into())
        .spawn(move || run_control_loop(coordinator, command_rx))
        .map_err(CoreError::ControlThread)?;

    Ok(CoordinatorHandle {
        commands,
        thread: Some(thread),
    })
}

fn run_control_loop(mut coordinator: ScanCoordinator, commands: Receiver<Command>) {
    info!("Control thread started");
    let worker_rx = coordinator.worker_receiver().clone();

    loop {
        let timer = match coordinator.debounce_deadline() {
            Some(deadline) => crossbeam_channel::at(deadline),
            None => crossbeam_channel::never(),
        };

        select! {
            recv(commands) -> command => match command {
                Ok(command) => {
                    if !coordinator.handle_command(command) {
                        break;
                    }
                }
                Err(_) => {
                    debug!("Command channel closed");
                    break;
                }
            },
            recv(worker_rx) -> msg => {
                if let Ok(msg) = msg {
                    coordinator.handle_message(msg);
                    coordinator.drain_queued(MAX_MESSAGES_PER_PASS - 1);
                    coordinator.flush();
                }
            },
            recv(timer) -> _ => {
                coordinator.fire_due_refresh(Instant::now());
            },
        }
    }

    info!("Control thread stopped");
}
