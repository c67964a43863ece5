//! Join-on-drop handle for the worker thread.
//!
//! Owning a `Handle` is the only way to talk to a running daemon: it holds
//! the command-channel sender and the snapshot-channel receiver, and its
//! `Drop` impl sends `Shutdown` and blocks until the worker thread has
//! finished its shutdown sequence, so a `Handle` going out of scope can
//! never leave a stopped process frozen.

use crate::registry::Snapshot;
use crate::worker::{self, Command};
use cl_config::Settings;
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::JoinHandle;

pub struct Handle {
    commands: Sender<Command>,
    snapshots: Receiver<Snapshot>,
    join_handle: Option<JoinHandle<()>>,
}

impl Handle {
    /// Spawn the worker thread and return a handle to it.
    pub fn spawn(settings: Settings, proc_root: PathBuf) -> Self {
        let (command_tx, command_rx) = mpsc::channel();
        let (snapshot_tx, snapshot_rx) = mpsc::channel();

        let join_handle = std::thread::Builder::new()
            .name("cpulimit-worker".to_string())
            .spawn(move || worker::run(settings, proc_root, command_rx, snapshot_tx))
            .expect("failed to spawn worker thread");

        Self {
            commands: command_tx,
            snapshots: snapshot_rx,
            join_handle: Some(join_handle),
        }
    }

    pub fn set_limit(&self, pid: u32, limit: f64) {
        let _ = self.commands.send(Command::SetLimit { pid, limit });
    }

    pub fn clear_limit(&self, pid: u32) {
        let _ = self.commands.send(Command::ClearLimit { pid });
    }

    /// Block until the next snapshot is published, or the worker has
    /// shut down.
    pub fn recv_snapshot(&self) -> Option<Snapshot> {
        self.snapshots.recv().ok()
    }

    /// Non-blocking snapshot poll, draining to the most recent one
    /// available.
    pub fn try_recv_latest_snapshot(&self) -> Option<Snapshot> {
        let mut latest = None;
        while let Ok(snapshot) = self.snapshots.try_recv() {
            latest = Some(snapshot);
        }
        latest
    }
}

impl Drop for Handle {
    fn drop(&mut self) {
        let _ = self.commands.send(Command::Shutdown);
        if let Some(join_handle) = self.join_handle.take() {
            let _ = join_handle.join();
        }
    }
}
