//! The single-owner worker thread: runs the discovery loop and control loop
//! cooperatively on one thread, owns the process registry, and is the only
//! code in the daemon that ever mutates it.
//!
//! Discovery (~1s) and control (~25-50ms) are modeled as rearming one-shot
//! timers rather than two separate threads: the worker loop blocks on the
//! command channel with a timeout equal to whichever timer is due soonest,
//! then runs whichever tick(s) became due, then re-arms. This keeps all
//! registry access single-threaded without needing a mutex.

use crate::action::{SignalConfig, SignalRunner};
use crate::collect::{self, passwd::UserTable};
use crate::controller::{Controller, ControlAction};
use crate::registry::{Registry, Snapshot};
use cl_config::Settings;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::mpsc::{Receiver, RecvTimeoutError, Sender};
use std::time::{Duration, Instant};

/// Commands accepted from the presentation layer.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    SetLimit { pid: u32, limit: f64 },
    ClearLimit { pid: u32 },
    Shutdown,
}

/// Run the worker loop until a `Shutdown` command is received. Blocking;
/// intended to be the body of the thread spawned by `Handle::spawn`.
pub fn run(
    settings: Settings,
    proc_root: PathBuf,
    commands: Receiver<Command>,
    snapshots: Sender<Snapshot>,
) {
    let self_pid = std::process::id();
    let mut registry = Registry::new(self_pid);
    let mut controllers: HashMap<u32, Controller> = HashMap::new();
    let signal_runner = SignalRunner::new(SignalConfig::default());
    let clock_ticks_per_sec = collect::clock_ticks_per_sec();
    let online_cpus = collect::online_cpu_count();

    let discovery_period = Duration::from_millis(settings.discovery_period_ms);
    let control_period = Duration::from_millis(settings.control_period_ms);

    let mut users = load_users();
    let mut next_discovery = Instant::now();
    let mut next_control = Instant::now();

    loop {
        let now = Instant::now();
        let wait_for_discovery = next_discovery.saturating_duration_since(now);
        let wait_for_control = next_control.saturating_duration_since(now);
        let wait = wait_for_discovery.min(wait_for_control);

        match commands.recv_timeout(wait) {
            Ok(Command::Shutdown) => {
                shutdown(&registry, &signal_runner, self_pid);
                return;
            }
            Ok(Command::SetLimit { pid, limit }) => {
                handle_set_limit(&mut registry, &mut controllers, pid, limit, settings.epsilon);
            }
            Ok(Command::ClearLimit { pid }) => {
                handle_clear_limit(&mut registry, &mut controllers, pid);
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => {
                shutdown(&registry, &signal_runner, self_pid);
                return;
            }
        }

        let now = Instant::now();
        let mut discovery_ran = false;
        let mut added = Vec::new();
        let mut removed = Vec::new();

        if now >= next_discovery {
            discovery_ran = true;
            users = load_users();
            if let Ok(diff) = collect::discover(&proc_root, &registry.known_pids(), &users) {
                let clock = clock_ticks_per_sec;
                let (a, r) = registry.apply_discovery(&diff, || {
                    crate::estimator::Estimator::new(settings.alpha, settings.min_sample_interval_ms, clock, online_cpus)
                });
                added = a;
                removed = r;
                for pid in &removed {
                    controllers.remove(pid);
                }
            }
            next_discovery += discovery_period;
            if next_discovery < now {
                next_discovery = now + discovery_period;
            }
        }

        if now >= next_control {
            run_control_tick(&mut registry, &mut controllers, &signal_runner, &proc_root, self_pid);
            next_control += control_period;
            if next_control < now {
                next_control = now + control_period;
            }
        }

        // Published every discovery iteration, even when the delta lists are
        // empty: a consumer relies on the snapshot to carry the full current
        // state (usage, sleep_ticks), not just the add/remove deltas.
        if discovery_ran {
            let snapshot = registry.snapshot(added, removed);
            let _ = snapshots.send(snapshot);
        }
    }
}

fn load_users() -> UserTable {
    UserTable::load_from_path(std::path::Path::new("/etc/passwd")).unwrap_or_default()
}

fn handle_set_limit(
    registry: &mut Registry,
    controllers: &mut HashMap<u32, Controller>,
    pid: u32,
    limit: f64,
    epsilon: f64,
) {
    if pid == std::process::id() {
        tracing::warn!(pid, "refusing to set a limit on the daemon's own pid");
        return;
    }
    match crate::controller::validate_limit(limit, epsilon) {
        Ok(resolved) => {
            if let Some(record) = registry.get_mut(pid) {
                record.limit = resolved;
                controllers.entry(pid).or_default();
            }
        }
        Err(e) => {
            tracing::warn!(pid, error = %e, "rejected limit");
        }
    }
}

fn handle_clear_limit(registry: &mut Registry, controllers: &mut HashMap<u32, Controller>, pid: u32) {
    if let Some(record) = registry.get_mut(pid) {
        record.limit = None;
        record.sleep_ticks = 0;
    }
    controllers.remove(&pid);
}

fn run_control_tick(
    registry: &mut Registry,
    controllers: &mut HashMap<u32, Controller>,
    signal_runner: &SignalRunner,
    proc_root: &std::path::Path,
    self_pid: u32,
) {
    let pids: Vec<u32> = registry.known_pids().into_iter().collect();
    let now_ms = now_millis();

    for pid in pids {
        let Ok(Some(stat)) = collect::read_proc_stat(proc_root, pid) else {
            continue;
        };
        if let Some(e) = registry.record_sample(pid, stat.total_ticks(), stat.starttime, now_ms) {
            tracing::debug!(pid, error = %e, "pid reuse detected");
        }

        let Some(record) = registry.get_mut(pid) else {
            continue;
        };
        let limit = record.limit;
        let cpu_usage = record.cpu_usage;

        // A pid with no limit and nothing left to sleep off never needs a
        // controller entry; drop any stale one so `controllers` only ever
        // holds pids that are actually limited or winding down a stop.
        if limit.is_none() && record.sleep_ticks == 0 {
            controllers.remove(&pid);
            continue;
        }

        let controller = controllers.entry(pid).or_default();
        let action = controller.tick(cpu_usage, limit);
        record.sleep_ticks = controller.sleep_ticks_remaining();

        match action {
            ControlAction::Stop => match signal_runner.stop(pid, self_pid) {
                Ok(()) => {
                    if let Err(e) = signal_runner.verify_stopped(pid) {
                        tracing::warn!(pid, error = %e, "stop signal sent but process did not reach stopped state");
                    }
                }
                Err(e) => tracing::warn!(pid, error = %e, "failed to stop process"),
            },
            ControlAction::Continue => match signal_runner.resume(pid) {
                Ok(()) => {
                    if let Err(e) = signal_runner.verify_resumed(pid) {
                        tracing::warn!(pid, error = %e, "continue signal sent but process did not resume");
                    }
                }
                Err(e) => tracing::warn!(pid, error = %e, "failed to resume process"),
            },
            ControlAction::None => {}
        }
    }
}

/// Shutdown sequence: CONTINUE every pid that currently has a limit or is
/// still winding down a stop, except our own, then return. No handles are
/// released here beyond the signals themselves -- the thread simply exits
/// and its `JoinHandle` is reaped by `Handle::drop`.
fn shutdown(registry: &Registry, signal_runner: &SignalRunner, self_pid: u32) {
    for pid in registry.known_pids() {
        if pid == self_pid {
            continue;
        }
        let Some(record) = registry.get(pid) else {
            continue;
        };
        if (record.limit.is_some() || record.sleep_ticks > 0) && signal_runner.process_exists(pid) {
            if let Err(e) = signal_runner.resume(pid) {
                tracing::warn!(pid, error = %e, "failed to resume process during shutdown");
            }
        }
    }
}

fn now_millis() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
