//! The process registry: single source of truth for every process the
//! daemon currently tracks, and the snapshot publisher that hands a
//! read-only copy of that state to the presentation layer.
//!
//! Invariants upheld by this module:
//! 1. A pid appears at most once in the registry at any time.
//! 2. `prev_cpu_time_ticks`/`last_sample_ms` are only updated together, by
//!    the control loop, never by discovery.
//! 3. `limit` is always `None` or a value in `(0.0, 1.0]`; the duty-cycle
//!    controller rejects anything outside that range before it reaches the
//!    registry.
//! 4. `sleep_ticks` is only meaningful while `limit.is_some()`; it is reset
//!    to 0 when a limit is cleared.
//! 5. The daemon's own pid is never inserted into the registry.
//! 6. A record is removed only after discovery confirms the pid is gone
//!    from `/proc`, never speculatively.
//! 7. `min_cpu_usage <= cpu_usage <= max_cpu_usage` always holds, and both
//!    bounds reset alongside the estimator on pid reuse.

use crate::collect::DiscoveryDiff;
use crate::estimator::Estimator;
use cl_common::{Error, StartId};
use std::collections::HashMap;

/// One tracked process.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessRecord {
    pub pid: u32,
    pub command: String,
    pub user: Option<String>,
    pub cpu_time_ticks: u64,
    pub prev_cpu_time_ticks: u64,
    pub last_sample_ms: u64,
    /// Smoothed usage, fraction of one core.
    pub cpu_usage: f64,
    /// Lowest `cpu_usage` observed since the record was created.
    pub min_cpu_usage: f64,
    /// Highest `cpu_usage` observed since the record was created.
    pub max_cpu_usage: f64,
    /// User-chosen ceiling, fraction of one core in `(0.0, 1.0]`.
    pub limit: Option<f64>,
    /// Number of control-loop ticks left to sleep before the next SIGCONT.
    pub sleep_ticks: u32,
    pub(crate) estimator: Estimator,
    /// Start-time in clock ticks, used to detect pid reuse between samples.
    pub(crate) starttime: u64,
    /// False until the first sample has seeded `min_cpu_usage`/`max_cpu_usage`;
    /// cleared again on a pid-reuse reset so the next sample reseeds both.
    min_max_seeded: bool,
}

impl ProcessRecord {
    fn new(pid: u32, command: String, user: Option<String>, estimator: Estimator, starttime: u64) -> Self {
        Self {
            pid,
            command,
            user,
            cpu_time_ticks: 0,
            prev_cpu_time_ticks: 0,
            last_sample_ms: 0,
            cpu_usage: 0.0,
            min_cpu_usage: 0.0,
            max_cpu_usage: 0.0,
            limit: None,
            sleep_ticks: 0,
            estimator,
            starttime,
            min_max_seeded: false,
        }
    }
}

/// A value-copy view of the registry, handed to the presentation layer over
/// the snapshot channel.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub process_list: Vec<ProcessRecord>,
    pub added_pids: Vec<u32>,
    pub removed_pids: Vec<u32>,
}

/// Owns every tracked `ProcessRecord`. Lives entirely on the worker thread;
/// never shared across threads directly (see `worker`).
#[derive(Debug, Default)]
pub struct Registry {
    records: HashMap<u32, ProcessRecord>,
    self_pid: u32,
}

impl Registry {
    pub fn new(self_pid: u32) -> Self {
        Self {
            records: HashMap::new(),
            self_pid,
        }
    }

    pub fn contains(&self, pid: u32) -> bool {
        self.records.contains_key(&pid)
    }

    pub fn get(&self, pid: u32) -> Option<&ProcessRecord> {
        self.records.get(&pid)
    }

    pub fn get_mut(&mut self, pid: u32) -> Option<&mut ProcessRecord> {
        self.records.get_mut(&pid)
    }

    pub fn known_pids(&self) -> std::collections::HashSet<u32> {
        self.records.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Apply a discovery diff: insert newly seen processes, drop ones that
    /// vanished. The daemon's own pid is never inserted (invariant 5).
    pub fn apply_discovery(&mut self, diff: &DiscoveryDiff, estimator_for: impl Fn() -> Estimator) -> (Vec<u32>, Vec<u32>) {
        let mut added = Vec::new();
        for proc in &diff.added {
            if proc.pid == self.self_pid {
                continue;
            }
            self.records.insert(
                proc.pid,
                ProcessRecord::new(proc.pid, proc.command.clone(), proc.user.clone(), estimator_for(), 0),
            );
            added.push(proc.pid);
        }

        let mut removed = Vec::new();
        for &pid in &diff.removed {
            if self.records.remove(&pid).is_some() {
                removed.push(pid);
            }
        }

        (added, removed)
    }

    /// Record a fresh CPU-time sample for `pid`, updating the smoothed
    /// estimate in place. If `starttime` differs from the record's stored
    /// starttime (and the stored value is nonzero) the pid has been reused
    /// by a different process since the record was created; the estimator
    /// is reset rather than folding in a bogus delta, and the identity
    /// mismatch is returned for the caller to log.
    pub fn record_sample(&mut self, pid: u32, total_ticks: u64, starttime: u64, now_ms: u64) -> Option<Error> {
        let Some(record) = self.records.get_mut(&pid) else {
            return None;
        };

        let mut identity_error = None;
        let previous_id = StartId::new(pid, record.starttime);
        let sampled_id = StartId::new(pid, starttime);
        if record.starttime != 0 && previous_id != sampled_id {
            record.estimator.reset();
            record.prev_cpu_time_ticks = 0;
            record.cpu_time_ticks = 0;
            record.last_sample_ms = 0;
            record.min_max_seeded = false;
            identity_error = Some(Error::IdentityMismatch { pid });
        }
        record.starttime = starttime;

        let elapsed_ms = now_ms.saturating_sub(record.last_sample_ms);
        let usage = record.estimator.update(total_ticks, record.prev_cpu_time_ticks, elapsed_ms);

        record.prev_cpu_time_ticks = record.cpu_time_ticks;
        record.cpu_time_ticks = total_ticks;
        record.last_sample_ms = now_ms;
        record.cpu_usage = usage;
        if record.min_max_seeded {
            record.min_cpu_usage = record.min_cpu_usage.min(usage);
            record.max_cpu_usage = record.max_cpu_usage.max(usage);
        } else {
            record.min_cpu_usage = usage;
            record.max_cpu_usage = usage;
            record.min_max_seeded = true;
        }

        identity_error
    }

    /// Take a value-copy snapshot for the presentation layer.
    pub fn snapshot(&self, added_pids: Vec<u32>, removed_pids: Vec<u32>) -> Snapshot {
        Snapshot {
            process_list: self.records.values().cloned().collect(),
            added_pids,
            removed_pids,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collect::DiscoveredProcess;

    fn test_estimator() -> Estimator {
        Estimator::new(0.08, 20, 100, 1)
    }

    #[test]
    fn apply_discovery_adds_and_removes() {
        let mut registry = Registry::new(1);
        let diff = DiscoveryDiff {
            added: vec![DiscoveredProcess {
                pid: 42,
                command: "sleep".into(),
                user: Some("alice".into()),
            }],
            removed: vec![],
        };
        let (added, removed) = registry.apply_discovery(&diff, test_estimator);
        assert_eq!(added, vec![42]);
        assert!(removed.is_empty());
        assert!(registry.contains(42));

        let diff2 = DiscoveryDiff {
            added: vec![],
            removed: vec![42],
        };
        let (added2, removed2) = registry.apply_discovery(&diff2, test_estimator);
        assert!(added2.is_empty());
        assert_eq!(removed2, vec![42]);
        assert!(!registry.contains(42));
    }

    #[test]
    fn self_pid_is_never_inserted() {
        let mut registry = Registry::new(1);
        let diff = DiscoveryDiff {
            added: vec![DiscoveredProcess {
                pid: 1,
                command: "cpulimitd".into(),
                user: None,
            }],
            removed: vec![],
        };
        let (added, _) = registry.apply_discovery(&diff, test_estimator);
        assert!(added.is_empty());
        assert!(!registry.contains(1));
    }

    #[test]
    fn record_sample_updates_usage() {
        let mut registry = Registry::new(1);
        let diff = DiscoveryDiff {
            added: vec![DiscoveredProcess {
                pid: 7,
                command: "burn".into(),
                user: None,
            }],
            removed: vec![],
        };
        registry.apply_discovery(&diff, test_estimator);

        registry.record_sample(7, 0, 100, 0);
        registry.record_sample(7, 10, 100, 100);
        let record = registry.get(7).unwrap();
        assert!(record.cpu_usage > 0.0);
        assert_eq!(record.cpu_time_ticks, 10);
        assert_eq!(record.max_cpu_usage, record.cpu_usage);
        assert_eq!(record.prev_cpu_time_ticks, 0);
    }

    #[test]
    fn pid_reuse_resets_estimator_history() {
        let mut registry = Registry::new(1);
        let diff = DiscoveryDiff {
            added: vec![DiscoveredProcess {
                pid: 7,
                command: "burn".into(),
                user: None,
            }],
            removed: vec![],
        };
        registry.apply_discovery(&diff, test_estimator);
        assert!(registry.record_sample(7, 1000, 500, 1000).is_none());
        assert!(registry.get(7).unwrap().cpu_usage > 0.0);

        // New process reused pid 7, different starttime, low tick count.
        let err = registry.record_sample(7, 5, 999, 1100);
        assert!(matches!(err, Some(Error::IdentityMismatch { pid: 7 })));
        let record = registry.get(7).unwrap();
        assert_eq!(record.prev_cpu_time_ticks, 0);
        assert_eq!(record.starttime, 999);
    }

    #[test]
    fn min_max_usage_track_extremes_across_samples() {
        let mut registry = Registry::new(1);
        let diff = DiscoveryDiff {
            added: vec![DiscoveredProcess {
                pid: 9,
                command: "bursty".into(),
                user: None,
            }],
            removed: vec![],
        };
        registry.apply_discovery(&diff, test_estimator);

        registry.record_sample(9, 0, 100, 0);
        registry.record_sample(9, 100, 100, 100); // fully busy instant
        let after_busy = registry.get(9).unwrap().cpu_usage;

        registry.record_sample(9, 100, 100, 200); // idle instant, usage decays
        let after_idle = registry.get(9).unwrap();

        assert_eq!(after_idle.max_cpu_usage, after_busy);
        assert!(after_idle.min_cpu_usage <= after_idle.cpu_usage);
    }

    #[test]
    fn pid_reuse_resets_min_max_usage() {
        let mut registry = Registry::new(1);
        let diff = DiscoveryDiff {
            added: vec![DiscoveredProcess {
                pid: 9,
                command: "bursty".into(),
                user: None,
            }],
            removed: vec![],
        };
        registry.apply_discovery(&diff, test_estimator);
        registry.record_sample(9, 0, 500, 0);
        registry.record_sample(9, 100, 500, 100);
        assert!(registry.get(9).unwrap().max_cpu_usage > 0.0);

        registry.record_sample(9, 0, 999, 200);
        let record = registry.get(9).unwrap();
        assert_eq!(record.max_cpu_usage, 0.0);
        assert_eq!(record.min_cpu_usage, 0.0);
    }

    #[test]
    fn snapshot_carries_added_and_removed() {
        let registry = Registry::new(1);
        let snap = registry.snapshot(vec![10], vec![20]);
        assert_eq!(snap.added_pids, vec![10]);
        assert_eq!(snap.removed_pids, vec![20]);
        assert!(snap.process_list.is_empty());
    }
}
