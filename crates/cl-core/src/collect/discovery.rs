//! Process discovery: scans `/proc` for numeric pid directories roughly
//! once a second and diffs the result against the set of pids the registry
//! already knows about.
//!
//! Discovery never samples CPU time itself -- that is the control loop's
//! job (see `proc_stat`). It only decides which pids are new and which have
//! disappeared, resolving a command name and owning user for anything new
//! via `/proc/[pid]/status` and the refreshed [`UserTable`].

use crate::collect::passwd::UserTable;
use crate::collect::proc_status::read_proc_status;
use std::collections::HashSet;
use std::path::Path;

/// A freshly-discovered process, ready to seed a new `ProcessRecord`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredProcess {
    pub pid: u32,
    pub command: String,
    pub user: Option<String>,
}

/// Result of one discovery pass: pids the registry should add, and pids
/// the registry should drop because they're no longer present in `/proc`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoveryDiff {
    pub added: Vec<DiscoveredProcess>,
    pub removed: Vec<u32>,
}

/// List every numeric entry directly under `proc_root`. Non-numeric
/// entries (`self`, `stat`, `cpuinfo`, ...) are not pids and are skipped.
pub fn list_pids(proc_root: &Path) -> std::io::Result<Vec<u32>> {
    let mut pids = Vec::new();
    for entry in std::fs::read_dir(proc_root)? {
        let entry = entry?;
        if let Some(pid) = entry.file_name().to_str().and_then(|s| s.parse::<u32>().ok()) {
            pids.push(pid);
        }
    }
    Ok(pids)
}

/// Scan `proc_root` and diff against `known_pids`. Resolves command/user
/// for each newly seen pid; a pid whose `status` can't be read (vanished
/// between listing and the read, or a malformed/unreadable file) is still
/// added, with empty fields, rather than dropped -- the registry needs to
/// track every pid `/proc` reports even if identity resolution fails for it.
pub fn discover(
    proc_root: &Path,
    known_pids: &HashSet<u32>,
    users: &UserTable,
) -> std::io::Result<DiscoveryDiff> {
    let current = list_pids(proc_root)?;
    let current_set: HashSet<u32> = current.iter().copied().collect();

    let mut added = Vec::new();
    for &pid in &current {
        if known_pids.contains(&pid) {
            continue;
        }
        match read_proc_status(proc_root, pid) {
            Ok(Some(status)) => added.push(DiscoveredProcess {
                pid,
                command: status.name,
                user: users.lookup(status.uid).map(str::to_string),
            }),
            Ok(None) => {
                tracing::debug!(pid, "status vanished before it could be read; adding with empty fields");
                added.push(DiscoveredProcess { pid, command: String::new(), user: None });
            }
            Err(e) => {
                tracing::warn!(pid, error = %e, "failed to read process status; adding with empty fields");
                added.push(DiscoveredProcess { pid, command: String::new(), user: None });
            }
        }
    }

    let removed: Vec<u32> = known_pids
        .iter()
        .copied()
        .filter(|pid| !current_set.contains(pid))
        .collect();

    Ok(DiscoveryDiff { added, removed })
}
