//! `/proc/[pid]/stat` parsing: the CPU-time sample that feeds the
//! utilization estimator, and the state field used to verify STOP/CONTINUE
//! delivery.
//!
//! The `comm` field is parenthesized and may itself contain spaces or
//! parentheses (e.g. a process renamed to `(my worker)`), so the only safe
//! way to locate the end of it is to search for the *last* `)` in the line,
//! not the first.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// A single sample of a process's accumulated CPU ticks and identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcStat {
    pub pid: u32,
    /// 'R' running, 'S' sleeping, 'D' uninterruptible sleep, 'T' stopped,
    /// 't' tracing stop, 'Z' zombie, 'X' dead.
    pub state: char,
    /// User-mode CPU ticks accumulated since process start.
    pub utime: u64,
    /// Kernel-mode CPU ticks accumulated since process start.
    pub stime: u64,
    /// Number of threads at sample time.
    pub num_threads: u32,
    /// Process start time, in clock ticks since boot. Stable for the
    /// lifetime of one pid incarnation; used to detect pid reuse.
    pub starttime: u64,
}

impl ProcStat {
    pub fn total_ticks(&self) -> u64 {
        self.utime + self.stime
    }

    /// True if the kernel reports this process as stopped by a signal
    /// (SIGSTOP) or stopped for tracing.
    pub fn is_stopped(&self) -> bool {
        matches!(self.state, 'T' | 't')
    }
}

/// Parse the content of `/proc/[pid]/stat`.
///
/// Returns `None` if the content is too short or malformed -- callers treat
/// that the same as "process vanished mid-read", which is the common case.
pub fn parse_proc_stat(content: &str, pid: u32) -> Option<ProcStat> {
    let comm_end = content.rfind(')')?;
    let after_comm = content.get(comm_end + 2..)?;
    let fields: Vec<&str> = after_comm.split_whitespace().collect();
    if fields.len() < 20 {
        return None;
    }

    let state = fields[0].chars().next()?;
    let utime: u64 = fields[11].parse().ok()?;
    let stime: u64 = fields[12].parse().ok()?;
    let num_threads: u32 = fields[17].parse().ok()?;
    let starttime: u64 = fields[19].parse().ok()?;

    Some(ProcStat {
        pid,
        state,
        utime,
        stime,
        num_threads,
        starttime,
    })
}

/// Read and parse `<proc_root>/[pid]/stat`. Returns `Ok(None)` when the
/// process no longer exists rather than surfacing an I/O error -- a process
/// exiting between discovery and sampling is an expected race, not a fault.
pub fn read_proc_stat(proc_root: &Path, pid: u32) -> std::io::Result<Option<ProcStat>> {
    let path = proc_root.join(pid.to_string()).join("stat");
    match std::fs::read_to_string(&path) {
        Ok(content) => Ok(parse_proc_stat(&content, pid)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_well_formed_stat_line() {
        let content = "1234 (test_proc) S 1 1234 1234 0 -1 4194304 100 0 0 0 \
                       500 200 0 0 20 0 4 0 12345 1234567 890 18446744073709551615 \
                       1 1 0 0 0 0 0 0 0 0 0 0 17 0 0 0 0 0 0";
        let stat = parse_proc_stat(content, 1234).unwrap();
        assert_eq!(stat.state, 'S');
        assert_eq!(stat.utime, 500);
        assert_eq!(stat.stime, 200);
        assert_eq!(stat.total_ticks(), 700);
        assert_eq!(stat.num_threads, 4);
        assert_eq!(stat.starttime, 12345);
        assert!(!stat.is_stopped());
    }

    #[test]
    fn comm_with_embedded_spaces_and_parens() {
        let content = "5678 (my (weird) proc) R 1 5678 5678 0 -1 4194304 50 0 0 0 \
                       1000 500 0 0 20 0 8 0 67890 2345678 1234 18446744073709551615 \
                       1 1 0 0 0 0 0 0 0 0 0 0 17 0 0 0 0 0 0";
        let stat = parse_proc_stat(content, 5678).unwrap();
        assert_eq!(stat.utime, 1000);
        assert_eq!(stat.stime, 500);
        assert_eq!(stat.num_threads, 8);
    }

    #[test]
    fn stopped_state_detected() {
        let content = "1 (x) T 0 1 1 0 -1 0 0 0 0 0 0 0 0 0 20 0 1 0 1 0 0 0 \
                       1 1 0 0 0 0 0 0 0 0 0 0 17 0 0 0 0 0 0";
        let stat = parse_proc_stat(content, 1).unwrap();
        assert!(stat.is_stopped());
    }

    #[test]
    fn truncated_line_returns_none() {
        let content = "1234 (proc) S 1 2 3";
        assert!(parse_proc_stat(content, 1234).is_none());
    }

    #[test]
    fn missing_closing_paren_returns_none() {
        let content = "1234 (unterminated S 1 2 3 4 5 6 7 8 9 10 11 12 13 14 15 16 17 18 19 20";
        assert!(parse_proc_stat(content, 1234).is_none());
    }

    #[test]
    fn read_proc_stat_missing_pid_is_ok_none() {
        let dir = tempfile::tempdir().unwrap();
        let result = read_proc_stat(dir.path(), 999_999).unwrap();
        assert!(result.is_none());
    }
}
