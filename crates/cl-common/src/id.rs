//! Process identity types.
//!
//! A process is identified by its pid, but pids are reused by the kernel once
//! a process exits. Every sample carries the process `starttime` (field 22 of
//! `/proc/pid/stat`, in clock ticks since boot) alongside the pid; comparing
//! that pair across samples is enough to detect PID reuse within a single
//! boot, which is all this daemon ever needs to reason about.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies one incarnation of a pid: the pid plus its kernel-reported
/// start time in clock ticks since boot.
///
/// Two samples with the same pid but different `StartId` refer to different
/// processes that happened to reuse the same pid; any delta computed across
/// them is meaningless and must be discarded rather than reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StartId {
    pub pid: u32,
    pub starttime_ticks: u64,
}

impl StartId {
    pub fn new(pid: u32, starttime_ticks: u64) -> Self {
        StartId { pid, starttime_ticks }
    }
}

impl fmt::Display for StartId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.pid, self.starttime_ticks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_id_equality_tracks_starttime() {
        let a = StartId::new(100, 5000);
        let b = StartId::new(100, 5000);
        let c = StartId::new(100, 5001);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn start_id_display_format() {
        assert_eq!(StartId::new(7, 99).to_string(), "7:99");
    }
}
