//! Process collection: everything that reads state out of `/proc` and
//! `/etc/passwd`.
//!
//! - [`passwd`] loads the uid -> username table
//! - [`proc_status`] resolves a pid's command name and owning uid
//! - [`discovery`] diffs `/proc`'s pid set against the registry's
//! - [`proc_stat`] samples accumulated CPU ticks and run state
//! - [`cpu_capacity`] reports the online CPU count

pub mod cpu_capacity;
pub mod discovery;
pub mod passwd;
pub mod proc_stat;
pub mod proc_status;

pub use cpu_capacity::{clock_ticks_per_sec, online_cpu_count};
pub use discovery::{discover, list_pids, DiscoveredProcess, DiscoveryDiff};
pub use passwd::UserTable;
pub use proc_stat::{parse_proc_stat, read_proc_stat, ProcStat};
pub use proc_status::{parse_proc_status, read_proc_status, ProcStatus};
