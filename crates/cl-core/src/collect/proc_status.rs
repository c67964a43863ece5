//! `/proc/[pid]/status` parsing: the `Name:` and `Uid:` lines used during
//! discovery to populate a new `ProcessRecord`'s command and owning user.

use std::path::Path;

/// The fields of `/proc/[pid]/status` discovery cares about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcStatus {
    /// Command name, truncated to 15 bytes by the kernel (same field the
    /// parenthesized `comm` in `/proc/[pid]/stat` reports).
    pub name: String,
    /// Real (not effective) uid, the first of the four values on the `Uid:`
    /// line.
    pub uid: u32,
}

/// Parse `/proc/[pid]/status` content, extracting `Name:` and `Uid:`.
///
/// Returns `None` if either required line is missing or malformed.
pub fn parse_proc_status(content: &str) -> Option<ProcStatus> {
    let mut name = None;
    let mut uid = None;

    for line in content.lines() {
        if let Some(rest) = line.strip_prefix("Name:") {
            name = Some(rest.trim().to_string());
        } else if let Some(rest) = line.strip_prefix("Uid:") {
            uid = rest.split_whitespace().next().and_then(|s| s.parse().ok());
        }
    }

    Some(ProcStatus {
        name: name?,
        uid: uid?,
    })
}

/// Read and parse `<proc_root>/[pid]/status`. `Ok(None)` means the process
/// has already exited, which discovery treats as "skip this pid this
/// cycle", not an error.
pub fn read_proc_status(proc_root: &Path, pid: u32) -> std::io::Result<Option<ProcStatus>> {
    let path = proc_root.join(pid.to_string()).join("status");
    match std::fs::read_to_string(&path) {
        Ok(content) => Ok(parse_proc_status(&content)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}
