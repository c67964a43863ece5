//! Signal-based pause/resume: the only actions this daemon ever takes
//! against a target process are SIGSTOP and SIGCONT.
//!
//! There is no staged SIGTERM/SIGKILL escalation here -- the duty-cycle
//! controller only ever needs to freeze and unfreeze a process, never end
//! it.

use cl_common::Error;
use std::thread;
use std::time::{Duration, Instant};

/// Tunables for signal delivery and state verification.
#[derive(Debug, Clone)]
pub struct SignalConfig {
    /// Polling interval when waiting for a state change to be observed.
    pub poll_interval_ms: u64,
    /// Maximum time to wait for a state change after sending a signal.
    pub verify_timeout_ms: u64,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 10,
            verify_timeout_ms: 500,
        }
    }
}

/// Delivers SIGSTOP/SIGCONT to pids and verifies the resulting state.
#[derive(Debug)]
pub struct SignalRunner {
    config: SignalConfig,
}

impl SignalRunner {
    pub fn new(config: SignalConfig) -> Self {
        Self { config }
    }

    pub fn with_defaults() -> Self {
        Self::new(SignalConfig::default())
    }

    fn send_signal(&self, pid: u32, signal: i32) -> Result<(), Error> {
        let result = unsafe { libc::kill(pid as i32, signal) };
        if result == 0 {
            return Ok(());
        }

        let err = std::io::Error::last_os_error();
        match err.raw_os_error() {
            Some(libc::ESRCH) => Err(Error::ProcessNotFound { pid }),
            Some(libc::EPERM) => Err(Error::PermissionDenied { pid }),
            _ => Err(Error::ActionFailed(format!("signal {signal} to pid {pid}: {err}"))),
        }
    }

    /// True if the kernel still reports `pid` as running (signalable).
    pub fn process_exists(&self, pid: u32) -> bool {
        let result = unsafe { libc::kill(pid as i32, 0) };
        result == 0 || std::io::Error::last_os_error().raw_os_error() == Some(libc::EPERM)
    }

    /// Stop (SIGSTOP) `pid`. Refuses to signal our own process.
    pub fn stop(&self, pid: u32, self_pid: u32) -> Result<(), Error> {
        if pid == self_pid {
            return Err(Error::SelfPidRefused { pid });
        }
        self.send_signal(pid, libc::SIGSTOP)
    }

    /// Resume (SIGCONT) `pid`.
    pub fn resume(&self, pid: u32) -> Result<(), Error> {
        self.send_signal(pid, libc::SIGCONT)
    }

    /// Block until `pid` is observed stopped, or time out.
    pub fn verify_stopped(&self, pid: u32) -> Result<(), Error> {
        self.wait_for_stopped(pid, true)
    }

    /// Block until `pid` is observed no longer stopped, or time out.
    pub fn verify_resumed(&self, pid: u32) -> Result<(), Error> {
        self.wait_for_stopped(pid, false)
    }

    fn wait_for_stopped(&self, pid: u32, expect_stopped: bool) -> Result<(), Error> {
        let start = Instant::now();
        let timeout = Duration::from_millis(self.config.verify_timeout_ms);
        let poll_interval = Duration::from_millis(self.config.poll_interval_ms);

        while start.elapsed() < timeout {
            match crate::collect::proc_stat::read_proc_stat(std::path::Path::new("/proc"), pid) {
                Ok(Some(stat)) if stat.is_stopped() == expect_stopped => return Ok(()),
                Ok(Some(_)) => {}
                Ok(None) => return Ok(()), // process gone; nothing left to verify
                Err(e) => return Err(Error::Io(e)),
            }
            thread::sleep(poll_interval);
        }

        Err(Error::ActionFailed(format!(
            "pid {pid} did not reach {} state within timeout",
            if expect_stopped { "stopped" } else { "running" }
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signal_config_defaults() {
        let config = SignalConfig::default();
        assert_eq!(config.poll_interval_ms, 10);
        assert_eq!(config.verify_timeout_ms, 500);
    }

    #[test]
    fn stop_refuses_self_pid() {
        let runner = SignalRunner::with_defaults();
        let pid = std::process::id();
        let result = runner.stop(pid, pid);
        assert!(matches!(result, Err(Error::SelfPidRefused { .. })));
    }

    #[cfg(unix)]
    mod unix_tests {
        use super::*;
        use std::process::Command;

        #[test]
        fn process_exists_for_self() {
            let runner = SignalRunner::with_defaults();
            assert!(runner.process_exists(std::process::id()));
        }

        #[test]
        fn process_not_exists_for_bogus_pid() {
            let runner = SignalRunner::with_defaults();
            assert!(!runner.process_exists(999_999_999));
        }

        #[test]
        #[cfg(target_os = "linux")]
        fn can_stop_and_resume_child() {
            let mut child = Command::new("sleep").arg("60").spawn().expect("spawn sleep");
            let pid = child.id();
            let runner = SignalRunner::with_defaults();

            runner.stop(pid, std::process::id()).expect("stop");
            runner.verify_stopped(pid).expect("verify stopped");

            runner.resume(pid).expect("resume");
            runner.verify_resumed(pid).expect("verify resumed");

            let _ = child.kill();
            let _ = child.wait();
        }
    }
}
