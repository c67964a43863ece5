//! Online CPU count, used to bound the estimator's upper limit and to scale
//! internal fraction-of-one-core usage into a system-wide percentage for
//! presentation.
//!
//! There is no `/proc/devices/system/cpu/cpuN/online` in any real Linux
//! kernel; that path is a transcription bug carried over from the original
//! implementation this daemon's behavior was modeled on. The real interface
//! is `/sys/devices/system/cpu/cpuN/online`, or simpler still,
//! `sysconf(_SC_NPROCESSORS_ONLN)`, which this module uses directly via
//! `libc`.

/// Number of CPUs currently online, per `sysconf(_SC_NPROCESSORS_ONLN)`.
///
/// Falls back to 1 if the kernel reports a nonsensical value (<= 0), which
/// can happen in restrictive containers or unusual sandboxes.
pub fn online_cpu_count() -> u32 {
    let n = unsafe { libc::sysconf(libc::_SC_NPROCESSORS_ONLN) };
    if n > 0 {
        n as u32
    } else {
        1
    }
}

/// Clock ticks per second, per `sysconf(_SC_CLK_TCK)`. Needed to convert
/// `/proc/[pid]/stat` utime/stime tick counts into seconds. Almost always
/// 100 on Linux, but never hardcoded since it is configurable at kernel
/// build time on some architectures.
pub fn clock_ticks_per_sec() -> u64 {
    let n = unsafe { libc::sysconf(libc::_SC_CLK_TCK) };
    if n > 0 {
        n as u64
    } else {
        100
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn online_cpu_count_is_at_least_one() {
        assert!(online_cpu_count() >= 1);
    }

    #[test]
    fn clock_ticks_per_sec_is_positive() {
        assert!(clock_ticks_per_sec() > 0);
    }
}
