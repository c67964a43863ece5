//! CPU utilization estimator: an exponentially-smoothed (IIR) estimate of a
//! process's share of one CPU core, derived from successive `/proc` CPU-time
//! samples.
//!
//! Internally, usage is always a fraction of one core in `[0, num_cpus]`:
//! a single-threaded process pegging one core reports `1.0`, and a process
//! busy across four cores reports up to `4.0`. Presentation code (see
//! `cl_common::UsageScale`) is responsible for converting that to a
//! per-core or system-wide percentage; this module never does that
//! conversion itself.

use cl_config::Settings;

/// Minimum gap between samples before a new estimate is computed. Samples
/// closer together than this are too noisy -- clock tick granularity
/// dominates the signal at very short windows.
pub const MIN_SAMPLE_INTERVAL_MS: u64 = 20;

/// Smoothing factor for the exponential moving average. Values closer to 1
/// track instantaneous usage more closely; values closer to 0 smooth out
/// bursts more aggressively.
pub const ALPHA: f64 = 0.08;

/// One process's running CPU-time estimate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Estimator {
    alpha: f64,
    min_sample_interval_ms: u64,
    clock_ticks_per_sec: u64,
    /// Upper clamp for `usage`, in fraction-of-one-core units (`N_cpu`).
    max_usage: f64,
    /// Smoothed usage, fraction of one core.
    usage: f64,
}

impl Estimator {
    pub fn new(alpha: f64, min_sample_interval_ms: u64, clock_ticks_per_sec: u64, online_cpus: u32) -> Self {
        Self {
            alpha,
            min_sample_interval_ms,
            clock_ticks_per_sec,
            max_usage: online_cpus.max(1) as f64,
            usage: 0.0,
        }
    }

    pub fn from_settings(settings: &Settings, clock_ticks_per_sec: u64, online_cpus: u32) -> Self {
        Self::new(settings.alpha, settings.min_sample_interval_ms, clock_ticks_per_sec, online_cpus)
    }

    pub fn usage(&self) -> f64 {
        self.usage
    }

    /// Fold in a new CPU-time sample.
    ///
    /// `total_ticks` is the process's cumulative utime+stime at this sample;
    /// `prev_ticks` is the value from the previous sample. `elapsed_ms` is
    /// wall-clock time since that previous sample (formulation A: wall-clock
    /// normalization, the canonical estimator here). Samples taken less than
    /// `min_sample_interval_ms` apart are skipped and the prior estimate is
    /// returned unchanged, since tick-count quantization dominates the
    /// signal at short windows.
    pub fn update(&mut self, total_ticks: u64, prev_ticks: u64, elapsed_ms: u64) -> f64 {
        if elapsed_ms < self.min_sample_interval_ms {
            return self.usage;
        }

        let delta_ticks = total_ticks.saturating_sub(prev_ticks) as f64;
        let tick_seconds = delta_ticks / self.clock_ticks_per_sec as f64;
        let elapsed_seconds = elapsed_ms as f64 / 1000.0;
        let instantaneous = if elapsed_seconds > 0.0 {
            tick_seconds / elapsed_seconds
        } else {
            0.0
        };

        let blended = self.alpha * instantaneous + (1.0 - self.alpha) * self.usage;
        self.usage = blended.clamp(0.0, self.max_usage);
        self.usage
    }

    /// Reset the smoothed estimate, e.g. after a pid-reuse mismatch forces
    /// the registry to start a fresh history for that slot.
    pub fn reset(&mut self) {
        self.usage = 0.0;
    }
}
