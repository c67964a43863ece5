//! Tunable constants for the sampler, estimator, and duty-cycle controller.
//!
//! These are the knobs named in the system overview: discovery period,
//! control period, the estimator's smoothing factor, its minimum sample
//! interval, and the controller's no-op epsilon. None of this is persisted
//! across restarts -- every run starts from defaults overridden by
//! environment and CLI.

use serde::{Deserialize, Serialize};

/// Process discovery (full `/proc` rescan) period, in milliseconds.
pub const DEFAULT_DISCOVERY_PERIOD_MS: u64 = 1000;

/// Duty-cycle control tick period, in milliseconds.
pub const DEFAULT_CONTROL_PERIOD_MS: u64 = 40;

/// IIR smoothing factor for the wall-clock utilization estimator.
pub const DEFAULT_ALPHA: f64 = 0.08;

/// Minimum wall-clock interval between CPU-time samples of the same
/// process, in milliseconds. Samples arriving sooner are skipped to avoid
/// dividing by a near-zero delta_t.
pub const DEFAULT_MIN_SAMPLE_INTERVAL_MS: u64 = 20;

/// Below this distance from the limit, `Controller::tick` treats the
/// process as compliant rather than re-triggering a stop.
pub const DEFAULT_EPSILON: f64 = 1e-3;

/// Root of the procfs mount to read from. Overridable so tests and
/// containerized deployments can point at an alternate mount.
pub const DEFAULT_PROC_ROOT: &str = "/proc";

/// Resolved runtime settings for the daemon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub discovery_period_ms: u64,
    pub control_period_ms: u64,
    pub alpha: f64,
    pub min_sample_interval_ms: u64,
    pub epsilon: f64,
    pub proc_root: String,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            discovery_period_ms: DEFAULT_DISCOVERY_PERIOD_MS,
            control_period_ms: DEFAULT_CONTROL_PERIOD_MS,
            alpha: DEFAULT_ALPHA,
            min_sample_interval_ms: DEFAULT_MIN_SAMPLE_INTERVAL_MS,
            epsilon: DEFAULT_EPSILON,
            proc_root: DEFAULT_PROC_ROOT.to_string(),
        }
    }
}

impl Settings {
    /// Validate invariants that the rest of the daemon assumes hold:
    /// periods must be positive, alpha must lie in (0, 1], epsilon must be
    /// non-negative and small relative to 1.0.
    pub fn validate(&self) -> Result<(), String> {
        if self.discovery_period_ms == 0 {
            return Err("discovery_period_ms must be greater than zero".to_string());
        }
        if self.control_period_ms == 0 {
            return Err("control_period_ms must be greater than zero".to_string());
        }
        if !(0.0 < self.alpha && self.alpha <= 1.0) {
            return Err(format!("alpha must be in (0.0, 1.0], got {}", self.alpha));
        }
        if self.epsilon < 0.0 || self.epsilon >= 1.0 {
            return Err(format!("epsilon must be in [0.0, 1.0), got {}", self.epsilon));
        }
        if self.proc_root.is_empty() {
            return Err("proc_root must not be empty".to_string());
        }
        Ok(())
    }
}
