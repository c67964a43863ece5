//! Duty-cycle controller: the state machine that turns a process's smoothed
//! CPU usage and a user-chosen limit into SIGSTOP/SIGCONT decisions.
//!
//! States:
//! - `Unlimited`: no limit set; the controller never touches this pid.
//! - `RunningUnderLimit`: a limit is set and usage is at or below it; no
//!   action taken.
//! - `TriggerStop`: usage just crossed above the limit; the controller
//!    issues SIGSTOP and computes how many control ticks to sleep.
//! - `Stopped`: waiting out `sleep_ticks`; each tick decrements the
//!   counter, and at zero the controller issues SIGCONT and re-evaluates.
//!
//! `sleep_ticks = max(1, floor((cpu_usage - limit) / limit))`: the more a
//! process overshoots its budget, the longer it sleeps before being allowed
//! to run again. This is an approximate, best-effort throttle, not a hard
//! real-time guarantee.

use cl_common::Error;

/// Tolerance below which a limit is treated as a no-op rather than a
/// request to freeze the process permanently. A `limit` of exactly `0.0`
/// would otherwise mean "never allowed to run", which is not a sensible
/// default for an accidental `--limit 0`.
pub const EPSILON: f64 = 1e-3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    Unlimited,
    RunningUnderLimit,
    TriggerStop,
    Stopped,
}

/// The action the duty-cycle controller wants the caller to take this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlAction {
    None,
    Stop,
    Continue,
}

/// Validate a user-supplied limit, in `(0.0, 1.0]`. A limit within
/// `epsilon` of `0.0` is accepted but treated as "no limit" rather than
/// rejected, since a caller asking to freeze a process forever should use
/// the stop action directly, not a pathological limit.
pub fn validate_limit(value: f64, epsilon: f64) -> Result<Option<f64>, Error> {
    if !(0.0..=1.0).contains(&value) {
        return Err(Error::LimitOutOfRange { value });
    }
    if value < epsilon {
        return Ok(None);
    }
    Ok(Some(value))
}

/// One process's duty-cycle controller state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Controller {
    state: ControllerState,
    sleep_ticks_remaining: u32,
}

impl Default for Controller {
    fn default() -> Self {
        Self {
            state: ControllerState::Unlimited,
            sleep_ticks_remaining: 0,
        }
    }
}

impl Controller {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    pub fn sleep_ticks_remaining(&self) -> u32 {
        self.sleep_ticks_remaining
    }

    /// Advance the controller by one control-loop tick given the process's
    /// current smoothed usage and limit. Returns the action the caller
    /// should perform (send SIGSTOP, send SIGCONT, or do nothing).
    pub fn tick(&mut self, cpu_usage: f64, limit: Option<f64>) -> ControlAction {
        let Some(limit) = limit else {
            self.state = ControllerState::Unlimited;
            self.sleep_ticks_remaining = 0;
            return ControlAction::None;
        };

        match self.state {
            ControllerState::Stopped => {
                if self.sleep_ticks_remaining > 1 {
                    self.sleep_ticks_remaining -= 1;
                    ControlAction::None
                } else {
                    self.sleep_ticks_remaining = 0;
                    self.state = ControllerState::RunningUnderLimit;
                    ControlAction::Continue
                }
            }
            ControllerState::Unlimited | ControllerState::RunningUnderLimit | ControllerState::TriggerStop => {
                if cpu_usage > limit {
                    self.sleep_ticks_remaining = sleep_ticks(cpu_usage, limit);
                    self.state = ControllerState::Stopped;
                    ControlAction::Stop
                } else {
                    self.state = ControllerState::RunningUnderLimit;
                    ControlAction::None
                }
            }
        }
    }
}

/// `sleep_ticks = max(1, floor((cpu_usage - limit) / limit))`.
fn sleep_ticks(cpu_usage: f64, limit: f64) -> u32 {
    let ratio = (cpu_usage - limit) / limit;
    (ratio.floor() as i64).max(1) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_limit_accepts_in_range() {
        assert_eq!(validate_limit(0.5, EPSILON).unwrap(), Some(0.5));
        assert_eq!(validate_limit(1.0, EPSILON).unwrap(), Some(1.0));
    }

    #[test]
    fn validate_limit_rejects_out_of_range() {
        assert!(validate_limit(-0.1, EPSILON).is_err());
        assert!(validate_limit(1.1, EPSILON).is_err());
    }

    #[test]
    fn validate_limit_zero_is_no_op_not_freeze() {
        assert_eq!(validate_limit(0.0, EPSILON).unwrap(), None);
        assert_eq!(validate_limit(0.0005, EPSILON).unwrap(), None);
    }

    #[test]
    fn unlimited_never_stops() {
        let mut controller = Controller::new();
        assert_eq!(controller.tick(0.99, None), ControlAction::None);
        assert_eq!(controller.state(), ControllerState::Unlimited);
    }

    #[test]
    fn running_under_limit_takes_no_action() {
        let mut controller = Controller::new();
        assert_eq!(controller.tick(0.2, Some(0.5)), ControlAction::None);
        assert_eq!(controller.state(), ControllerState::RunningUnderLimit);
    }

    #[test]
    fn crossing_limit_triggers_stop_with_correct_sleep_ticks() {
        let mut controller = Controller::new();
        // usage 0.9, limit 0.3 -> ratio 2.0 -> sleep_ticks = 2
        assert_eq!(controller.tick(0.9, Some(0.3)), ControlAction::Stop);
        assert_eq!(controller.state(), ControllerState::Stopped);
        assert_eq!(controller.sleep_ticks_remaining(), 2);
    }

    #[test]
    fn sleep_ticks_floor_is_never_less_than_one() {
        let mut controller = Controller::new();
        // usage barely over limit -> ratio near 0 -> sleep_ticks clamps to 1
        assert_eq!(controller.tick(0.31, Some(0.3)), ControlAction::Stop);
        assert_eq!(controller.sleep_ticks_remaining(), 1);
    }

    #[test]
    fn stopped_state_counts_down_then_continues() {
        let mut controller = Controller::new();
        controller.tick(0.9, Some(0.3)); // sleep_ticks = 2
        assert_eq!(controller.tick(0.9, Some(0.3)), ControlAction::None);
        assert_eq!(controller.sleep_ticks_remaining(), 1);
        assert_eq!(controller.tick(0.9, Some(0.3)), ControlAction::Continue);
        assert_eq!(controller.state(), ControllerState::RunningUnderLimit);
    }

    #[test]
    fn clearing_limit_resets_to_unlimited() {
        let mut controller = Controller::new();
        controller.tick(0.9, Some(0.3));
        assert_eq!(controller.tick(0.9, None), ControlAction::None);
        assert_eq!(controller.state(), ControllerState::Unlimited);
        assert_eq!(controller.sleep_ticks_remaining(), 0);
    }
}
