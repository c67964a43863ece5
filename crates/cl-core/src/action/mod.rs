//! Process control actions: SIGSTOP/SIGCONT delivery and verification.

#[cfg(unix)]
pub mod signal;

#[cfg(unix)]
pub use signal::{SignalConfig, SignalRunner};
