//! Per-process CPU usage limiter core library.
//!
//! Provides:
//! - `collect`: procfs/passwd readers (discovery, sampling, user lookup)
//! - `estimator`: exponentially-smoothed CPU utilization estimator
//! - `registry`: the process registry and snapshot publisher
//! - `controller`: the duty-cycle state machine driving SIGSTOP/SIGCONT
//! - `action`: signal delivery
//! - `worker` / `handle`: the single-owner worker thread and its handle
//! - `logging`: structured logging setup
//!
//! The binary entry point is in `main.rs`.

pub mod action;
pub mod collect;
pub mod controller;
pub mod estimator;
pub mod handle;
pub mod logging;
pub mod registry;
pub mod worker;

pub use handle::Handle;
pub use registry::{ProcessRecord, Snapshot};
pub use worker::Command;
