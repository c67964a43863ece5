//! Shared types, IDs, and errors for the CPU limiter daemon.
//!
//! This crate provides foundational types shared across `cl-config` and
//! `cl-core`:
//! - Process identity types with PID-reuse safety guarantees
//! - The common error type
//! - Output format / usage-scale presentation types

pub mod error;
pub mod id;
pub mod output;

pub use error::{format_error_human, Error, Result};
pub use id::StartId;
pub use output::{OutputFormat, UsageScale};
