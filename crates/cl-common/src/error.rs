//! Error types for the CPU limiter daemon.
//!
//! Structured error handling with:
//! - Stable error codes for machine parsing
//! - Category classification for error grouping
//! - Recoverability hints
//! - Remediation suggestions for humans
//!
//! # Human-Facing Output
//!
//! ```text
//! ✗ Permission Denied
//!   Reason: permission denied accessing process 1234
//!   Fix: Run with elevated privileges: 'sudo cpulimitd' or grant CAP_KILL.
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Result type alias for limiter operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error categories for grouping related errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Configuration resolution errors.
    Config,
    /// procfs/passwd discovery and sampling errors.
    Collection,
    /// SIGSTOP/SIGCONT delivery errors.
    Action,
    /// File I/O and serialization errors.
    Io,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCategory::Config => write!(f, "config"),
            ErrorCategory::Collection => write!(f, "collection"),
            ErrorCategory::Action => write!(f, "action"),
            ErrorCategory::Io => write!(f, "io"),
        }
    }
}

/// Suggested follow-up for a command-line caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestedAction {
    Retry,
    Rescan,
    Elevate,
    Skip,
    Abort,
    None,
}

impl std::fmt::Display for SuggestedAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SuggestedAction::Retry => write!(f, "retry"),
            SuggestedAction::Rescan => write!(f, "rescan"),
            SuggestedAction::Elevate => write!(f, "elevate"),
            SuggestedAction::Skip => write!(f, "skip"),
            SuggestedAction::Abort => write!(f, "abort"),
            SuggestedAction::None => write!(f, "none"),
        }
    }
}

/// Unified error type for the limiter.
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors (10-19)
    #[error("configuration error: {0}")]
    Config(String),

    // Collection errors (20-29)
    #[error("process collection failed: {0}")]
    Collection(String),

    #[error("process {pid} not found")]
    ProcessNotFound { pid: u32 },

    #[error("process {pid} no longer matches the sampled start time, likely pid reuse")]
    IdentityMismatch { pid: u32 },

    #[error("permission denied accessing process {pid}")]
    PermissionDenied { pid: u32 },

    // Action errors (40-49)
    #[error("refusing to act on this daemon's own pid {pid}")]
    SelfPidRefused { pid: u32 },

    #[error("limit {value} is out of range; must be within (0.0, 1.0]")]
    LimitOutOfRange { value: f64 },

    #[error("action execution failed: {0}")]
    ActionFailed(String),

    // I/O errors (60-69)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Returns the stable error code for this error type.
    ///
    /// - 10-19: Configuration errors
    /// - 20-29: Collection errors
    /// - 40-49: Action errors
    /// - 60-69: I/O errors
    pub fn code(&self) -> u32 {
        match self {
            Error::Config(_) => 10,
            Error::Collection(_) => 20,
            Error::ProcessNotFound { .. } => 21,
            Error::IdentityMismatch { .. } => 22,
            Error::PermissionDenied { .. } => 23,
            Error::SelfPidRefused { .. } => 40,
            Error::LimitOutOfRange { .. } => 41,
            Error::ActionFailed(_) => 42,
            Error::Io(_) => 60,
            Error::Json(_) => 61,
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Config(_) => ErrorCategory::Config,
            Error::Collection(_)
            | Error::ProcessNotFound { .. }
            | Error::IdentityMismatch { .. }
            | Error::PermissionDenied { .. } => ErrorCategory::Collection,
            Error::SelfPidRefused { .. }
            | Error::LimitOutOfRange { .. }
            | Error::ActionFailed(_) => ErrorCategory::Action,
            Error::Io(_) | Error::Json(_) => ErrorCategory::Io,
        }
    }

    /// Returns whether this error is potentially recoverable by retrying or
    /// by changing caller-supplied input.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Error::Config(_) => true,
            Error::Collection(_) => true,
            Error::ProcessNotFound { .. } => false,
            Error::IdentityMismatch { .. } => false,
            Error::PermissionDenied { .. } => true,
            Error::SelfPidRefused { .. } => false,
            Error::LimitOutOfRange { .. } => true,
            Error::ActionFailed(_) => true,
            Error::Io(_) => true,
            Error::Json(_) => true,
        }
    }

    pub fn suggested_action(&self) -> SuggestedAction {
        match self {
            Error::Config(_) => SuggestedAction::Retry,
            Error::Collection(_) => SuggestedAction::Rescan,
            Error::ProcessNotFound { .. } => SuggestedAction::Skip,
            Error::IdentityMismatch { .. } => SuggestedAction::Rescan,
            Error::PermissionDenied { .. } => SuggestedAction::Elevate,
            Error::SelfPidRefused { .. } => SuggestedAction::Abort,
            Error::LimitOutOfRange { .. } => SuggestedAction::Retry,
            Error::ActionFailed(_) => SuggestedAction::Retry,
            Error::Io(_) => SuggestedAction::Retry,
            Error::Json(_) => SuggestedAction::Abort,
        }
    }

    pub fn remediation(&self) -> &'static str {
        match self {
            Error::Config(_) => {
                "Check the CLI flags and CPULIMIT_* environment variables for typos."
            }
            Error::Collection(_) => {
                "Retry the scan. If persistent, check /proc permissions and that procfs is mounted."
            }
            Error::ProcessNotFound { .. } => {
                "The process exited before the command could complete; this is normal for short-lived processes."
            }
            Error::IdentityMismatch { .. } => {
                "The pid was reused by a different process. Re-run discovery and retarget the new process."
            }
            Error::PermissionDenied { .. } => {
                "Run with elevated privileges: 'sudo cpulimitd' or grant the CAP_KILL capability."
            }
            Error::SelfPidRefused { .. } => {
                "The daemon never limits or signals itself. Target a different pid."
            }
            Error::LimitOutOfRange { .. } => {
                "Supply a limit greater than 0.0 and less than or equal to 1.0 (fraction of one core)."
            }
            Error::ActionFailed(_) => {
                "Retry the action. Check whether the process is already stopped or has exited."
            }
            Error::Io(_) => "Check disk space and permissions, then retry.",
            Error::Json(_) => "Invalid JSON in the snapshot or command payload.",
        }
    }

    pub fn headline(&self) -> &'static str {
        match self {
            Error::Config(_) => "Configuration Error",
            Error::Collection(_) => "Process Collection Error",
            Error::ProcessNotFound { .. } => "Process Not Found",
            Error::IdentityMismatch { .. } => "Process Identity Mismatch",
            Error::PermissionDenied { .. } => "Permission Denied",
            Error::SelfPidRefused { .. } => "Self-Pid Refused",
            Error::LimitOutOfRange { .. } => "Limit Out Of Range",
            Error::ActionFailed(_) => "Action Failed",
            Error::Io(_) => "I/O Error",
            Error::Json(_) => "JSON Parse Error",
        }
    }
}

/// Structured error response for JSON output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredError {
    pub code: u32,
    pub category: ErrorCategory,
    pub message: String,
    pub recoverable: bool,
    pub suggested_action: SuggestedAction,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub context: HashMap<String, serde_json::Value>,
}

impl From<&Error> for StructuredError {
    fn from(err: &Error) -> Self {
        let mut context = HashMap::new();
        match err {
            Error::ProcessNotFound { pid }
            | Error::IdentityMismatch { pid }
            | Error::PermissionDenied { pid }
            | Error::SelfPidRefused { pid } => {
                context.insert("pid".to_string(), serde_json::json!(pid));
            }
            Error::LimitOutOfRange { value } => {
                context.insert("value".to_string(), serde_json::json!(value));
            }
            _ => {}
        }

        StructuredError {
            code: err.code(),
            category: err.category(),
            message: err.to_string(),
            recoverable: err.is_recoverable(),
            suggested_action: err.suggested_action(),
            context,
        }
    }
}

impl StructuredError {
    pub fn to_json(&self) -> String {
        serde_json::to_string(self)
            .unwrap_or_else(|_| format!(r#"{{"code":{},"error":"serialization_failed"}}"#, self.code))
    }

    pub fn to_json_pretty(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| self.to_json())
    }
}

/// Format an error for human-readable stderr output.
///
/// ```text
/// ✗ [Headline]
///   Reason: [Error message]
///   Fix: [Remediation hint]
/// ```
pub fn format_error_human(err: &Error, use_color: bool) -> String {
    let (red, cyan, reset) = if use_color {
        ("\x1b[31m", "\x1b[36m", "\x1b[0m")
    } else {
        ("", "", "")
    };

    format!(
        "{red}✗{reset} {headline}\n  Reason: {message}\n  {cyan}Fix:{reset} {remediation}",
        red = red,
        cyan = cyan,
        reset = reset,
        headline = err.headline(),
        message = err,
        remediation = err.remediation()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_code_stable() {
        assert_eq!(Error::Config("test".into()).code(), 10);
        assert_eq!(Error::ProcessNotFound { pid: 123 }.code(), 21);
        assert_eq!(Error::LimitOutOfRange { value: 2.0 }.code(), 41);
    }

    #[test]
    fn error_category_grouping() {
        assert_eq!(Error::Config("x".into()).category(), ErrorCategory::Config);
        assert_eq!(
            Error::ProcessNotFound { pid: 1 }.category(),
            ErrorCategory::Collection
        );
        assert_eq!(
            Error::SelfPidRefused { pid: 1 }.category(),
            ErrorCategory::Action
        );
    }

    #[test]
    fn error_recoverable() {
        assert!(Error::Config("x".into()).is_recoverable());
        assert!(!Error::ProcessNotFound { pid: 1 }.is_recoverable());
        assert!(!Error::SelfPidRefused { pid: 1 }.is_recoverable());
    }

    #[test]
    fn suggested_action_maps() {
        assert_eq!(
            Error::PermissionDenied { pid: 1 }.suggested_action(),
            SuggestedAction::Elevate
        );
        assert_eq!(
            Error::ProcessNotFound { pid: 1 }.suggested_action(),
            SuggestedAction::Skip
        );
    }

    #[test]
    fn structured_error_from_error_carries_pid_context() {
        let err = Error::ProcessNotFound { pid: 12345 };
        let structured = StructuredError::from(&err);
        assert_eq!(structured.code, 21);
        assert_eq!(structured.category, ErrorCategory::Collection);
        assert!(!structured.recoverable);
        assert_eq!(
            structured.context.get("pid"),
            Some(&serde_json::json!(12345))
        );
    }

    #[test]
    fn structured_error_json_roundtrip() {
        let err = Error::LimitOutOfRange { value: 1.5 };
        let structured = StructuredError::from(&err);
        let json = structured.to_json();
        assert!(json.contains(r#""code":41"#));
        assert!(json.contains(r#""category":"action""#));
    }

    #[test]
    fn format_error_human_contains_fix() {
        let err = Error::PermissionDenied { pid: 1234 };
        let formatted = format_error_human(&err, false);
        assert!(formatted.contains("Permission Denied"));
        assert!(formatted.contains("sudo cpulimitd"));
    }
}
