//! Output format specifications for the CLI.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Supported output formats for `cpulimitctl` commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Aligned plain-text table (default, for interactive terminals).
    #[default]
    Table,

    /// Structured JSON (for machine consumption / scripting).
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Table => write!(f, "table"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

/// Unit convention used when reporting CPU usage to a human or to JSON.
///
/// Internally usage is always tracked as a fraction of one core (see
/// `cl_core::estimator`). This type controls only how it is scaled for
/// presentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UsageScale {
    /// Percentage of a single core (100.0 = one core fully busy).
    #[default]
    PerCore,

    /// Percentage of total system capacity (100.0 = all cores fully busy).
    System,
}

impl UsageScale {
    /// Scale a fraction-of-one-core usage value (e.g. 1.5 = 150% of one
    /// core) into the requested presentation percentage.
    pub fn scale(&self, usage_cores: f64, online_cpus: u32) -> f64 {
        let online_cpus = online_cpus.max(1) as f64;
        match self {
            UsageScale::PerCore => usage_cores * 100.0,
            UsageScale::System => (usage_cores / online_cpus) * 100.0,
        }
    }
}
