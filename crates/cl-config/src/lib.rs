//! Configuration resolution for the CPU limiter daemon.
//!
//! Provides:
//! - Typed [`Settings`] for the sampler/estimator/controller tunables
//! - Resolution order CLI -> env -> XDG -> system -> built-in defaults

pub mod resolve;
pub mod settings;

pub use resolve::{load_settings, resolve_config_path, ConfigSource};
pub use settings::Settings;
