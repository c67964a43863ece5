//! Configuration resolution and path discovery.
//!
//! Resolution order: CLI arguments -> environment variables -> XDG config
//! file -> system config file -> built-in defaults.

use crate::settings::Settings;
use std::path::{Path, PathBuf};

/// Where a setting's value ultimately came from, for diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ConfigSource {
    CliArgument,
    Environment,
    XdgConfig,
    SystemConfig,
    #[default]
    BuiltinDefault,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::CliArgument => write!(f, "CLI argument"),
            ConfigSource::Environment => write!(f, "environment variable"),
            ConfigSource::XdgConfig => write!(f, "XDG config"),
            ConfigSource::SystemConfig => write!(f, "system config"),
            ConfigSource::BuiltinDefault => write!(f, "builtin default"),
        }
    }
}

const ENV_CONFIG_PATH: &str = "CPULIMIT_CONFIG";
const CONFIG_FILENAME: &str = "cpulimit.json";
const APP_NAME: &str = "cpulimit";

/// Resolve the settings file path using the standard resolution order:
/// 1. Explicit CLI path (if provided)
/// 2. `CPULIMIT_CONFIG` environment variable
/// 3. XDG config directory (`~/.config/cpulimit/cpulimit.json`)
/// 4. System config (`/etc/cpulimit/cpulimit.json`)
/// 5. None (built-in defaults apply)
pub fn resolve_config_path(cli_path: Option<&Path>) -> (Option<PathBuf>, ConfigSource) {
    if let Some(path) = cli_path {
        if path.exists() {
            return (Some(path.to_path_buf()), ConfigSource::CliArgument);
        }
    }

    if let Ok(env_path) = std::env::var(ENV_CONFIG_PATH) {
        let path = PathBuf::from(env_path);
        if path.exists() {
            return (Some(path), ConfigSource::Environment);
        }
    }

    if let Some(xdg_config) = dirs::config_dir() {
        let path = xdg_config.join(APP_NAME).join(CONFIG_FILENAME);
        if path.exists() {
            return (Some(path), ConfigSource::XdgConfig);
        }
    }

    let system_path = PathBuf::from("/etc").join(APP_NAME).join(CONFIG_FILENAME);
    if system_path.exists() {
        return (Some(system_path), ConfigSource::SystemConfig);
    }

    (None, ConfigSource::BuiltinDefault)
}

/// Load settings from the resolved file (if any), falling back to defaults
/// for any field the file omits or when no file was found.
pub fn load_settings(cli_path: Option<&Path>) -> Result<(Settings, ConfigSource), cl_common::Error> {
    let (path, source) = resolve_config_path(cli_path);
    let settings = match path {
        Some(p) => {
            let content = std::fs::read_to_string(&p)?;
            serde_json::from_str(&content)
                .map_err(|e| cl_common::Error::Config(format!("{}: {}", p.display(), e)))?
        }
        None => Settings::default(),
    };
    settings
        .validate()
        .map_err(cl_common::Error::Config)?;
    Ok((settings, source))
}

pub fn xdg_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(APP_NAME))
}

pub fn system_config_dir() -> PathBuf {
    PathBuf::from("/etc").join(APP_NAME)
}
