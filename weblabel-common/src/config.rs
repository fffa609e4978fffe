//! Bootstrap configuration loading and root folder resolution
//!
//! Settings sources, highest priority first:
//! 1. Command-line arguments
//! 2. Environment variables (`WEBLABEL_ROOT_FOLDER`)
//! 3. TOML configuration file
//! 4. Built-in defaults
//!
//! The TOML file is read once at startup; changes need a restart.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::{Error, Result};

/// Environment variable overriding the discovery root
pub const ROOT_FOLDER_ENV: &str = "WEBLABEL_ROOT_FOLDER";

/// Bootstrap configuration loaded from TOML
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Directory holding one sub-directory per signal file
    #[serde(default)]
    pub root_folder: Option<PathBuf>,

    /// HTTP server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Address the HTTP server binds to
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Frontend asset directory served under `/`
    #[serde(default)]
    pub static_assets: Option<PathBuf>,

    /// Number of auxiliary vectors every file must provide
    #[serde(default)]
    pub expected_aux_vectors: Option<usize>,

    /// Logging configuration (optional)
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            root_folder: None,
            port: default_port(),
            bind_address: default_bind_address(),
            static_assets: None,
            expected_aux_vectors: None,
            logging: LoggingConfig::default(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl LoggingConfig {
    /// `EnvFilter` directive applying the level to weblabel and HTTP tracing
    pub fn filter_directive(&self) -> String {
        let level = &self.level;
        format!("weblabel_server={level},weblabel_common={level},tower_http={level}")
    }
}

fn default_port() -> u16 {
    8080
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Default TOML location: `<config_dir>/weblabel/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("weblabel").join("config.toml"))
}

/// Parse a TOML config file.
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Cannot read {}: {}", path.display(), e)))?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Invalid TOML in {}: {}", path.display(), e)))
}

/// Bootstrap config plus the file it came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapConfig {
    pub toml: TomlConfig,
    /// `None` when built-in defaults were used
    pub source: Option<PathBuf>,
}

/// Load the bootstrap config.
///
/// An explicitly given file must exist and parse. Without one, the default
/// location is tried; a missing default file falls back to built-in defaults.
pub fn load_bootstrap_config(explicit: Option<&Path>) -> Result<BootstrapConfig> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => match default_config_path() {
            Some(path) if path.exists() => path,
            _ => {
                return Ok(BootstrapConfig {
                    toml: TomlConfig::default(),
                    source: None,
                })
            }
        },
    };

    Ok(BootstrapConfig {
        toml: load_toml_config(&path)?,
        source: Some(path),
    })
}

/// Resolve the discovery root: CLI > environment > TOML > built-in default
pub fn resolve_root_folder(cli_arg: Option<&Path>, config: &TomlConfig) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    if let Ok(path) = std::env::var(ROOT_FOLDER_ENV) {
        if !path.is_empty() {
            return PathBuf::from(path);
        }
    }

    if let Some(path) = &config.root_folder {
        return path.clone();
    }

    default_root_folder()
}

/// OS-dependent default discovery root
pub fn default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("weblabel"))
        .unwrap_or_else(|| PathBuf::from("./weblabel_data"))
}
