//! JSON configuration for the `cidchain` binary.
//!
//! Lookup order: `--config`, then `$CIDCHAIN_CONFIG`, then
//! `<config dir>/cidchain/config.json`. Without any file the defaults apply.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use cidchain_exec::{Detector, Invocation, Language, RuntimeTable, DEFAULT_TIMEOUT};

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "CIDCHAIN_CONFIG";

/// Environment variable overriding `timeout_ms`.
pub const TIMEOUT_ENV: &str = "CIDCHAIN_TIMEOUT_MS";

/// Environment variable holding the log filter.
pub const LOG_ENV: &str = "CIDCHAIN_LOG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("server '{name}' needs exactly one of `source` or `source_file`")]
    ServerSource { name: String },

    #[error("invalid {var} value '{value}'")]
    InvalidEnv { var: &'static str, value: String },
}

fn enabled() -> bool {
    true
}

/// One server declared in the config file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    pub name: String,
    pub language: Language,
    /// Inline program source.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Program source file, relative to the config file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_file: Option<PathBuf>,
    #[serde(default = "enabled")]
    pub supports_chaining: bool,
    #[serde(default = "enabled")]
    pub usable_in_chain: bool,
}

/// Where a server's source comes from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ServerSource<'a> {
    Inline(&'a str),
    File(PathBuf),
}

impl ServerConfig {
    /// The server's source, with files resolved against `base_dir`.
    pub fn source(&self, base_dir: &Path) -> Result<ServerSource<'_>, ConfigError> {
        match (&self.source, &self.source_file) {
            (Some(source), None) => Ok(ServerSource::Inline(source.as_str())),
            (None, Some(file)) => Ok(ServerSource::File(base_dir.join(file))),
            _ => Err(ConfigError::ServerSource {
                name: self.name.clone(),
            }),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Per-invocation deadline in milliseconds.
    pub timeout_ms: u64,
    /// Content sniffing order for CIDs without an extension.
    pub detection_order: Vec<Language>,
    /// Interpreter overrides; unlisted languages keep their defaults.
    pub runtimes: BTreeMap<Language, Invocation>,
    pub servers: Vec<ServerConfig>,
    /// Files loaded into the store at startup.
    pub content: Vec<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_TIMEOUT.as_millis() as u64,
            detection_order: Detector::standard().order().to_vec(),
            runtimes: BTreeMap::new(),
            servers: Vec::new(),
            content: Vec::new(),
        }
    }
}

/// A config together with where it came from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoadedConfig {
    pub config: Config,
    /// The file it was read from, if any.
    pub path: Option<PathBuf>,
    /// Directory relative paths are resolved against.
    pub base_dir: PathBuf,
}

impl Config {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Find the config file to use, if any.
    pub fn locate(explicit: Option<&Path>) -> Option<PathBuf> {
        if let Some(path) = explicit {
            return Some(path.to_path_buf());
        }
        if let Some(path) = std::env::var_os(CONFIG_ENV) {
            return Some(PathBuf::from(path));
        }
        dirs::config_dir()
            .map(|dir| dir.join("cidchain").join("config.json"))
            .filter(|path| path.is_file())
    }

    /// Locate and read the config, falling back to defaults.
    pub fn load(explicit: Option<&Path>) -> Result<LoadedConfig, ConfigError> {
        match Self::locate(explicit) {
            Some(path) => {
                let config = Self::from_file(&path)?;
                let base_dir = path
                    .parent()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| PathBuf::from("."));
                tracing::debug!(
                    path = %path.display(),
                    servers = config.servers.len(),
                    "loaded config"
                );
                Ok(LoadedConfig {
                    config,
                    path: Some(path),
                    base_dir,
                })
            }
            None => Ok(LoadedConfig {
                config: Config::default(),
                path: None,
                base_dir: PathBuf::from("."),
            }),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn detector(&self) -> Detector {
        Detector::with_order(self.detection_order.clone())
    }

    /// The standard table with this config's overrides applied.
    pub fn runtime_table(&self) -> RuntimeTable {
        self.runtimes
            .iter()
            .fold(RuntimeTable::standard(), |table, (language, invocation)| {
                table.with(*language, invocation.clone())
            })
    }
}

/// Pick the effective timeout: the flag, else the environment, else the file.
pub fn effective_timeout_ms(
    configured: u64,
    env: Option<&str>,
    flag: Option<u64>,
) -> Result<u64, ConfigError> {
    if let Some(ms) = flag {
        return Ok(ms);
    }
    match env {
        Some(value) => value.trim().parse().map_err(|_| ConfigError::InvalidEnv {
            var: TIMEOUT_ENV,
            value: value.to_string(),
        }),
        None => Ok(configured),
    }
}
