//! TOML configuration.
//!
//! Every section and field has a default, so an empty file (or no file at
//! all) yields a usable configuration.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid config value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub logging: LoggingConfig,
    pub history: HistoryConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive, overridden by `RUST_LOG`
    pub level: String,
    /// Emit JSON lines instead of the human readable format
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct HistoryConfig {
    /// Threads used for per-entity reconstruction (1 = sequential)
    pub worker_threads: usize,
    /// Upper bound on log events pulled by one query, 0 = unlimited
    pub max_events: usize,
    /// Current log file of the monitoring core
    pub log_path: Option<PathBuf>,
    /// Directory holding rotated log files
    pub archive_dir: Option<PathBuf>,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            worker_threads: 4,
            max_events: 0,
            log_path: None,
            archive_dir: None,
        }
    }
}

impl HistoryConfig {
    pub fn event_limit(&self) -> Option<usize> {
        (self.max_events > 0).then_some(self.max_events)
    }
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.history.worker_threads == 0 {
            return Err(ConfigError::Invalid {
                field: "history.worker_threads",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}
