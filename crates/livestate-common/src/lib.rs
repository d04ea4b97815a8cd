//! Shared plumbing for the livestate crates: configuration and logging.

pub mod config;
pub mod logging;

pub use config::{Config, ConfigError, HistoryConfig, LoggingConfig};
