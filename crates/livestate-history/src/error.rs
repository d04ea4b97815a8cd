use livestate_common::ConfigError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum HistoryError {
    #[error("Log source unavailable: {path}: {source}")]
    LogUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to read log {path}: {source}")]
    LogRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("No log file or archive directory configured")]
    NoLogConfigured,
    #[error("Invalid query window: start {start} is not before end {end}")]
    InvalidWindow { start: i64, end: i64 },
    #[error("Query exceeded the limit of {limit} log events")]
    EventLimitExceeded { limit: usize },
    #[error("Reconstruction worker panicked")]
    WorkerPanicked,
    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub type Result<T> = std::result::Result<T, HistoryError>;
