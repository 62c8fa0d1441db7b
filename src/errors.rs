//! Error types for the coordinating task and configuration loading.

use std::path::PathBuf;

use hitaudit_registry::RegistryError;
use hitaudit_sink::SinkError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TrackerError {
    /// Header fetch or row append failed; the run cannot produce trustworthy output.
    #[error(transparent)]
    Sink(#[from] SinkError),
    #[error("append task aborted: {0}")]
    AppendTask(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {reason}")]
    Parse { path: PathBuf, reason: String },
    #[error("{path}, row {row}: {reason}")]
    PageRow {
        path: PathBuf,
        row: usize,
        reason: String,
    },
    #[error(transparent)]
    Registry(#[from] RegistryError),
}
