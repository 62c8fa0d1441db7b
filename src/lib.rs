//! hitaudit library
//!
//! Exposes the run coordinator and configuration for the binary and integration tests.

pub mod config;
pub mod errors;
pub mod metrics;
pub mod pages;
pub mod runner;
pub mod sinks;
pub mod tracker;

pub use config::{load_config, AppConfig, SinkSettings};
pub use errors::{ConfigError, TrackerError};
pub use pages::PageSpec;
pub use runner::{run_audit, RunOptions};
pub use tracker::{HitTracker, RunSummary};
