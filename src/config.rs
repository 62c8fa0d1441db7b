//! Run configuration: YAML file, defaults, and `HITAUDIT_*` environment overrides.

use std::env;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use cdp_adapter::config::parse_flag;
use cdp_adapter::CdpConfig;
use hit_tap::TapConfig;
use hitaudit_registry::SchemaRegistry;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{info, warn};

use crate::errors::ConfigError;
use crate::pages::{load_pages_csv, PageSpec};

pub const DEFAULT_CONSENT_SELECTOR: &str = "#onetrust-accept-btn-handler";

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SinkSettings {
    /// Directory holding one `<tab>.csv` per output tab.
    pub dir: PathBuf,
    pub tab: String,
}

impl Default for SinkSettings {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("./hitaudit-output"),
            tab: "hits".to_string(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub sink: SinkSettings,
    pub pages: Vec<PageSpec>,
    /// CSV page list (`page,url,duration,scroll`); takes precedence over `pages`.
    pub pages_file: Option<PathBuf>,
    /// Replaces the schema's allow-list when set.
    pub tracked_events: Option<Vec<String>>,
    pub schema: SchemaRegistry,
    /// Schema definition file; takes precedence over the inline `schema` section.
    pub schema_file: Option<PathBuf>,
    pub browser: CdpConfig,
    pub tap: TapConfig,
    pub consent_selector: String,
    pub pause_between_pages_ms: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            sink: SinkSettings::default(),
            pages: Vec::new(),
            pages_file: None,
            tracked_events: None,
            schema: SchemaRegistry::ga4_defaults(),
            schema_file: None,
            browser: CdpConfig::default(),
            tap: TapConfig::default(),
            consent_selector: DEFAULT_CONSENT_SELECTOR.to_string(),
            pause_between_pages_ms: 5_000,
        }
    }
}

impl AppConfig {
    pub fn from_yaml_str(raw: &str, origin: &Path) -> Result<Self, ConfigError> {
        serde_yaml::from_str(raw).map_err(|err| ConfigError::Parse {
            path: origin.to_path_buf(),
            reason: err.to_string(),
        })
    }

    /// The effective schema: file or inline section, then the allow-list override.
    pub fn registry(&self) -> Result<SchemaRegistry, ConfigError> {
        let registry = match &self.schema_file {
            Some(path) => SchemaRegistry::from_path(path)?,
            None => self.schema.clone(),
        };
        Ok(match &self.tracked_events {
            Some(events) => registry.with_tracked_events(events.iter().cloned()),
            None => registry,
        })
    }

    pub fn resolve_pages(&self) -> Result<Vec<PageSpec>, ConfigError> {
        match &self.pages_file {
            Some(path) => load_pages_csv(path),
            None => Ok(self.pages.clone()),
        }
    }

    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| env::var(key).ok());
    }

    fn apply_overrides_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(dir) = lookup("HITAUDIT_SINK_DIR").filter(|v| !v.trim().is_empty()) {
            self.sink.dir = PathBuf::from(dir.trim());
        }
        if let Some(raw) = lookup("HITAUDIT_HEADLESS") {
            self.browser.headless = parse_flag(&raw);
        }
        if let Some(chrome) = lookup("HITAUDIT_CHROME").filter(|v| !v.trim().is_empty()) {
            self.browser.executable = Some(PathBuf::from(chrome.trim()));
        }
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    let mut path = dirs::config_dir()?;
    path.push("hitaudit");
    path.push("config.yaml");
    Some(path)
}

pub async fn load_config(config_path: Option<&Path>) -> Result<AppConfig> {
    let config_path = match config_path {
        Some(path) => path.to_path_buf(),
        None => default_config_path().context("Failed to get config directory")?,
    };

    let mut config = if config_path.exists() {
        let content = fs::read_to_string(&config_path)
            .await
            .with_context(|| format!("Failed to read config file {}", config_path.display()))?;
        let config = AppConfig::from_yaml_str(&content, &config_path)?;
        info!("Loaded configuration from: {}", config_path.display());
        config
    } else {
        warn!(
            "Config file not found, using defaults: {}",
            config_path.display()
        );
        AppConfig::default()
    };

    config.apply_env_overrides();
    Ok(config)
}
