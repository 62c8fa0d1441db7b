use std::env;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::detect_chrome_executable;

/// Browser launch and page pacing settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct CdpConfig {
    /// `None` lets chromiumoxide look for an installed browser.
    pub executable: Option<PathBuf>,
    pub user_data_dir: PathBuf,
    pub headless: bool,
    /// Attach to this DevTools endpoint instead of launching a browser.
    pub websocket_url: Option<String>,
    pub command_timeout_ms: u64,
    pub load_timeout_ms: u64,
    pub consent_timeout_ms: u64,
    pub scroll_step_px: u32,
    pub scroll_interval_ms: u64,
}

impl Default for CdpConfig {
    fn default() -> Self {
        Self {
            executable: detect_chrome_executable(),
            user_data_dir: env::var_os("HITAUDIT_CHROME_PROFILE")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(".hitaudit-profile")),
            headless: env::var("HITAUDIT_HEADLESS")
                .map(|value| parse_flag(&value))
                .unwrap_or(true),
            websocket_url: None,
            command_timeout_ms: 30_000,
            load_timeout_ms: 30_000,
            consent_timeout_ms: 10_000,
            scroll_step_px: 100,
            scroll_interval_ms: 100,
        }
    }
}

/// Anything but an explicit "off" counts as on.
pub fn parse_flag(value: &str) -> bool {
    !matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "0" | "false" | "no" | "off"
    )
}
