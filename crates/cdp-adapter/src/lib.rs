//! Chromium driver for hitaudit.
//!
//! Opens one tab per audited page and forwards that tab's collection traffic to a
//! [`hit_tap::Observer`]. Requests are only watched, never intercepted.

use std::env;
use std::path::PathBuf;

use chromiumoxide::detection::{self, DetectionOptions};

pub mod browser;
pub mod config;
pub mod error;
pub mod events;
pub mod metrics;
pub mod page;
pub mod session;

pub use browser::ChromiumBrowser;
pub use config::CdpConfig;
pub use error::AdapterError;
pub use events::{PageEvent, PageEventStreams, ResponseBody};
pub use page::{ChromiumPage, HitPage};
pub use session::PageSession;

/// `HITAUDIT_CHROME` if it names an existing file, otherwise chromiumoxide's own detection.
pub fn detect_chrome_executable() -> Option<PathBuf> {
    let configured = env::var_os("HITAUDIT_CHROME")
        .map(PathBuf::from)
        .filter(|path| path.is_file());
    configured.or_else(|| detection::default_executable(DetectionOptions::default()).ok())
}
