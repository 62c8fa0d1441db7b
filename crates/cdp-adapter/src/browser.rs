use std::fs;
use std::time::Duration;

use chromiumoxide::{Browser, BrowserConfig};
use futures::StreamExt;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::CdpConfig;
use crate::error::AdapterError;
use crate::page::ChromiumPage;

const LAUNCH_ARGS: [&str; 5] = [
    "--no-first-run",
    "--no-default-browser-check",
    "--disable-extensions",
    "--disable-sync",
    "--mute-audio",
];

/// A launched Chromium, or a connection to one that is already running.
pub struct ChromiumBrowser {
    browser: Mutex<Browser>,
    handler: JoinHandle<()>,
    launched: bool,
}

impl ChromiumBrowser {
    pub async fn start(cfg: &CdpConfig) -> Result<Self, AdapterError> {
        let (browser, mut handler, launched) = match &cfg.websocket_url {
            Some(url) => {
                let (browser, handler) = Browser::connect(url.clone())
                    .await
                    .map_err(|err| AdapterError::Launch(format!("connect to {url}: {err}")))?;
                (browser, handler, false)
            }
            None => {
                let (browser, handler) = Browser::launch(browser_config(cfg)?)
                    .await
                    .map_err(|err| AdapterError::Launch(err.to_string()))?;
                (browser, handler, true)
            }
        };

        let handler = tokio::spawn(async move {
            while let Some(step) = handler.next().await {
                if let Err(err) = step {
                    debug!(target: "cdp-browser", %err, "devtools message dropped");
                }
            }
            debug!(target: "cdp-browser", "devtools connection closed");
        });

        info!(
            target: "cdp-browser",
            ws = %browser.websocket_address(),
            launched,
            "browser ready"
        );
        Ok(Self {
            browser: Mutex::new(browser),
            handler,
            launched,
        })
    }

    pub async fn open_page(&self) -> Result<ChromiumPage, AdapterError> {
        let page = self.browser.lock().await.new_page("about:blank").await?;
        Ok(ChromiumPage::new(page))
    }

    /// Close a browser this process launched. A browser we only connected to is left running.
    pub async fn shutdown(self) {
        let mut browser = self.browser.into_inner();
        if self.launched {
            if let Err(err) = browser.close().await {
                warn!(target: "cdp-browser", %err, "browser did not close cleanly");
            }
            if let Err(err) = browser.wait().await {
                warn!(target: "cdp-browser", %err, "browser process not reaped");
            }
        }
        self.handler.abort();
    }
}

fn browser_config(cfg: &CdpConfig) -> Result<BrowserConfig, AdapterError> {
    fs::create_dir_all(&cfg.user_data_dir).map_err(|err| {
        AdapterError::Launch(format!(
            "profile dir {}: {err}",
            cfg.user_data_dir.display()
        ))
    })?;

    let mut builder = BrowserConfig::builder()
        .request_timeout(Duration::from_millis(cfg.command_timeout_ms))
        .user_data_dir(&cfg.user_data_dir)
        .args(LAUNCH_ARGS);
    if !cfg.headless {
        builder = builder.with_head();
    }
    if let Some(executable) = &cfg.executable {
        if !executable.exists() {
            return Err(AdapterError::Launch(format!(
                "no browser at {}; set HITAUDIT_CHROME",
                executable.display()
            )));
        }
        builder = builder.chrome_executable(executable);
    }
    builder.build().map_err(AdapterError::Launch)
}
