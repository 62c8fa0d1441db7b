//! Drives the browser through the configured pages while the tracker records hits.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use cdp_adapter::{ChromiumBrowser, PageSession};
use hit_tap::{HitTap, ObservationStreams, Observer};
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::config::AppConfig;
use crate::pages::PageSpec;
use crate::sinks::open_sink;
use crate::tracker::{HitTracker, RunSummary};

const SETTLE: Duration = Duration::from_secs(1);

#[derive(Clone, Debug, Default)]
pub struct RunOptions {
    pub dry_run: bool,
    pub headful: bool,
    pub ws_url: Option<String>,
}

pub async fn run_audit(mut config: AppConfig, opts: RunOptions) -> Result<RunSummary> {
    if opts.headful {
        config.browser.headless = false;
    }
    if let Some(ws_url) = opts.ws_url {
        config.browser.websocket_url = Some(ws_url);
    }

    let registry = Arc::new(config.registry().context("failed to load schema")?);
    let pages = config.resolve_pages().context("failed to load page list")?;
    if pages.is_empty() {
        bail!("no pages configured; set `pages` or `pages_file`");
    }

    let sink = open_sink(&config.sink, opts.dry_run);
    let mut tracker = HitTracker::initialize(registry, sink, config.sink.tab.clone())
        .await
        .context("cannot map rows without the sink header")?;

    let browser = ChromiumBrowser::start(&config.browser)
        .await
        .context("failed to start browser")?;

    let shutdown = CancellationToken::new();
    let ctrl_c = {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!(target: "tracker", "interrupted; finishing current page");
                shutdown.cancel();
            }
        })
    };

    let (observer, mut streams) = HitTap::channel(&config.tap);
    let driven = drive_pages(
        &config,
        &pages,
        &browser,
        observer,
        &mut streams,
        &mut tracker,
        &shutdown,
    )
    .await;

    ctrl_c.abort();
    browser.shutdown().await;

    let summary = tracker.finish();
    summary.log();
    driven.map(|_| summary)
}

async fn drive_pages(
    config: &AppConfig,
    pages: &[PageSpec],
    browser: &ChromiumBrowser,
    observer: Observer,
    streams: &mut ObservationStreams,
    tracker: &mut HitTracker,
    shutdown: &CancellationToken,
) -> Result<()> {
    for (index, page) in pages.iter().enumerate() {
        let page_num = index as u32 + 1;
        let meta = tracker.page(&page.url, page_num);
        info!(target: "tracker", page = %page.page, url = %page.url, page_num, "Starting tracking");

        let tab = browser
            .open_page()
            .await
            .with_context(|| format!("failed to open a tab for {}", page.url))?;
        let session = PageSession::open(Arc::new(tab), observer.clone())
            .await
            .with_context(|| format!("failed to watch the tab for {}", page.url))?;

        let end_of_page = CancellationToken::new();
        let driver = {
            let end_of_page = end_of_page.clone();
            async move {
                tokio::select! {
                    _ = visit(&session, page, index == 0, config) => {}
                    _ = shutdown.cancelled() => {}
                }
                if let Err(err) = session.close().await {
                    warn!(target: "tracker", %err, "failed to close page");
                }
                end_of_page.cancel();
                Ok::<_, anyhow::Error>(())
            }
        };
        let tracked = async {
            tracker
                .track_page(streams, &meta, &end_of_page)
                .await
                .context("page aborted")
        };
        tokio::try_join!(driver, tracked)?;

        if shutdown.is_cancelled() {
            break;
        }
        if page_num < pages.len() as u32 {
            sleep(Duration::from_millis(config.pause_between_pages_ms)).await;
        }
    }
    Ok(())
}

/// Load the page, interact with it, and stay for the configured dwell. Failures are logged.
async fn visit(session: &PageSession, page: &PageSpec, first: bool, config: &AppConfig) {
    let browser = &config.browser;
    if let Err(err) = session
        .navigate(&page.url, Duration::from_millis(browser.load_timeout_ms))
        .await
    {
        error!(
            target: "tracker",
            url = %page.url,
            timed_out = err.is_timeout(),
            %err,
            "Error during tracking"
        );
        return;
    }

    if first && !config.consent_selector.is_empty() {
        match session
            .dismiss_consent(
                &config.consent_selector,
                Duration::from_millis(browser.consent_timeout_ms),
            )
            .await
        {
            Ok(true) => sleep(SETTLE).await,
            Ok(false) => info!(target: "tracker", "no consent banner found"),
            Err(err) => warn!(target: "tracker", %err, "consent dismissal failed"),
        }
    }

    if page.scroll {
        if let Err(err) = session
            .scroll_to_bottom(browser.scroll_step_px, browser.scroll_interval_ms)
            .await
        {
            warn!(target: "tracker", %err, "scroll failed");
        }
    }

    sleep(SETTLE).await;
    sleep(Duration::from_millis(page.duration_ms)).await;
}
