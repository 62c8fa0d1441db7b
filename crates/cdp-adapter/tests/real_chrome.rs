//! Drives a real Chromium. Skipped unless `HITAUDIT_USE_REAL_CHROME=1`.
//!
//! ```bash
//! export HITAUDIT_USE_REAL_CHROME=1
//! export HITAUDIT_CHROME=/usr/bin/google-chrome
//! cargo test -p cdp-adapter --test real_chrome -- --nocapture
//! ```

use std::env;
use std::sync::Arc;
use std::time::Duration;

use cdp_adapter::{CdpConfig, ChromiumBrowser, PageSession};
use hit_tap::{HitTap, TapConfig};

fn should_run_real_tests() -> bool {
    env::var("HITAUDIT_USE_REAL_CHROME")
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

#[tokio::test]
async fn opens_page_and_navigates() {
    if !should_run_real_tests() {
        println!("skipping real chrome test (HITAUDIT_USE_REAL_CHROME not set)");
        return;
    }

    let profile = tempfile::tempdir().expect("temporary profile");
    let cfg = CdpConfig {
        headless: true,
        user_data_dir: profile.path().into(),
        ..CdpConfig::default()
    };

    let browser = ChromiumBrowser::start(&cfg).await.expect("chromium starts");
    let page = browser.open_page().await.expect("blank tab");

    let (observer, _streams) = HitTap::channel(&TapConfig::default());
    let session = PageSession::open(Arc::new(page), observer)
        .await
        .expect("page session");
    session
        .navigate("data:text/html,<h1>hitaudit</h1>", Duration::from_secs(15))
        .await
        .expect("navigation completes");
    let clicked = session
        .dismiss_consent("#onetrust-accept-btn-handler", Duration::from_millis(500))
        .await
        .expect("consent check runs");
    assert!(!clicked);

    session.close().await.expect("close page");
    browser.shutdown().await;
}
