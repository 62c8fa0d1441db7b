use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use hit_tap::{Observer, TapError};
use serde_json::Value;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{sleep, timeout, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::AdapterError;
use crate::events::{PageEvent, PageEventStreams};
use crate::metrics;
use crate::page::HitPage;

const CONSENT_POLL: Duration = Duration::from_millis(250);

/// One audited tab.
///
/// While open, every collection hit the tab sends is forwarded to the [`Observer`]: the request
/// as soon as it is issued, the response once its body has been read.
pub struct PageSession {
    page: Arc<dyn HitPage>,
    cancel: CancellationToken,
    pump: Option<JoinHandle<()>>,
}

impl PageSession {
    pub async fn open(page: Arc<dyn HitPage>, observer: Observer) -> Result<Self, AdapterError> {
        let streams = page.event_streams().await?;
        let cancel = CancellationToken::new();
        let pump = HitPump {
            page: page.clone(),
            observer,
            in_flight: HashMap::new(),
            bodies: JoinSet::new(),
        };
        let pump = tokio::spawn(pump.run(streams, cancel.clone()));
        debug!(target: "cdp-session", "page session opened");
        Ok(Self {
            page,
            cancel,
            pump: Some(pump),
        })
    }

    /// Navigate and wait for the load event, at most `wait`.
    pub async fn navigate(&self, url: &str, wait: Duration) -> Result<(), AdapterError> {
        let started = Instant::now();
        let outcome = match timeout(wait, self.page.navigate(url)).await {
            Ok(result) => result,
            Err(_) => Err(AdapterError::NavTimeout {
                url: url.to_string(),
                waited: wait,
            }),
        };
        metrics::record_navigation(&outcome, started.elapsed());
        outcome
    }

    pub async fn evaluate(&self, expression: &str, await_promise: bool) -> Result<Value, AdapterError> {
        self.page.evaluate(expression, await_promise).await
    }

    /// Click the consent button once it shows up. Returns `false` if it never did.
    pub async fn dismiss_consent(&self, selector: &str, wait: Duration) -> Result<bool, AdapterError> {
        let script = consent_script(selector);
        let deadline = Instant::now() + wait;
        loop {
            match self.evaluate(&script, false).await {
                Ok(Value::Bool(true)) => {
                    info!(target: "cdp-session", %selector, "consent dismissed");
                    return Ok(true);
                }
                Ok(_) => {}
                Err(AdapterError::Script(reason)) => {
                    debug!(target: "cdp-session", %reason, "consent check threw");
                }
                Err(err) => return Err(err),
            }
            if Instant::now() + CONSENT_POLL > deadline {
                return Ok(false);
            }
            sleep(CONSENT_POLL).await;
        }
    }

    /// Scroll down in fixed steps until the page height has been covered.
    pub async fn scroll_to_bottom(&self, step_px: u32, interval_ms: u64) -> Result<(), AdapterError> {
        let scrolled = self.evaluate(&scroll_script(step_px, interval_ms), true).await?;
        debug!(target: "cdp-session", %scrolled, "scrolled to bottom");
        Ok(())
    }

    /// Stop forwarding, wait for pending body reads, then close the tab.
    pub async fn close(mut self) -> Result<(), AdapterError> {
        self.cancel.cancel();
        if let Some(pump) = self.pump.take() {
            if let Err(err) = pump.await {
                warn!(target: "cdp-session", ?err, "hit pump panicked");
            }
        }
        self.page.close().await
    }
}

impl Drop for PageSession {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

struct InFlight {
    url: String,
    status: i64,
}

/// Turns the tab's network events into tap observations, one collection request at a time.
struct HitPump {
    page: Arc<dyn HitPage>,
    observer: Observer,
    in_flight: HashMap<String, InFlight>,
    bodies: JoinSet<()>,
}

impl HitPump {
    async fn run(mut self, mut streams: PageEventStreams, cancel: CancellationToken) {
        loop {
            // earlier lifecycle stages first, so a request is always known before it completes
            let event = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                Some(event) = streams.requests.next() => event,
                Some(event) = streams.responses.next() => event,
                Some(event) = streams.completions.next() => event,
            };
            if let Err(err) = self.handle(event).await {
                debug!(target: "cdp-session", %err, "observer closed; stopping pump");
                break;
            }
        }

        while let Some(result) = self.bodies.join_next().await {
            if let Err(err) = result {
                warn!(target: "cdp-session", ?err, "body read task failed");
            }
        }
    }

    async fn handle(&mut self, event: PageEvent) -> Result<(), TapError> {
        match event {
            PageEvent::RequestWillBeSent { request_id, url } => {
                if self.observer.observe_request(&url).await? {
                    metrics::record_hit_request();
                    self.in_flight.insert(request_id, InFlight { url, status: 0 });
                }
            }
            PageEvent::ResponseReceived { request_id, status } => {
                if let Some(hit) = self.in_flight.get_mut(&request_id) {
                    hit.status = status;
                }
            }
            PageEvent::LoadingFinished { request_id } => {
                if let Some(hit) = self.in_flight.remove(&request_id) {
                    self.read_body(request_id, hit);
                }
            }
            PageEvent::LoadingFailed {
                request_id,
                error_text,
            } => {
                if let Some(hit) = self.in_flight.remove(&request_id) {
                    debug!(target: "cdp-session", url = %hit.url, %error_text, "collection request failed");
                }
            }
        }
        Ok(())
    }

    fn read_body(&mut self, request_id: String, hit: InFlight) {
        let page = self.page.clone();
        let observer = self.observer.clone();
        self.bodies.spawn(async move {
            let body = match page.response_body(&request_id).await {
                Ok(body) => {
                    metrics::record_hit_response(true);
                    body.into_text()
                }
                Err(err) => {
                    debug!(target: "cdp-session", %err, url = %hit.url, "response body unavailable");
                    metrics::record_hit_response(false);
                    String::new()
                }
            };
            if let Err(err) = observer.observe_response(&hit.url, hit.status, body).await {
                debug!(target: "cdp-session", %err, "response dropped");
            }
        });
    }
}

fn consent_script(selector: &str) -> String {
    let selector = Value::String(selector.to_string());
    format!(
        "(() => {{ const el = document.querySelector({selector}); \
         if (!el) return false; el.click(); return true; }})()"
    )
}

fn scroll_script(step_px: u32, interval_ms: u64) -> String {
    format!(
        "new Promise(resolve => {{ let total = 0; const timer = setInterval(() => {{ \
         const height = document.body ? document.body.scrollHeight : 0; \
         window.scrollBy(0, {step_px}); total += {step_px}; \
         if (total >= height) {{ clearInterval(timer); resolve(total); }} \
         }}, {interval_ms}); }})"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn consent_script_quotes_selector() {
        let script = consent_script("button[data-x=\"y\"]");
        assert!(script.contains(r#"document.querySelector("button[data-x=\"y\"]")"#));
    }

    #[test]
    fn scroll_script_uses_step_and_interval() {
        let script = scroll_script(100, 50);
        assert!(script.contains("window.scrollBy(0, 100)"));
        assert!(script.contains("}, 50);"));
    }
}
