//! Counters for what the browser side saw: collection hits and page loads.

use std::time::Duration;

use lazy_static::lazy_static;
use prometheus::{Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry};
use tracing::warn;

use crate::error::AdapterError;

lazy_static! {
    static ref HIT_REQUESTS: IntCounter = IntCounter::new(
        "hitaudit_cdp_hit_requests_total",
        "Collection requests seen on the wire"
    )
    .unwrap();
    static ref HIT_RESPONSES: IntCounterVec = IntCounterVec::new(
        Opts::new(
            "hitaudit_cdp_hit_responses_total",
            "Collection responses forwarded, by whether the body could be read"
        ),
        &["body"]
    )
    .unwrap();
    static ref NAVIGATIONS: IntCounterVec = IntCounterVec::new(
        Opts::new("hitaudit_cdp_navigations_total", "Page loads by outcome"),
        &["outcome"]
    )
    .unwrap();
    static ref NAVIGATION_SECONDS: Histogram = Histogram::with_opts(
        HistogramOpts::new("hitaudit_cdp_navigation_seconds", "Time until the load event")
            .buckets(vec![0.5, 1.0, 2.0, 5.0, 10.0, 20.0, 30.0])
    )
    .unwrap();
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AdapterMetricsSnapshot {
    pub hit_requests: u64,
    pub hit_responses: u64,
    pub missing_bodies: u64,
    pub navigations: u64,
    pub failed_navigations: u64,
}

pub fn register_metrics(registry: &Registry) {
    let collectors: [Box<dyn prometheus::core::Collector>; 4] = [
        Box::new(HIT_REQUESTS.clone()),
        Box::new(HIT_RESPONSES.clone()),
        Box::new(NAVIGATIONS.clone()),
        Box::new(NAVIGATION_SECONDS.clone()),
    ];
    for collector in collectors {
        match registry.register(collector) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(err) => warn!(target: "cdp-browser", %err, "metric not registered"),
        }
    }
}

pub fn record_hit_request() {
    HIT_REQUESTS.inc();
}

pub fn record_hit_response(body_read: bool) {
    let label = if body_read { "read" } else { "missing" };
    HIT_RESPONSES.with_label_values(&[label]).inc();
}

pub fn record_navigation(outcome: &Result<(), AdapterError>, elapsed: Duration) {
    let label = match outcome {
        Ok(()) => "loaded",
        Err(err) if err.is_timeout() => "timeout",
        Err(_) => "failed",
    };
    NAVIGATIONS.with_label_values(&[label]).inc();
    if outcome.is_ok() {
        NAVIGATION_SECONDS.observe(elapsed.as_secs_f64());
    }
}

pub fn snapshot() -> AdapterMetricsSnapshot {
    let read = HIT_RESPONSES.with_label_values(&["read"]).get();
    let missing = HIT_RESPONSES.with_label_values(&["missing"]).get();
    let loaded = NAVIGATIONS.with_label_values(&["loaded"]).get();
    let failed = NAVIGATIONS.with_label_values(&["failed"]).get()
        + NAVIGATIONS.with_label_values(&["timeout"]).get();
    AdapterMetricsSnapshot {
        hit_requests: HIT_REQUESTS.get(),
        hit_responses: read + missing,
        missing_bodies: missing,
        navigations: loaded + failed,
        failed_navigations: failed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_tracks_hits_and_loads() {
        let before = snapshot();
        record_hit_request();
        record_hit_response(false);
        record_navigation(&Ok(()), Duration::from_millis(800));
        record_navigation(&Err(AdapterError::Script("x".into())), Duration::ZERO);
        let after = snapshot();
        assert!(after.hit_requests > before.hit_requests);
        assert!(after.missing_bodies > before.missing_bodies);
        assert!(after.hit_responses > before.hit_responses);
        assert!(after.navigations >= before.navigations + 2);
        assert!(after.failed_navigations > before.failed_navigations);
    }
}
