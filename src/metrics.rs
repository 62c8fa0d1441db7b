use std::path::Path;

use anyhow::{Context, Result};
use cdp_adapter::metrics as cdp_metrics;
use lazy_static::lazy_static;
use once_cell::sync::{Lazy, OnceCell};
use prometheus::{Encoder, IntCounter, IntCounterVec, Registry, TextEncoder};
use tracing::error;

static GLOBAL_REGISTRY: Lazy<Registry> = Lazy::new(Registry::new);
static REGISTER_ONCE: OnceCell<()> = OnceCell::new();

lazy_static! {
    static ref HITS_TOTAL: IntCounterVec = IntCounterVec::new(
        prometheus::Opts::new("hitaudit_hits_total", "Collection hits seen by outcome"),
        &["outcome"]
    )
    .unwrap();
    static ref ROWS_APPENDED_TOTAL: IntCounter =
        IntCounter::new("hitaudit_rows_appended_total", "Rows written to the sink").unwrap();
    static ref APPEND_FAILURES_TOTAL: IntCounter = IntCounter::new(
        "hitaudit_append_failures_total",
        "Rows the sink refused"
    )
    .unwrap();
}

/// How a request observation was disposed of.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HitOutcome {
    Malformed,
    Unnamed,
    Untracked,
    Tracked,
}

impl HitOutcome {
    fn label(self) -> &'static str {
        match self {
            HitOutcome::Malformed => "malformed",
            HitOutcome::Unnamed => "unnamed",
            HitOutcome::Untracked => "untracked",
            HitOutcome::Tracked => "tracked",
        }
    }
}

pub fn register_metrics() {
    REGISTER_ONCE.get_or_init(|| {
        let registry = global_registry();
        cdp_metrics::register_metrics(registry);
        for collector in [
            Box::new(HITS_TOTAL.clone()) as Box<dyn prometheus::core::Collector>,
            Box::new(ROWS_APPENDED_TOTAL.clone()),
            Box::new(APPEND_FAILURES_TOTAL.clone()),
        ] {
            if let Err(err) = registry.register(collector) {
                error!(?err, "failed to register tracker metric");
            }
        }
    });
}

pub fn global_registry() -> &'static Registry {
    &GLOBAL_REGISTRY
}

pub fn record_hit(outcome: HitOutcome) {
    HITS_TOTAL.with_label_values(&[outcome.label()]).inc();
}

pub fn record_append(ok: bool) {
    if ok {
        ROWS_APPENDED_TOTAL.inc();
    } else {
        APPEND_FAILURES_TOTAL.inc();
    }
}

pub fn render() -> Result<String> {
    register_metrics();
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder
        .encode(&global_registry().gather(), &mut buffer)
        .context("failed to encode prometheus metrics")?;
    String::from_utf8(buffer).context("metrics are not utf-8")
}

pub async fn write_to(path: &Path) -> Result<()> {
    let body = render()?;
    tokio::fs::write(path, body)
        .await
        .with_context(|| format!("failed to write metrics to {}", path.display()))
}
