//! Whole-run coordination against a CSV sink, with observations fed by hand.

use std::fs;
use std::sync::Arc;

use hit_tap::{HitTap, TapConfig};
use hitaudit_cli::{HitTracker, TrackerError};
use hitaudit_registry::SchemaRegistry;
use hitaudit_sink::{CsvSink, SinkError};
use tokio_util::sync::CancellationToken;

const BASE: &str = "https://region1.google-analytics.com/g/collect?v=2&tid=G-TEST&cid=7.7\
&dl=https%3A%2F%2Fshop.example%2F";

#[tokio::test]
async fn two_pages_share_one_correlator() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("hits.csv"),
        "page_num,event_name,ep.currency,items.0.item_id,errors,response_status\n",
    )
    .unwrap();

    let registry = Arc::new(SchemaRegistry::ga4_defaults());
    let sink = Arc::new(CsvSink::new(dir.path()));
    let mut tracker = HitTracker::initialize(registry, sink, "hits")
        .await
        .expect("header");
    let (observer, mut streams) = HitTap::channel(&TapConfig::default());

    let view = format!("{BASE}&en=view_item&ep.currency=EUR&value=3&pr1=idSKU1~nmShoe");
    let late = format!("{BASE}&en=page_view&_s=2");

    // page 1: one complete hit, one whose response only arrives on page 2
    observer.observe_request(&view).await.unwrap();
    observer.observe_request(&late).await.unwrap();
    observer.observe_response(&view, 200, "").await.unwrap();
    observer
        .observe_request("https://example.com/not-a-hit")
        .await
        .unwrap();

    let cancel = CancellationToken::new();
    cancel.cancel();
    let page1 = tracker.page("https://shop.example/", 1);
    assert_eq!(tracker.track_page(&mut streams, &page1, &cancel).await.unwrap(), 1);
    assert_eq!(tracker.pending(), 1);

    observer.observe_response(&late, 204, "").await.unwrap();
    let page2 = tracker.page("https://shop.example/p/1", 2);
    assert_eq!(tracker.track_page(&mut streams, &page2, &cancel).await.unwrap(), 1);

    let summary = tracker.finish();
    assert_eq!(summary.total_responses, 2);
    assert_eq!(summary.success_responses, 1);
    assert_eq!(summary.failed_responses, 1);
    assert!(summary.orphaned.is_empty());

    let written = fs::read_to_string(dir.path().join("hits.csv")).unwrap();
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(written.as_bytes());
    let rows: Vec<csv::StringRecord> = rdr.records().map(Result::unwrap).collect();
    assert_eq!(rows.len(), 2);

    assert_eq!(&rows[0][0], "1");
    assert_eq!(&rows[0][1], "view_item");
    assert_eq!(&rows[0][2], "EUR");
    assert_eq!(&rows[0][3], "SKU1");
    assert_eq!(&rows[0][4], "Event parameters missing: \n - currency");
    assert_eq!(&rows[0][5], "200");

    assert_eq!(&rows[1][0], "2");
    assert_eq!(&rows[1][1], "page_view");
    assert_eq!(&rows[1][4], "");
    assert_eq!(&rows[1][5], "204");
}

#[tokio::test]
async fn missing_sink_file_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let registry = Arc::new(SchemaRegistry::ga4_defaults());
    let sink = Arc::new(CsvSink::new(dir.path()));
    let err = HitTracker::initialize(registry, sink, "hits")
        .await
        .err()
        .expect("schema fetch fails");
    assert!(matches!(err, TrackerError::Sink(SinkError::SchemaFetch { .. })));
}
