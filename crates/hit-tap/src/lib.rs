//! Network tap for analytics collection hits.
//!
//! The browser collaborator reports every request and response it sees through an
//! [`Observer`]. Only URLs matching a configured collection endpoint are forwarded, on two
//! independent channels (requests, responses) that a single coordinating task drains. That task
//! owns the [`Correlator`], so correlation needs no locking.

pub mod config;
pub mod correlator;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::trace;

use hitaudit_core_types::{timestamp_now, ResponseRecord};

pub use crate::config::TapConfig;
pub use crate::correlator::Correlator;

/// Errors emitted by the tap surface.
#[derive(Clone, Debug, Error)]
pub enum TapError {
    #[error("observation channel closed")]
    ChannelClosed,
}

/// An outbound collection request as first seen on the wire.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservedRequest {
    pub url: String,
    pub timestamp: String,
}

/// The response to a collection request, body already read.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservedResponse {
    pub url: String,
    pub status: i64,
    pub body: String,
    pub timestamp: String,
}

impl ObservedResponse {
    pub fn into_record(self) -> ResponseRecord {
        ResponseRecord::at(self.status, self.body, self.timestamp)
    }
}

/// Substring matcher for collection endpoints.
#[derive(Clone, Debug)]
pub struct EndpointFilter {
    patterns: Vec<String>,
}

impl EndpointFilter {
    pub fn new(patterns: Vec<String>) -> Self {
        Self { patterns }
    }

    pub fn matches(&self, url: &str) -> bool {
        self.patterns.iter().any(|pattern| url.contains(pattern))
    }
}

/// Sending half handed to the browser collaborator. Cheap to clone.
#[derive(Clone)]
pub struct Observer {
    filter: Arc<EndpointFilter>,
    requests: mpsc::Sender<ObservedRequest>,
    responses: mpsc::Sender<ObservedResponse>,
}

impl Observer {
    pub fn is_hit(&self, url: &str) -> bool {
        self.filter.matches(url)
    }

    /// Forward a request if it targets a collection endpoint. Returns whether it was forwarded.
    pub async fn observe_request(&self, url: &str) -> Result<bool, TapError> {
        if !self.is_hit(url) {
            return Ok(false);
        }
        trace!(target: "hit-tap", %url, "request observed");
        self.requests
            .send(ObservedRequest {
                url: url.to_string(),
                timestamp: timestamp_now(),
            })
            .await
            .map_err(|_| TapError::ChannelClosed)?;
        Ok(true)
    }

    /// Forward a response if it belongs to a collection endpoint.
    pub async fn observe_response(
        &self,
        url: &str,
        status: i64,
        body: impl Into<String>,
    ) -> Result<bool, TapError> {
        if !self.is_hit(url) {
            return Ok(false);
        }
        trace!(target: "hit-tap", %url, status, "response observed");
        self.responses
            .send(ObservedResponse {
                url: url.to_string(),
                status,
                body: body.into(),
                timestamp: timestamp_now(),
            })
            .await
            .map_err(|_| TapError::ChannelClosed)?;
        Ok(true)
    }
}

/// Receiving half, owned by the coordinating task.
pub struct ObservationStreams {
    pub requests: mpsc::Receiver<ObservedRequest>,
    pub responses: mpsc::Receiver<ObservedResponse>,
}

pub struct HitTap;

impl HitTap {
    pub fn channel(config: &TapConfig) -> (Observer, ObservationStreams) {
        let capacity = config.channel_capacity.max(1);
        let (req_tx, req_rx) = mpsc::channel(capacity);
        let (res_tx, res_rx) = mpsc::channel(capacity);
        (
            Observer {
                filter: Arc::new(EndpointFilter::new(config.endpoint_patterns.clone())),
                requests: req_tx,
                responses: res_tx,
            },
            ObservationStreams {
                requests: req_rx,
                responses: res_rx,
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn non_collect_urls_are_dropped() {
        let (observer, mut streams) = HitTap::channel(&TapConfig::default());

        let forwarded = observer
            .observe_request("https://cdn.example/app.js")
            .await
            .expect("observe");
        assert!(!forwarded);

        let forwarded = observer
            .observe_request("https://region1.google-analytics.com/g/collect?v=2&en=page_view")
            .await
            .expect("observe");
        assert!(forwarded);

        let request = streams.requests.recv().await.expect("request");
        assert!(request.url.ends_with("en=page_view"));
        assert!(streams.requests.try_recv().is_err());
    }

    #[tokio::test]
    async fn closed_streams_surface_as_errors() {
        let (observer, streams) = HitTap::channel(&TapConfig::default());
        drop(streams);
        let err = observer
            .observe_response("https://analytics.google.com/g/collect?v=2", 204, "")
            .await
            .unwrap_err();
        assert!(matches!(err, TapError::ChannelClosed));
    }

    #[test]
    fn observed_response_normalises_empty_body() {
        let response = ObservedResponse {
            url: "u".into(),
            status: 204,
            body: String::new(),
            timestamp: "t".into(),
        };
        let record = response.into_record();
        assert_eq!(record.body, hitaudit_core_types::NO_BODY);
        assert_eq!(record.timestamp, "t");
    }
}
