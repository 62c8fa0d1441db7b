//! The network events a page session reacts to, flattened out of the typed protocol events.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chromiumoxide::cdp::browser_protocol::network::{
    EventLoadingFailed, EventLoadingFinished, EventRequestWillBeSent, EventResponseReceived,
};
use futures::stream::BoxStream;

#[derive(Clone, Debug, PartialEq)]
pub enum PageEvent {
    RequestWillBeSent { request_id: String, url: String },
    ResponseReceived { request_id: String, status: i64 },
    LoadingFinished { request_id: String },
    LoadingFailed { request_id: String, error_text: String },
}

impl From<&EventRequestWillBeSent> for PageEvent {
    fn from(event: &EventRequestWillBeSent) -> Self {
        PageEvent::RequestWillBeSent {
            request_id: event.request_id.inner().clone(),
            url: event.request.url.clone(),
        }
    }
}

impl From<&EventResponseReceived> for PageEvent {
    fn from(event: &EventResponseReceived) -> Self {
        PageEvent::ResponseReceived {
            request_id: event.request_id.inner().clone(),
            status: event.response.status,
        }
    }
}

impl From<&EventLoadingFinished> for PageEvent {
    fn from(event: &EventLoadingFinished) -> Self {
        PageEvent::LoadingFinished {
            request_id: event.request_id.inner().clone(),
        }
    }
}

impl From<&EventLoadingFailed> for PageEvent {
    fn from(event: &EventLoadingFailed) -> Self {
        PageEvent::LoadingFailed {
            request_id: event.request_id.inner().clone(),
            error_text: event.error_text.clone(),
        }
    }
}

/// Network events of one page, split by lifecycle stage.
///
/// For any request, its `requests` event is queued before its `responses` event, which is
/// queued before its `completions` event. Consumers that drain the streams in that priority
/// order see every request's events in order.
pub struct PageEventStreams {
    pub requests: BoxStream<'static, PageEvent>,
    pub responses: BoxStream<'static, PageEvent>,
    /// Loading finished or failed.
    pub completions: BoxStream<'static, PageEvent>,
}

/// Raw `Network.getResponseBody` payload.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResponseBody {
    pub body: String,
    pub base64_encoded: bool,
}

impl ResponseBody {
    pub fn text(body: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            base64_encoded: false,
        }
    }

    /// Body as text. Undecodable base64 is returned untouched.
    pub fn into_text(self) -> String {
        if !self.base64_encoded {
            return self.body;
        }
        match STANDARD.decode(self.body.as_bytes()) {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(_) => self.body,
        }
    }
}
