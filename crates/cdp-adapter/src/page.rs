use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::network::{
    EventLoadingFailed, EventLoadingFinished, EventRequestWillBeSent, EventResponseReceived,
    GetResponseBodyParams,
};
use chromiumoxide::cdp::js_protocol::runtime::EvaluateParams;
use chromiumoxide::error::CdpError;
use chromiumoxide::Page;
use futures::stream::{self, StreamExt};
use serde_json::Value;

use crate::error::AdapterError;
use crate::events::{PageEvent, PageEventStreams, ResponseBody};

/// What a page session needs from a browser tab.
#[async_trait]
pub trait HitPage: Send + Sync {
    /// Subscribe to the tab's network events. Called once per session.
    async fn event_streams(&self) -> Result<PageEventStreams, AdapterError>;

    /// Navigate and resolve once the load event fired.
    async fn navigate(&self, url: &str) -> Result<(), AdapterError>;

    /// Evaluate in the main frame and return the value by copy.
    async fn evaluate(&self, expression: &str, await_promise: bool) -> Result<Value, AdapterError>;

    async fn response_body(&self, request_id: &str) -> Result<ResponseBody, AdapterError>;

    async fn close(&self) -> Result<(), AdapterError>;
}

/// A Chromium tab. `Network` and `Page` are enabled by chromiumoxide when the target attaches.
pub struct ChromiumPage {
    page: Page,
}

impl ChromiumPage {
    pub fn new(page: Page) -> Self {
        Self { page }
    }
}

#[async_trait]
impl HitPage for ChromiumPage {
    async fn event_streams(&self) -> Result<PageEventStreams, AdapterError> {
        let requests = self
            .page
            .event_listener::<EventRequestWillBeSent>()
            .await?
            .map(|event| PageEvent::from(&*event));
        let responses = self
            .page
            .event_listener::<EventResponseReceived>()
            .await?
            .map(|event| PageEvent::from(&*event));
        let finished = self
            .page
            .event_listener::<EventLoadingFinished>()
            .await?
            .map(|event| PageEvent::from(&*event));
        let failed = self
            .page
            .event_listener::<EventLoadingFailed>()
            .await?
            .map(|event| PageEvent::from(&*event));

        Ok(PageEventStreams {
            requests: requests.boxed(),
            responses: responses.boxed(),
            completions: stream::select(finished, failed).boxed(),
        })
    }

    async fn navigate(&self, url: &str) -> Result<(), AdapterError> {
        match self.page.goto(url).await {
            Ok(_) => Ok(()),
            Err(CdpError::ChromeMessage(reason)) => Err(AdapterError::Navigation {
                url: url.to_string(),
                reason,
            }),
            Err(err) => Err(err.into()),
        }
    }

    async fn evaluate(&self, expression: &str, await_promise: bool) -> Result<Value, AdapterError> {
        let params = EvaluateParams::builder()
            .expression(expression)
            .await_promise(await_promise)
            .return_by_value(true)
            .build()
            .map_err(AdapterError::Script)?;
        let returns = self.page.execute(params).await?.result;
        if let Some(details) = returns.exception_details {
            return Err(AdapterError::Script(details.text));
        }
        Ok(returns.result.value.unwrap_or(Value::Null))
    }

    async fn response_body(&self, request_id: &str) -> Result<ResponseBody, AdapterError> {
        let returns = self
            .page
            .execute(GetResponseBodyParams::new(request_id.to_string()))
            .await?
            .result;
        Ok(ResponseBody {
            body: returns.body,
            base64_encoded: returns.base64_encoded,
        })
    }

    async fn close(&self) -> Result<(), AdapterError> {
        self.page.clone().close().await?;
        Ok(())
    }
}
