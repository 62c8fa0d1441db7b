use std::sync::Arc;

use tokio::sync::OnceCell;
use tracing::info;

use crate::error::SinkError;
use crate::projector::ColumnPlan;
use crate::sink::Sink;

/// Fetches a tab's header row once and keeps the parsed plan for the rest of the run.
/// Columns added to the sink afterwards are not picked up.
pub struct HeaderCache {
    tab: String,
    plan: OnceCell<Arc<ColumnPlan>>,
}

impl HeaderCache {
    pub fn new(tab: impl Into<String>) -> Self {
        Self {
            tab: tab.into(),
            plan: OnceCell::new(),
        }
    }

    pub fn tab(&self) -> &str {
        &self.tab
    }

    pub async fn plan(&self, sink: &dyn Sink) -> Result<Arc<ColumnPlan>, SinkError> {
        self.plan
            .get_or_try_init(|| async {
                let headers = sink.read_header_row(&self.tab).await?;
                info!(target: "sink", tab = %self.tab, columns = headers.len(), "column layout cached");
                Ok::<_, SinkError>(Arc::new(ColumnPlan::new(headers)))
            })
            .await
            .map(Arc::clone)
    }
}
