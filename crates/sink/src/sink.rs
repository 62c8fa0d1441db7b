use async_trait::async_trait;

use hitaudit_core_types::OutputRow;

use crate::error::SinkError;

/// Append-only tabular store whose first row defines the column layout.
#[async_trait]
pub trait Sink: Send + Sync {
    async fn read_header_row(&self, tab: &str) -> Result<Vec<String>, SinkError>;
    async fn append_row(&self, tab: &str, row: &OutputRow) -> Result<(), SinkError>;
}
