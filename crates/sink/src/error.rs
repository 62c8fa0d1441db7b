use thiserror::Error;

#[derive(Clone, Debug, Error)]
pub enum SinkError {
    /// The header row is missing or empty; no column mapping is possible.
    #[error("no header row for tab {tab}: {reason}")]
    SchemaFetch { tab: String, reason: String },
    #[error("failed to append row to tab {tab}: {reason}")]
    SinkWrite { tab: String, reason: String },
}

impl SinkError {
    pub fn schema(tab: &str, reason: impl Into<String>) -> Self {
        SinkError::SchemaFetch {
            tab: tab.to_string(),
            reason: reason.into(),
        }
    }

    pub fn write(tab: &str, reason: impl Into<String>) -> Self {
        SinkError::SinkWrite {
            tab: tab.to_string(),
            reason: reason.into(),
        }
    }
}
