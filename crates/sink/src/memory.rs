//! In-memory sink used by tests and dry runs.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;

use hitaudit_core_types::OutputRow;

use crate::error::SinkError;
use crate::sink::Sink;

#[derive(Default)]
struct MemoryTab {
    header: Vec<String>,
    rows: Vec<OutputRow>,
}

#[derive(Default)]
pub struct MemorySink {
    tabs: Mutex<HashMap<String, MemoryTab>>,
    fail_writes: Mutex<bool>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tab<I, S>(self, tab: &str, header: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tabs.lock().insert(
            tab.to_string(),
            MemoryTab {
                header: header.into_iter().map(Into::into).collect(),
                rows: Vec::new(),
            },
        );
        self
    }

    pub fn rows(&self, tab: &str) -> Vec<OutputRow> {
        self.tabs
            .lock()
            .get(tab)
            .map(|t| t.rows.clone())
            .unwrap_or_default()
    }

    /// Make every subsequent append fail.
    pub fn fail_writes(&self, fail: bool) {
        *self.fail_writes.lock() = fail;
    }
}

#[async_trait]
impl Sink for MemorySink {
    async fn read_header_row(&self, tab: &str) -> Result<Vec<String>, SinkError> {
        let tabs = self.tabs.lock();
        let header = tabs
            .get(tab)
            .map(|t| t.header.clone())
            .ok_or_else(|| SinkError::schema(tab, "unknown tab"))?;
        if header.is_empty() {
            return Err(SinkError::schema(tab, "header row is empty"));
        }
        Ok(header)
    }

    async fn append_row(&self, tab: &str, row: &OutputRow) -> Result<(), SinkError> {
        if *self.fail_writes.lock() {
            return Err(SinkError::write(tab, "writes disabled"));
        }
        let mut tabs = self.tabs.lock();
        let entry = tabs
            .get_mut(tab)
            .ok_or_else(|| SinkError::write(tab, "unknown tab"))?;
        entry.rows.push(row.clone());
        Ok(())
    }
}
