//! Shared primitives for the hit audit pipeline.
//!
//! Every stage (decoder, validator, correlator, projector) speaks in these types, so they stay
//! plain data: no behaviour beyond lookups and rendering.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{SecondsFormat, Utc};

/// Ordered `(key, decoded value)` pairs taken from a hit's query string.
pub type DecodedPairs = Vec<(String, String)>;

/// Semantic user/client properties (`client_id`, `document_location`, ...).
pub type UserProperties = BTreeMap<String, String>;

/// `up.`-prefixed properties, kept verbatim and never validated.
pub type CustomUserProperties = BTreeMap<String, String>;

/// Wire key carrying the event name.
pub const EVENT_NAME_KEY: &str = "en";

/// Field name under which the event name is exposed to lookups and columns.
pub const EVENT_NAME_FIELD: &str = "event_name";

/// Event parameters of one hit plus its distinguished event name.
#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EventDetails {
    pub event_name: Option<String>,
    pub params: BTreeMap<String, String>,
}

impl EventDetails {
    pub fn get(&self, key: &str) -> Option<&str> {
        if key == EVENT_NAME_FIELD {
            return self.event_name.as_deref();
        }
        self.params.get(key).map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.params.insert(key.into(), value.into());
    }

    /// Event name when present and non-empty.
    pub fn name(&self) -> Option<&str> {
        self.event_name.as_deref().filter(|name| !name.is_empty())
    }
}

/// One line item decoded from a `pr<N>` parameter.
#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Item {
    /// Canonical fields keyed by their semantic name (`item_id`, `price`, ...).
    pub params: BTreeMap<String, String>,
    /// Custom item parameters, keyed by the name carried in the `k<N>` sub-field.
    pub custom: BTreeMap<String, String>,
}

impl Item {
    pub fn get(&self, field: &str) -> Option<&str> {
        self.params
            .get(field)
            .or_else(|| self.custom.get(field))
            .map(String::as_str)
    }
}

#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ValidationResult {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty() && self.warnings.is_empty()
    }
}

/// A decoded, validated request still waiting for its response.
#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct PendingEntry {
    pub url: String,
    pub event_details: EventDetails,
    pub user_properties: UserProperties,
    pub items: Vec<Item>,
    pub validation: ValidationResult,
    pub timestamp: String,
}

/// Placeholder stored when a response carries no body.
pub const NO_BODY: &str = "[No body]";

#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResponseRecord {
    pub status: i64,
    pub body: String,
    pub timestamp: String,
}

impl ResponseRecord {
    pub fn new(status: i64, body: impl Into<String>) -> Self {
        Self::at(status, body, timestamp_now())
    }

    pub fn at(status: i64, body: impl Into<String>, timestamp: impl Into<String>) -> Self {
        let body = body.into();
        Self {
            status,
            body: if body.is_empty() {
                NO_BODY.to_string()
            } else {
                body
            },
            timestamp: timestamp.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == 200
    }
}

/// A request merged with its response, ready for row projection.
#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct CorrelatedHit {
    pub request: PendingEntry,
    pub response: ResponseRecord,
}

/// Per-run and per-page context stamped onto every output row.
#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunMetadata {
    pub execution_time: String,
    pub page_url: String,
    pub page_num: u32,
}

impl RunMetadata {
    pub fn new(execution_time: impl Into<String>) -> Self {
        Self {
            execution_time: execution_time.into(),
            page_url: String::new(),
            page_num: 0,
        }
    }

    pub fn for_page(&self, page_url: impl Into<String>, page_num: u32) -> Self {
        Self {
            execution_time: self.execution_time.clone(),
            page_url: page_url.into(),
            page_num,
        }
    }
}

/// A single output cell. `Empty` renders blank.
#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum CellValue {
    #[default]
    Empty,
    Text(String),
    Integer(i64),
}

impl CellValue {
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }
}

impl From<Option<&str>> for CellValue {
    fn from(value: Option<&str>) -> Self {
        match value {
            Some(text) => CellValue::Text(text.to_string()),
            None => CellValue::Empty,
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Text(text) => f.write_str(text),
            CellValue::Integer(value) => write!(f, "{value}"),
        }
    }
}

/// One projected row, aligned with the sink's header list.
#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OutputRow(pub Vec<CellValue>);

impl OutputRow {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn cells(&self) -> &[CellValue] {
        &self.0
    }

    pub fn to_strings(&self) -> Vec<String> {
        self.0.iter().map(ToString::to_string).collect()
    }
}

/// UTC timestamp in the `2024-05-01T10:00:00.000Z` shape.
pub fn timestamp_now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}
