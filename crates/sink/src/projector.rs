//! Builds one output row per correlated hit from a parsed header list.

use serde_json::{json, Map, Value};

use hitaudit_core_types::{CellValue, CorrelatedHit, OutputRow, RunMetadata};

use crate::columns::{ColumnRef, Fallback, MetaColumn};

const NOT_AVAILABLE: &str = "N/A";

/// Header list parsed once per run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ColumnPlan {
    headers: Vec<String>,
    columns: Vec<ColumnRef>,
    needs_record_view: bool,
}

impl ColumnPlan {
    pub fn new(headers: Vec<String>) -> Self {
        let columns: Vec<ColumnRef> = headers.iter().map(|h| ColumnRef::parse(h)).collect();
        let needs_record_view = columns.iter().any(ColumnRef::is_path);
        Self {
            headers,
            columns,
            needs_record_view,
        }
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn columns(&self) -> &[ColumnRef] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn project(&self, hit: &CorrelatedHit, run: &RunMetadata) -> OutputRow {
        let view = self.needs_record_view.then(|| record_view(hit));
        OutputRow(
            self.columns
                .iter()
                .map(|column| resolve(column, hit, run, view.as_ref()))
                .collect(),
        )
    }
}

fn resolve(
    column: &ColumnRef,
    hit: &CorrelatedHit,
    run: &RunMetadata,
    view: Option<&Value>,
) -> CellValue {
    match column {
        ColumnRef::Meta(meta) => resolve_meta(*meta, hit, run),
        ColumnRef::Field { name, fallback } => {
            let details = &hit.request.event_details;
            if let Some(value) = details.get(name).filter(|value| !value.is_empty()) {
                return CellValue::text(value);
            }
            match fallback {
                Fallback::EventParam(suffix) => details.get(suffix).into(),
                Fallback::User(suffix) => hit
                    .request
                    .user_properties
                    .get(suffix)
                    .map(String::as_str)
                    .into(),
                Fallback::Item { index, field } => hit
                    .request
                    .items
                    .get(*index)
                    .and_then(|item| item.get(field))
                    .into(),
                Fallback::Path(segments) => view
                    .and_then(|root| walk(root, segments))
                    .map(render)
                    .unwrap_or_default(),
            }
        }
    }
}

fn resolve_meta(meta: MetaColumn, hit: &CorrelatedHit, run: &RunMetadata) -> CellValue {
    match meta {
        MetaColumn::Timestamp => CellValue::text(&hit.response.timestamp),
        MetaColumn::PageUrl => CellValue::text(&run.page_url),
        MetaColumn::PageNum => CellValue::Integer(i64::from(run.page_num)),
        MetaColumn::ExecutionTime => CellValue::text(&run.execution_time),
        MetaColumn::ResponseStatus => match hit.response.status {
            0 => CellValue::text(NOT_AVAILABLE),
            status => CellValue::Integer(status),
        },
        MetaColumn::ResponseBody => {
            if hit.response.body.is_empty() {
                CellValue::text(NOT_AVAILABLE)
            } else {
                CellValue::text(&hit.response.body)
            }
        }
    }
}

/// Structure walked by dotted-path columns. Accepts both snake_case and camelCase roots.
fn record_view(hit: &CorrelatedHit) -> Value {
    let request = &hit.request;
    let mut details = Map::new();
    if let Some(name) = &request.event_details.event_name {
        details.insert("event_name".into(), Value::String(name.clone()));
    }
    for (key, value) in &request.event_details.params {
        details.insert(key.clone(), Value::String(value.clone()));
    }
    let details = Value::Object(details);
    let user = json!(request.user_properties);
    let items: Vec<Value> = request
        .items
        .iter()
        .map(|item| {
            let mut merged = Map::new();
            for (key, value) in item.params.iter().chain(item.custom.iter()) {
                merged.insert(key.clone(), Value::String(value.clone()));
            }
            Value::Object(merged)
        })
        .collect();

    json!({
        "url": request.url,
        "event_details": details.clone(),
        "eventDetails": details,
        "user_properties": user.clone(),
        "userProperties": user,
        "items": items,
        "errors": request.validation.errors,
        "warnings": request.validation.warnings,
        "timestamp": request.timestamp,
        "response": {
            "status": hit.response.status,
            "body": hit.response.body,
            "timestamp": hit.response.timestamp,
        },
    })
}

fn walk<'a>(root: &'a Value, segments: &[String]) -> Option<&'a Value> {
    segments.iter().try_fold(root, |node, segment| match node {
        Value::Object(map) => map.get(segment),
        Value::Array(list) => segment.parse::<usize>().ok().and_then(|i| list.get(i)),
        _ => None,
    })
}

fn render(value: &Value) -> CellValue {
    match value {
        Value::Null => CellValue::Empty,
        Value::String(text) => CellValue::text(text),
        Value::Number(number) => match number.as_i64() {
            Some(int) => CellValue::Integer(int),
            None => CellValue::text(number.to_string()),
        },
        Value::Bool(flag) => CellValue::text(flag.to_string()),
        Value::Array(list) if list.is_empty() => CellValue::Empty,
        Value::Array(list) if list.iter().all(Value::is_string) => CellValue::Text(
            list.iter()
                .filter_map(Value::as_str)
                .collect::<Vec<_>>()
                .join("\n"),
        ),
        other => CellValue::Text(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hitaudit_core_types::{
        EventDetails, Item, PendingEntry, ResponseRecord, ValidationResult,
    };

    fn hit() -> CorrelatedHit {
        let mut details = EventDetails {
            event_name: Some("purchase".into()),
            ..Default::default()
        };
        details.insert("cu", "EUR");
        details.insert("ep.origin", "cart");
        details.insert("origin", "fallback");
        details.insert("empty", "");

        let mut item = Item::default();
        item.params.insert("item_id".into(), "SKU1".into());
        item.custom.insert("color".into(), "red".into());

        CorrelatedHit {
            request: PendingEntry {
                url: "https://www.google-analytics.com/g/collect?en=purchase".into(),
                event_details: details,
                user_properties: [("client_id".to_string(), "1.2".to_string())]
                    .into_iter()
                    .collect(),
                items: vec![item],
                validation: ValidationResult {
                    errors: vec!["first".into(), "second".into()],
                    warnings: Vec::new(),
                },
                timestamp: "2024-01-01T00:00:00.000Z".into(),
            },
            response: ResponseRecord::at(204, "", "2024-01-01T00:00:01.000Z"),
        }
    }

    fn run() -> RunMetadata {
        RunMetadata::new("2024-01-01T00:00:00.000Z").for_page("https://shop.example/", 2)
    }

    fn project(headers: &[&str]) -> Vec<String> {
        ColumnPlan::new(headers.iter().map(|h| h.to_string()).collect())
            .project(&hit(), &run())
            .to_strings()
    }

    #[test]
    fn metadata_columns() {
        assert_eq!(
            project(&[
                "timestamp",
                "page_url",
                "page_num",
                "execution_time",
                "response_status",
                "response_body"
            ]),
            vec![
                "2024-01-01T00:00:01.000Z",
                "https://shop.example/",
                "2",
                "2024-01-01T00:00:00.000Z",
                "204",
                "[No body]"
            ]
        );
    }

    #[test]
    fn zero_status_renders_not_available() {
        let mut hit = hit();
        hit.response.status = 0;
        let row = ColumnPlan::new(vec!["response_status".into()]).project(&hit, &run());
        assert_eq!(row.to_strings(), vec!["N/A"]);
    }

    #[test]
    fn event_user_and_item_columns() {
        assert_eq!(
            project(&[
                "event_name",
                "cu",
                "ep.origin",
                "user.client_id",
                "items.0.item_id",
                "items.0.color",
                "items.3.item_id"
            ]),
            vec!["purchase", "EUR", "cart", "1.2", "SKU1", "red", ""]
        );
    }

    #[test]
    fn empty_exact_match_falls_through() {
        assert_eq!(project(&["empty"]), vec![""]);
    }

    #[test]
    fn ep_prefix_uses_suffix_when_no_exact_key() {
        let mut hit = hit();
        hit.request.event_details.params.remove("ep.origin");
        let row = ColumnPlan::new(vec!["ep.origin".into()]).project(&hit, &run());
        assert_eq!(row.to_strings(), vec!["fallback"]);
    }

    #[test]
    fn dotted_paths_walk_the_record() {
        assert_eq!(
            project(&[
                "errors",
                "warnings",
                "url",
                "eventDetails.cu",
                "response.status",
                "items.0",
                "nothing.here"
            ]),
            vec![
                "first\nsecond",
                "",
                "https://www.google-analytics.com/g/collect?en=purchase",
                "EUR",
                "204",
                r#"{"color":"red","item_id":"SKU1"}"#,
                ""
            ]
        );
    }

    #[test]
    fn projection_is_idempotent() {
        let plan = ColumnPlan::new(
            ["timestamp", "event_name", "errors", "user.client_id"]
                .iter()
                .map(|h| h.to_string())
                .collect(),
        );
        let record = hit();
        let first = plan.project(&record, &run());
        let second = plan.project(&record, &run());
        assert_eq!(first, second);
        assert_eq!(first.len(), plan.len());
    }
}
