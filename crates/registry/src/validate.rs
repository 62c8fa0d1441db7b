//! Required-field checks for decoded hits.
//!
//! Findings are data: every problem is appended to the result and nothing here fails.

use hitaudit_core_types::{EventDetails, Item, UserProperties, ValidationResult};
use tracing::trace;

use crate::model::SchemaRegistry;

pub const UNDEFINED_EVENT_NAME: &str = "event name is undefined";

/// Items with fewer missing required fields than this are tolerated.
const ITEM_MISSING_THRESHOLD: usize = 2;

pub fn validate(
    details: &EventDetails,
    user_properties: &UserProperties,
    items: &[Item],
    registry: &SchemaRegistry,
) -> ValidationResult {
    let mut result = ValidationResult::default();

    let Some(event_name) = details.name() else {
        result.errors.push(UNDEFINED_EVENT_NAME.to_string());
        return result;
    };

    if !registry.is_tracked(event_name) {
        trace!(target: "registry", event = event_name, "not on the allow-list; skipped");
        return result;
    }

    let missing_user = missing(&registry.required.client_user, |field| {
        user_properties.contains_key(field)
    });
    if !missing_user.is_empty() {
        result.errors.push(format!(
            "User properties missing required parameters:\n - {}",
            missing_user.join("\n - ")
        ));
    }

    let Some(rule) = registry.event_rule(event_name) else {
        return result;
    };

    let missing_params = missing(&rule.required_event_parameters, |field| {
        details.contains(field)
    });
    if !missing_params.is_empty() {
        result.errors.push(format!(
            "Event parameters missing: \n - {}",
            missing_params.join("\n - ")
        ));
    }

    if rule.requires_items && items.is_empty() {
        result
            .errors
            .push(format!("Event {event_name} requires items."));
    }

    for (index, item) in items.iter().enumerate() {
        let missing_fields = missing(&registry.required.item, |field| {
            item.params.contains_key(field)
        });
        if missing_fields.len() >= ITEM_MISSING_THRESHOLD {
            result.errors.push(format!(
                "Item #{} missing: \n - {}",
                index + 1,
                missing_fields.join("\n - ")
            ));
        }
    }

    trace!(target: "registry", event = event_name, findings = result.errors.len(), "validated");
    result
}

fn missing<'a>(required: &'a [String], present: impl Fn(&str) -> bool) -> Vec<&'a str> {
    required
        .iter()
        .map(String::as_str)
        .filter(|field| !present(*field))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user_props() -> UserProperties {
        [
            ("client_id", "123.456"),
            ("document_location", "https://shop.example/"),
            ("stream_id", "G-TEST"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
    }

    fn event(name: &str, params: &[(&str, &str)]) -> EventDetails {
        let mut details = EventDetails {
            event_name: Some(name.to_string()),
            ..Default::default()
        };
        for (key, value) in params {
            details.insert(*key, *value);
        }
        details
    }

    fn item(fields: &[(&str, &str)]) -> Item {
        Item {
            params: fields
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            ..Default::default()
        }
    }

    #[test]
    fn missing_event_name_short_circuits() {
        let registry = SchemaRegistry::ga4_defaults();
        let result = validate(
            &EventDetails::default(),
            &UserProperties::new(),
            &[],
            &registry,
        );
        assert_eq!(result.errors, vec![UNDEFINED_EVENT_NAME.to_string()]);
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn untracked_events_are_not_checked() {
        let registry = SchemaRegistry::ga4_defaults().with_tracked_events(["page_view"]);
        let result = validate(&event("purchase", &[]), &UserProperties::new(), &[], &registry);
        assert!(result.is_clean());
    }

    #[test]
    fn purchase_without_parameters_or_items() {
        let registry = SchemaRegistry::ga4_defaults();
        let result = validate(&event("purchase", &[]), &user_props(), &[], &registry);
        assert_eq!(
            result.errors,
            vec![
                "Event parameters missing: \n - currency\n - transaction_id\n - value".to_string(),
                "Event purchase requires items.".to_string(),
            ]
        );
    }

    #[test]
    fn user_properties_are_aggregated() {
        let registry = SchemaRegistry::ga4_defaults();
        let mut props = user_props();
        props.remove("client_id");
        props.remove("stream_id");
        let result = validate(&event("page_view", &[]), &props, &[], &registry);
        assert_eq!(
            result.errors,
            vec![
                "User properties missing required parameters:\n - client_id\n - stream_id"
                    .to_string()
            ]
        );
    }

    #[test]
    fn single_missing_item_field_is_tolerated() {
        let registry = SchemaRegistry::ga4_defaults();
        let details = event("view_item", &[("currency", "EUR"), ("value", "9.99")]);
        let items = vec![
            item(&[("item_id", "SKU1")]),
            item(&[("price", "1.00")]),
            item(&[("item_id", "SKU3"), ("item_name", "Hat")]),
        ];
        let result = validate(&details, &user_props(), &items, &registry);
        assert_eq!(
            result.errors,
            vec!["Item #2 missing: \n - item_id\n - item_name".to_string()]
        );
    }

    #[test]
    fn tracked_event_without_rule_only_checks_user_properties() {
        let registry = SchemaRegistry::ga4_defaults();
        let result = validate(&event("page_view", &[]), &user_props(), &[], &registry);
        assert!(result.is_clean());
    }
}
