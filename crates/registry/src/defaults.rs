//! Built-in GA4 measurement protocol tables.

use std::collections::BTreeMap;

use crate::model::EventRule;

const CLIENT_USER: &[(&str, &str)] = &[
    ("cid", "client_id"),
    ("uid", "user_id"),
    ("dl", "document_location"),
    ("dp", "page_path"),
    ("dr", "referrer"),
    ("tid", "stream_id"),
];

const ITEM_CODES: &[(&str, &str)] = &[
    ("id", "item_id"),
    ("nm", "item_name"),
    ("af", "affiliation"),
    ("cp", "coupon"),
    ("ds", "discount"),
    ("lp", "index"),
    ("br", "item_brand"),
    ("ca", "item_category"),
    ("c2", "item_category2"),
    ("c3", "item_category3"),
    ("c4", "item_category4"),
    ("c5", "item_category5"),
    ("li", "item_list_id"),
    ("ln", "item_list_name"),
    ("va", "item_variant"),
    ("lo", "location_id"),
    ("pr", "price"),
    ("qt", "quantity"),
    ("pi", "promo_id"),
    ("pn", "promo_name"),
];

const CURRENCY_VALUE: &[&str] = &["currency", "value"];
const TRANSACTION: &[&str] = &["currency", "transaction_id", "value"];

// (event, requires items, required event parameters)
const EVENT_RULES: &[(&str, bool, &[&str])] = &[
    ("add_payment_info", true, CURRENCY_VALUE),
    ("add_shipping_info", true, CURRENCY_VALUE),
    ("add_to_cart", true, CURRENCY_VALUE),
    ("add_to_wishlist", true, CURRENCY_VALUE),
    ("begin_checkout", true, CURRENCY_VALUE),
    ("generate_lead", false, CURRENCY_VALUE),
    ("post_score", false, &["score"]),
    ("purchase", true, TRANSACTION),
    ("refund", false, TRANSACTION),
    ("remove_from_cart", true, CURRENCY_VALUE),
    ("search", false, &["search_term"]),
    ("select_item", true, &[]),
    ("spend_virtual_currency", false, &["value", "virtual_currency_name"]),
    ("unlock_achievement", false, &["achievement_id"]),
    ("view_cart", true, CURRENCY_VALUE),
    ("view_item", true, CURRENCY_VALUE),
    ("view_promotion", false, &[]),
    ("view_item_list", true, &[]),
];

fn owned_map(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect()
}

fn owned_list(names: &[&str]) -> Vec<String> {
    names.iter().map(|name| name.to_string()).collect()
}

pub fn client_user_map() -> BTreeMap<String, String> {
    owned_map(CLIENT_USER)
}

pub fn item_code_map() -> BTreeMap<String, String> {
    owned_map(ITEM_CODES)
}

pub fn required_client_user() -> Vec<String> {
    owned_list(&["client_id", "document_location", "stream_id"])
}

pub fn required_item_fields() -> Vec<String> {
    owned_list(&["item_id", "item_name"])
}

pub fn event_rules() -> BTreeMap<String, EventRule> {
    EVENT_RULES
        .iter()
        .map(|(name, requires_items, params)| {
            (
                name.to_string(),
                EventRule {
                    requires_items: *requires_items,
                    required_event_parameters: owned_list(params),
                },
            )
        })
        .collect()
}

/// `page_view` plus every event that has a rule.
pub fn tracked_events() -> Vec<String> {
    std::iter::once("page_view")
        .chain(EVENT_RULES.iter().map(|(name, _, _)| *name))
        .map(str::to_string)
        .collect()
}
