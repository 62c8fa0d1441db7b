//! Item list sub-format: `~`-separated sub-fields, each a two-character code followed by its
//! value. A `k<N>` code names a custom parameter whose value is the payload of the next
//! sub-field.

use once_cell::sync::Lazy;
use regex::Regex;

use hitaudit_core_types::Item;
use hitaudit_registry::FieldMaps;

use crate::error::DecodeError;

static ITEM_KEY: Lazy<Regex> = Lazy::new(|| Regex::new(r"^pr\d+$").expect("item key pattern"));
static CUSTOM_CODE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^k\d+$").expect("custom item code pattern"));

const SUBFIELD_SEPARATOR: char = '~';
const CODE_CHARS: usize = 2;

/// `true` for `pr1`, `pr12`, ...
pub fn is_item_key(key: &str) -> bool {
    ITEM_KEY.is_match(key)
}

pub fn decode_item(key: &str, value: &str, maps: &FieldMaps) -> Result<Item, DecodeError> {
    let subfields: Vec<&str> = value.split(SUBFIELD_SEPARATOR).collect();
    let mut item = Item::default();
    let mut index = 0;

    while index < subfields.len() {
        let (code, payload) = split_code(subfields[index]);

        if let Some(field) = maps.item_field_name(code) {
            item.params.insert(field.to_string(), payload.to_string());
            index += 1;
        } else if CUSTOM_CODE.is_match(code) {
            let Some(next) = subfields.get(index + 1) else {
                return Err(DecodeError::DanglingCustomItemKey {
                    key: key.to_string(),
                    position: index,
                });
            };
            let (_, custom_value) = split_code(next);
            item.custom
                .insert(payload.to_string(), custom_value.to_string());
            index += 2;
        } else {
            index += 1;
        }
    }

    Ok(item)
}

/// Splits a sub-field into its code and payload on a character boundary.
fn split_code(subfield: &str) -> (&str, &str) {
    let boundary = subfield
        .char_indices()
        .nth(CODE_CHARS)
        .map(|(offset, _)| offset)
        .unwrap_or(subfield.len());
    subfield.split_at(boundary)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn item_key_pattern_is_anchored() {
        assert!(is_item_key("pr1"));
        assert!(is_item_key("pr12"));
        assert!(!is_item_key("pr"));
        assert!(!is_item_key("promotion_id"));
        assert!(!is_item_key("epn.pr1"));
    }

    #[test]
    fn decodes_canonical_fields() {
        let item = decode_item("pr1", "idSKU1~nmShirt~pr19.99", &FieldMaps::default()).unwrap();
        assert_eq!(item.get("item_id"), Some("SKU1"));
        assert_eq!(item.get("item_name"), Some("Shirt"));
        assert_eq!(item.get("price"), Some("19.99"));
        assert!(item.custom.is_empty());
    }

    #[test]
    fn value_starts_right_after_the_two_char_code() {
        let item = decode_item("pr1", "pr9.99~qt10", &FieldMaps::default()).unwrap();
        assert_eq!(item.get("price"), Some("9.99"));
        assert_eq!(item.get("quantity"), Some("10"));
    }

    #[test]
    fn custom_key_consumes_following_subfield() {
        let item = decode_item(
            "pr1",
            "idSKU1~k0color~v0red~k1size~v1XL~qt2",
            &FieldMaps::default(),
        )
        .unwrap();
        assert_eq!(item.custom.get("color").map(String::as_str), Some("red"));
        assert_eq!(item.custom.get("size").map(String::as_str), Some("XL"));
        assert_eq!(item.get("quantity"), Some("2"));
        assert_eq!(item.params.len(), 2);
    }

    #[test]
    fn dangling_custom_key_is_rejected() {
        let err = decode_item("pr3", "idSKU1~k0color", &FieldMaps::default()).unwrap_err();
        assert_eq!(
            err,
            DecodeError::DanglingCustomItemKey {
                key: "pr3".into(),
                position: 1
            }
        );
    }

    #[test]
    fn short_and_unknown_subfields_are_ignored() {
        let item = decode_item("pr1", "x~~zzvalue~idA", &FieldMaps::default()).unwrap();
        assert_eq!(item.params.len(), 1);
        assert_eq!(item.get("item_id"), Some("A"));
    }

    #[test]
    fn multibyte_codes_split_on_char_boundary() {
        assert_eq!(split_code("nmCafé"), ("nm", "Café"));
        assert_eq!(split_code("éé€"), ("éé", "€"));
        assert_eq!(split_code("i"), ("i", ""));
    }
}
