use serde::Serialize;
use tracing::trace;
use url::Url;

use hitaudit_core_types::{
    CustomUserProperties, DecodedPairs, EventDetails, Item, UserProperties, EVENT_NAME_KEY,
};
use hitaudit_registry::FieldMaps;

use crate::error::DecodeError;
use crate::items::{decode_item, is_item_key};

const CUSTOM_USER_PREFIX: &str = "up.";

/// A hit split into the buckets the validator and projector consume.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct DecodedHit {
    pub pairs: DecodedPairs,
    pub user_properties: UserProperties,
    pub custom_user_properties: CustomUserProperties,
    pub event_details: EventDetails,
    pub items: Vec<Item>,
}

impl DecodedHit {
    pub fn event_name(&self) -> Option<&str> {
        self.event_details.name()
    }
}

/// Parse the query component of `url` into decoded pairs, in wire order.
pub fn decode_pairs(url: &str) -> Result<DecodedPairs, DecodeError> {
    let parsed = Url::parse(url).map_err(|err| DecodeError::MalformedHit {
        url: url.to_string(),
        reason: err.to_string(),
    })?;
    Ok(parsed
        .query_pairs()
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect())
}

pub fn decode_hit(url: &str, maps: &FieldMaps) -> Result<DecodedHit, DecodeError> {
    let pairs = decode_pairs(url)?;
    classify(pairs, maps)
}

/// Sort decoded pairs into user properties, event details and items.
pub fn classify(pairs: DecodedPairs, maps: &FieldMaps) -> Result<DecodedHit, DecodeError> {
    let mut hit = DecodedHit::default();

    for (key, value) in &pairs {
        if key.starts_with(CUSTOM_USER_PREFIX) {
            hit.custom_user_properties
                .insert(key.clone(), value.clone());
        } else if let Some(name) = maps.client_user_name(key) {
            hit.user_properties.insert(name.to_string(), value.clone());
        } else if key == EVENT_NAME_KEY {
            hit.event_details.event_name = Some(value.clone());
        } else if is_item_key(key) {
            hit.items.push(decode_item(key, value, maps)?);
        } else {
            hit.event_details.insert(key.clone(), value.clone());
        }
    }

    trace!(
        target: "hit-codec",
        pairs = pairs.len(),
        items = hit.items.len(),
        "classified hit"
    );
    hit.pairs = pairs;
    Ok(hit)
}
