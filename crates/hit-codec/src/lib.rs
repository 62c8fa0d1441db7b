//! Decoding of analytics collection hits.
//!
//! A hit is an outbound `.../g/collect?...` URL. [`decode_hit`] turns it into ordered pairs and
//! classifies them into user properties, event details and line items.

pub mod decoder;
pub mod error;
pub mod items;

pub use decoder::{classify, decode_hit, decode_pairs, DecodedHit};
pub use error::DecodeError;
pub use items::{decode_item, is_item_key};
