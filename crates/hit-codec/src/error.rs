use thiserror::Error;

/// Reasons a single hit cannot be decoded. Fatal to that hit only.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("malformed hit url {url:?}: {reason}")]
    MalformedHit { url: String, reason: String },
    #[error("item {key} ends with custom key at sub-field {position} without a value")]
    DanglingCustomItemKey { key: String, position: usize },
}
