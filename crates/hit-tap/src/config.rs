//! Configuration types for the hit tap.

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct TapConfig {
    /// Substrings identifying a collection endpoint; a URL matching any of them is a hit.
    pub endpoint_patterns: Vec<String>,
    pub channel_capacity: usize,
}

impl Default for TapConfig {
    fn default() -> Self {
        Self {
            endpoint_patterns: vec![
                "google-analytics.com/g/collect".to_string(),
                "analytics.google.com/g/collect".to_string(),
            ],
            channel_capacity: 256,
        }
    }
}
