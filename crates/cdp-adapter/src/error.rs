use std::time::Duration;

use chromiumoxide::error::CdpError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("browser unavailable: {0}")]
    Launch(String),

    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("{url} did not finish loading within {waited:?}")]
    NavTimeout { url: String, waited: Duration },

    #[error("page script threw: {0}")]
    Script(String),

    #[error("devtools command failed: {0}")]
    Cdp(#[from] CdpError),
}

impl AdapterError {
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            AdapterError::NavTimeout { .. } | AdapterError::Cdp(CdpError::Timeout)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeouts_are_recognised() {
        let waited = AdapterError::NavTimeout {
            url: "https://example.com".into(),
            waited: Duration::from_secs(2),
        };
        assert!(waited.is_timeout());
        assert!(waited.to_string().contains("within 2s"));
        assert!(AdapterError::Cdp(CdpError::Timeout).is_timeout());
        assert!(!AdapterError::Script("boom".into()).is_timeout());
    }
}
