use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::defaults;
use crate::errors::RegistryError;

/// Wire key → semantic name tables used by the decoder.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldMaps {
    /// Client/user keys (`cid`, `dl`, ...) renamed into user properties.
    pub client_user: BTreeMap<String, String>,
    /// Two-character item field codes (`id`, `nm`, `pr`, ...).
    pub items: BTreeMap<String, String>,
}

impl Default for FieldMaps {
    fn default() -> Self {
        Self {
            client_user: defaults::client_user_map(),
            items: defaults::item_code_map(),
        }
    }
}

impl FieldMaps {
    pub fn client_user_name(&self, key: &str) -> Option<&str> {
        self.client_user.get(key).map(String::as_str)
    }

    pub fn item_field_name(&self, code: &str) -> Option<&str> {
        self.items.get(code).map(String::as_str)
    }
}

/// Requirements attached to one event name.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventRule {
    pub requires_items: bool,
    pub required_event_parameters: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RequiredFields {
    pub client_user: Vec<String>,
    pub events: BTreeMap<String, EventRule>,
    pub item: Vec<String>,
}

impl Default for RequiredFields {
    fn default() -> Self {
        Self {
            client_user: defaults::required_client_user(),
            events: defaults::event_rules(),
            item: defaults::required_item_fields(),
        }
    }
}

/// Immutable lookup tables supplied at construction.
///
/// Every section is optional in a definition file; omitted sections keep the built-in GA4
/// tables.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemaRegistry {
    pub field_maps: FieldMaps,
    pub required: RequiredFields,
    /// Event names that are validated, stored and emitted. Everything else is ignored.
    pub tracked_events: Vec<String>,
}

impl Default for SchemaRegistry {
    fn default() -> Self {
        Self::ga4_defaults()
    }
}

impl SchemaRegistry {
    pub fn ga4_defaults() -> Self {
        Self {
            field_maps: FieldMaps::default(),
            required: RequiredFields::default(),
            tracked_events: defaults::tracked_events(),
        }
    }

    pub fn with_tracked_events<I, S>(mut self, events: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tracked_events = events.into_iter().map(Into::into).collect();
        self
    }

    pub fn is_tracked(&self, event_name: &str) -> bool {
        self.tracked_events.iter().any(|name| name == event_name)
    }

    pub fn event_rule(&self, event_name: &str) -> Option<&EventRule> {
        self.required.events.get(event_name)
    }

    pub fn from_yaml_str(raw: &str) -> Result<Self, RegistryError> {
        Ok(serde_yaml::from_str(raw)?)
    }

    pub fn from_json_str(raw: &str) -> Result<Self, RegistryError> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Load a definition file, picking JSON for `.json` and YAML otherwise.
    pub fn from_path(path: &Path) -> Result<Self, RegistryError> {
        let raw = std::fs::read_to_string(path).map_err(|source| RegistryError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let is_json = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("json"))
            .unwrap_or(false);
        if is_json {
            Self::from_json_str(&raw)
        } else {
            Self::from_yaml_str(&raw)
        }
    }

    pub fn to_yaml(&self) -> Result<String, RegistryError> {
        Ok(serde_yaml::to_string(self)?)
    }
}
