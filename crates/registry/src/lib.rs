//! Schema registry for analytics hits: field-rename tables, the tracked-event allow-list,
//! per-event required fields, and the validator that applies them.

pub mod defaults;
pub mod errors;
pub mod model;
pub mod validate;

pub use errors::RegistryError;
pub use model::{EventRule, FieldMaps, RequiredFields, SchemaRegistry};
pub use validate::{validate, UNDEFINED_EVENT_NAME};
