//! Output side of the audit: the [`Sink`] collaborator, the header-driven [`ColumnPlan`]
//! projector, and two sinks (CSV directory, in-memory).

pub mod cache;
pub mod columns;
pub mod csv_sink;
pub mod error;
pub mod memory;
pub mod projector;
pub mod sink;

pub use cache::HeaderCache;
pub use columns::{ColumnRef, Fallback, MetaColumn};
pub use csv_sink::CsvSink;
pub use error::SinkError;
pub use memory::MemorySink;
pub use projector::ColumnPlan;
pub use sink::Sink;
