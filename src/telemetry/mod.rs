//! Telemetry subsystem: record model, normalization, durable append.
//!
//! # Data Flow
//!
//! ```text
//! HTTP handler / interceptor
//!         |
//!         v
//!   normalizer ----> Record (kind + occurred_at + open fields)
//!         |
//!         v
//!    EventSink ----> one JSON line per record, append-only
//! ```

pub mod normalizer;
pub mod record;
pub mod sink;

pub use record::{Record, RecordKind};
pub use sink::{EventSink, SinkError};
