//! Lightweight APM ingestion collector.
//!
//! An HTTP service that measures every request it serves and persists
//! normalized telemetry records to an append-only JSONL log.
//!
//! # Architecture Overview
//!
//! ```text
//!                        ┌──────────────────────────────────────────────┐
//!                        │                 COLLECTOR                     │
//!                        │                                               │
//!   Client Request       │  ┌─────────┐   ┌─────────────┐   ┌────────┐  │
//!   ─────────────────────┼─▶│  http   │──▶│ interceptor │──▶│handlers│  │
//!                        │  │ server  │   │ (timing +   │   │ facade │  │
//!                        │  └─────────┘   │  outcome)   │   └───┬────┘  │
//!                        │                └──────┬──────┘       │       │
//!                        │                       │              ▼       │
//!                        │                       │        ┌──────────┐  │
//!                        │                       │        │normalizer│  │
//!                        │                       │        └────┬─────┘  │
//!                        │                       ▼             ▼        │
//!   Client Response      │                ┌────────────────────────┐    │
//!   ◀────────────────────┼─               │       EventSink        │    │
//!                        │                │  (append-only JSONL)   │    │
//!                        │                └────────────────────────┘    │
//!                        │                                               │
//!                        │  ┌─────────────────────────────────────────┐ │
//!                        │  │          Cross-Cutting Concerns          │ │
//!                        │  │  ┌────────┐ ┌───────────┐ ┌───────────┐ │ │
//!                        │  │  │ config │ │ observa-  │ │ lifecycle │ │ │
//!                        │  │  │ +reload│ │ bility    │ │ shutdown  │ │ │
//!                        │  │  └────────┘ └───────────┘ └───────────┘ │ │
//!                        │  └─────────────────────────────────────────┘ │
//!                        └──────────────────────────────────────────────┘
//! ```

// Core subsystems
pub mod config;
pub mod http;
pub mod telemetry;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;

pub use config::schema::CollectorConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use telemetry::record::{Record, RecordKind};
pub use telemetry::sink::EventSink;
