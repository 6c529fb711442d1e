//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → Log aggregation (stdout, file, remote)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Request ID flows through the interceptor's log events
//! - Metrics are cheap (atomic increments)
//! - The app-level record pipeline is separate from operator metrics:
//!   records go to the append log, metrics go to the scrape endpoint

pub mod logging;
pub mod metrics;
