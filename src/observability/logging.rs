//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the logging subsystem exactly once at startup
//! - Respect `RUST_LOG` over the configured level
//!
//! # Design Decisions
//! - Uses the tracing crate for structured logging
//! - Log level configurable via config file and environment

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the global tracing subscriber.
///
/// `RUST_LOG` wins when set; otherwise `fallback` applies (the configured
/// level scoped to this crate, with noisier dependencies kept quieter).
pub fn init(fallback: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| fallback.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Filter directive string for the configured level.
pub fn directive_for(level: &str) -> String {
    format!("apm_collector={level},tower_http=warn")
}
