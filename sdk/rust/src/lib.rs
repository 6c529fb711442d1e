//! Rust SDK for the APM collector.

pub mod client;

pub use client::{CollectorClient, HealthStatus, TrackAck};
