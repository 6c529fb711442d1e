//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define collector metrics (request rate, latency, record throughput)
//! - Expose a Prometheus-compatible scrape endpoint
//!
//! # Metrics
//! - `collector_http_requests_total` (counter): requests by method, status
//! - `collector_http_request_duration_seconds` (histogram): latency
//! - `collector_records_ingested_total` (counter): appended records by kind
//! - `collector_append_failures_total` (counter): failed append attempts
//! - `collector_append_drops_total` (counter): records lost after retries
//! - `collector_requests_aborted_total` (counter): round trips cancelled
//!   before completion
//!
//! # Design Decisions
//! - Low-overhead metric updates (atomic operations)
//! - The exporter runs on its own listener so a scrape never competes with
//!   ingestion

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter and register metric descriptions.
///
/// Exporter failure is logged rather than fatal; the collector keeps
/// serving without a scrape endpoint.
pub fn init_metrics(address: SocketAddr) {
    match PrometheusBuilder::new()
        .with_http_listener(address)
        .install()
    {
        Ok(()) => {
            describe_metrics();
            tracing::info!(address = %address, "Metrics exporter listening");
        }
        Err(error) => {
            tracing::error!(%error, "Failed to install metrics exporter");
        }
    }
}

fn describe_metrics() {
    describe_counter!(
        "collector_http_requests_total",
        "Total HTTP requests by method and status"
    );
    describe_histogram!(
        "collector_http_request_duration_seconds",
        "HTTP request round trip latency in seconds"
    );
    describe_counter!(
        "collector_records_ingested_total",
        "Records appended to the log by kind"
    );
    describe_counter!(
        "collector_append_failures_total",
        "Append attempts that returned an error"
    );
    describe_counter!(
        "collector_append_drops_total",
        "Records dropped after exhausting the append retry budget"
    );
    describe_counter!(
        "collector_requests_aborted_total",
        "Round trips cancelled before the downstream completed"
    );
}

/// Record one completed (or failed) request round trip.
pub fn record_request(method: &str, status: u16, started: Instant) {
    counter!(
        "collector_http_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!("collector_http_request_duration_seconds").record(started.elapsed().as_secs_f64());
}

/// Count a record appended to the log.
pub fn record_ingested(kind: &'static str) {
    counter!("collector_records_ingested_total", "kind" => kind).increment(1);
}

/// Count one failed append attempt.
pub fn record_append_failure() {
    counter!("collector_append_failures_total").increment(1);
}

/// Count a record lost after retry exhaustion.
pub fn record_append_drop(kind: &'static str) {
    counter!("collector_append_drops_total", "kind" => kind).increment(1);
}

/// Count a round trip cancelled before completion.
pub fn record_aborted() {
    counter!("collector_requests_aborted_total").increment(1);
}
