//! Request interception: timing, outcome capture, record production.
//!
//! # Responsibilities
//! - Start a wall-clock timer before the downstream handler runs
//! - Invoke the downstream exactly once and capture its outcome
//! - Produce exactly one record per round trip: `request` on completion,
//!   `exception` on panic or cancellation
//! - Re-raise downstream panics unchanged after recording them
//!
//! # Design Decisions
//! - Wall-clock time (`Instant`), not CPU time: suspension while awaiting
//!   I/O counts toward `duration_ms`
//! - A drop guard covers cancellation (client disconnect, outer timeout),
//!   so aborted round trips are recorded instead of silently undercounted
//! - Append failures are absorbed by the sink's drop-and-count policy and
//!   never alter the response

use std::net::SocketAddr;
use std::panic::{resume_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;

use axum::extract::{ConnectInfo, Request, State};
use axum::middleware::Next;
use axum::response::Response;
use futures_util::FutureExt;
use uuid::Uuid;

use crate::http::server::AppState;
use crate::observability::metrics;
use crate::telemetry::record::Record;
use crate::telemetry::sink::EventSink;

/// Sentinel stored as `client_ip` when the transport gave us no peer
/// address.
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Middleware wrapping every route with timing and outcome capture.
pub async fn track_performance(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    let method = request.method().to_string();
    let client_ip = client_ip(&request);
    let request_id = Uuid::new_v4();

    let started = Instant::now();
    let mut guard = AbortGuard::new(state.sink.clone(), &path, &client_ip);
    let outcome = AssertUnwindSafe(next.run(request)).catch_unwind().await;
    guard.disarm();
    let duration_ms = started.elapsed().as_secs_f64() * 1000.0;

    match outcome {
        Ok(response) => {
            let status = response.status().as_u16();
            tracing::debug!(
                request_id = %request_id,
                method = %method,
                path = %path,
                status,
                duration_ms,
                "Request completed"
            );
            metrics::record_request(&method, status, started);
            state
                .sink
                .submit(Record::request(&path, &method, status, duration_ms, &client_ip))
                .await;
            response
        }
        Err(panic) => {
            let error = panic_message(panic.as_ref());
            tracing::error!(
                request_id = %request_id,
                method = %method,
                path = %path,
                error = %error,
                duration_ms,
                "Request handler panicked"
            );
            metrics::record_request(&method, 500, started);
            state
                .sink
                .submit(Record::exception(&path, &client_ip, &error))
                .await;
            resume_unwind(panic)
        }
    }
}

/// Peer address, or the sentinel when the transport did not provide one.
fn client_ip(request: &Request) -> String {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
}

/// Best-effort string form of a panic payload.
fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unhandled panic".to_string()
    }
}

/// Ensures an aborted round trip still produces a record.
///
/// If the middleware future is dropped before the downstream resolves
/// (client disconnect, outer timeout firing), `Drop` submits an `exception`
/// record on a detached task. Both completion paths disarm the guard first,
/// so exactly one record is ever produced per round trip.
struct AbortGuard {
    sink: Arc<EventSink>,
    path: String,
    client_ip: String,
    armed: bool,
}

impl AbortGuard {
    fn new(sink: Arc<EventSink>, path: &str, client_ip: &str) -> Self {
        Self {
            sink,
            path: path.to_string(),
            client_ip: client_ip.to_string(),
            armed: true,
        }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for AbortGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        tracing::warn!(path = %self.path, "Request aborted before completion");
        metrics::record_aborted();
        let record = Record::exception(&self.path, &self.client_ip, "request aborted before completion");
        let sink = self.sink.clone();
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.spawn(async move {
                sink.submit(record).await;
            });
        }
    }
}
