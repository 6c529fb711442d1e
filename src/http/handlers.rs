//! Service facade handlers.
//!
//! # Responsibilities
//! - Accept arbitrary event mappings on `POST /apm/track_event/`
//! - Answer liveness probes on `GET /health` without touching the sink
//! - Validate and persist contact submissions on `POST /contact`
//! - Render the fallback 404 shape
//!
//! # Design Decisions
//! - Handlers never build records directly; the normalizer owns the
//!   envelope so submitted payloads cannot forge a `kind`
//! - The health handler holds no sink reference at all, which keeps "the
//!   probe never writes" a structural property rather than a convention

use axum::extract::{Form, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use axum::Json;
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::http::server::AppState;
use crate::telemetry::normalizer::{self, ContactSubmission, ValidationError};

/// Acknowledgment returned by `track_event`.
#[derive(Debug, Serialize)]
pub struct TrackEventResponse {
    pub status: &'static str,
    pub message: &'static str,
}

/// Liveness payload returned by `health`.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub time: String,
}

/// `POST /apm/track_event/` accepts any JSON object and persists it as a
/// `custom_event` record. Malformed JSON and non-object bodies are rejected
/// by extraction before this handler runs.
pub async fn track_event(
    State(state): State<AppState>,
    Json(body): Json<Map<String, Value>>,
) -> Json<TrackEventResponse> {
    let record = normalizer::normalize_event(body);
    state.sink.submit(record).await;
    Json(TrackEventResponse {
        status: "success",
        message: "Event tracked",
    })
}

/// `GET /health` reports liveness and the current server time.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "UP",
        time: Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
    })
}

/// `POST /contact` validates the submission, persists it, and redirects the
/// browser to the configured thank-you target.
pub async fn submit_contact(
    State(state): State<AppState>,
    Form(submission): Form<ContactSubmission>,
) -> Response {
    match normalizer::normalize_form(submission) {
        Ok(record) => {
            state.sink.submit(record).await;
            let runtime = state.runtime.load();
            Redirect::to(&runtime.redirect_url).into_response()
        }
        Err(errors) => {
            tracing::debug!(error_count = errors.len(), "Rejected contact submission");
            validation_response(&errors)
        }
    }
}

/// 422 body listing every failed field.
fn validation_response(errors: &[ValidationError]) -> Response {
    let detail: Vec<Value> = errors
        .iter()
        .map(|error| json!({ "field": error.field(), "error": error.to_string() }))
        .collect();
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        Json(json!({ "status": "error", "detail": detail })),
    )
        .into_response()
}

/// Fallback for unmatched paths.
pub async fn not_found() -> Response {
    (StatusCode::NOT_FOUND, Json(json!({ "detail": "Not Found" }))).into_response()
}
