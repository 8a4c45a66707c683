//! Progress receiver handlers

use axum::{
    extract::{Path, State},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::Local;
use serde_json::Value;
use std::collections::BTreeMap;

use crate::http::{
    models::{HealthResponse, HttpServerError, StatusResponse},
    state::AppState,
};

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route(
            "/webhook/progress",
            get(all_progress_handler).post(receive_progress_handler),
        )
        .route("/webhook/progress/:envelope_id", get(progress_handler))
        .route("/health", get(health_handler))
        .with_state(state)
}

/// POST /webhook/progress
async fn receive_progress_handler(
    State(state): State<AppState>,
    Json(payload): Json<Value>,
) -> Result<Json<StatusResponse>, HttpServerError> {
    state.record_request("/webhook/progress");

    if !payload.is_object() {
        return Err(HttpServerError::InvalidRequest(
            "payload must be a JSON object".into(),
        ));
    }

    let status = payload
        .get("status")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let key = state.store.insert(payload);
    tracing::debug!(target: "docflow.listen", key = %key, status = %status, "progress received");

    Ok(Json(StatusResponse::received()))
}

/// GET /webhook/progress/{envelope_id}
async fn progress_handler(
    State(state): State<AppState>,
    Path(envelope_id): Path<String>,
) -> Response {
    state.record_request("/webhook/progress/{envelope_id}");

    match state.store.get(&envelope_id) {
        Some(payload) => Json(payload).into_response(),
        None => Json(StatusResponse::not_found()).into_response(),
    }
}

/// GET /webhook/progress
async fn all_progress_handler(State(state): State<AppState>) -> Json<BTreeMap<String, Value>> {
    state.record_request("/webhook/progress");
    Json(state.store.snapshot())
}

/// GET /health
async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let stats = state.stats.read().unwrap_or_else(|e| e.into_inner());

    Json(HealthResponse {
        status: "healthy".into(),
        session_id: state.session_id.clone(),
        uptime_seconds: stats.uptime_seconds(),
        requests_handled: stats.requests_total,
        payloads_stored: state.store.len(),
        timestamp: Local::now().to_rfc3339(),
    })
}
