//! API handlers.
//!
//! Every handler is a thin read over the query facade. Downstream failures
//! are reported in the body; the only non-2xx answers are 404s.

use axum::{
    extract::{Path, State},
    http::{StatusCode, Uri},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::http::server::AppState;
use crate::observability::metrics;
use crate::query::{HealthReport, ServicesReport, StatusReport};

pub async fn get_health(State(state): State<AppState>) -> Json<HealthReport> {
    metrics::record_request("/health", 200);
    Json(state.facade.get_health())
}

pub async fn get_status(State(state): State<AppState>) -> Json<StatusReport> {
    metrics::record_request("/status", 200);
    Json(state.facade.get_status())
}

pub async fn get_services(State(state): State<AppState>) -> Json<ServicesReport> {
    metrics::record_request("/services", 200);
    Json(state.facade.get_services())
}

pub async fn get_service(State(state): State<AppState>, Path(name): Path<String>) -> Response {
    match state.facade.get_service(&name) {
        Some(detail) => {
            metrics::record_request("/services/{name}", 200);
            Json(detail).into_response()
        }
        None => {
            tracing::debug!(name = %name, "Service not registered");
            metrics::record_request("/services/{name}", 404);
            (
                StatusCode::NOT_FOUND,
                Json(json!({ "error": "Service not found", "name": name })),
            )
                .into_response()
        }
    }
}

pub async fn not_found(uri: Uri) -> impl IntoResponse {
    metrics::record_request("fallback", 404);
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": "Not Found", "path": uri.path() })),
    )
}
