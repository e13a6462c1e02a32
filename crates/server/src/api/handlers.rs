//! Health, config and metrics handlers.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use prometheus::Encoder;
use serde_json::json;
use std::sync::Arc;

use crate::state::AppState;

/// Health check endpoint that verifies the service is running.
pub async fn health() -> impl IntoResponse {
    Json(json!({ "status": "healthy" }))
}

/// Returns the sanitized service configuration.
pub async fn get_config(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.sanitized_config())
}

/// Prometheus text exposition of all registered metrics.
pub async fn metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let metric_families = state.metrics_registry().gather();
    let mut buffer = Vec::new();
    let encoder = prometheus::TextEncoder::new();

    match encoder.encode(&metric_families, &mut buffer) {
        Ok(()) => (
            StatusCode::OK,
            [(axum::http::header::CONTENT_TYPE, encoder.format_type().to_string())],
            buffer,
        )
            .into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("failed to encode metrics: {}", e),
        )
            .into_response(),
    }
}
