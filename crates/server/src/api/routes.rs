use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::{fetch_check, handlers, jobs, packages};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    let api_routes = Router::new()
        // Health and config
        .route("/health", get(handlers::health))
        .route("/config", get(handlers::get_config))
        // Package build jobs (asynchronous path)
        .route("/jobs", post(jobs::enqueue_job))
        .route("/jobs/{id}", get(jobs::get_job))
        .route("/jobs/{id}/download", get(jobs::download_archive))
        // Synchronous build-and-zip (legacy path)
        .route("/packages", post(packages::generate_package))
        // Diagnostic fetch of user-supplied URLs
        .route("/fetch-check", get(fetch_check::fetch_check));

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/metrics", get(handlers::metrics))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
