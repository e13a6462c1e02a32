//! Synchronous build-and-zip handler.
//!
//! Runs the whole build inside the request and streams the zip back.
//! Kept for clients that cannot poll; long builds make the asynchronous
//! job path the better default.

use axum::{
    body::Body,
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;
use tokio_util::io::ReaderStream;
use tracing::{error, info};

use packsmith_core::{archive_download_name, OrchestratorError, PackageOptions};

use super::jobs::JobErrorResponse;
use crate::state::AppState;

/// Build a package inline and send back the assembled zip.
pub async fn generate_package(
    State(state): State<Arc<AppState>>,
    Json(options): Json<PackageOptions>,
) -> Response {
    info!("Received synchronous package request for {}", options.pwa_url);

    let job = match state.orchestrator().run_build(options).await {
        Ok(job) => job,
        Err(OrchestratorError::Validation(err)) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(JobErrorResponse {
                    error: "invalid package options".to_string(),
                    issues: err.issues.iter().map(|i| i.message.clone()).collect(),
                }),
            )
                .into_response();
        }
        Err(e @ OrchestratorError::Build { .. }) => {
            error!("Error generating app package: {}", e);
            return (
                StatusCode::BAD_GATEWAY,
                Json(JobErrorResponse::new(format!(
                    "Error generating app package: {}",
                    e
                ))),
            )
                .into_response();
        }
        Err(e) => {
            // Archive assembly and infrastructure failures: the build did
            // not necessarily fail, but there is nothing to send back.
            error!("Package request failed after build phase: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(JobErrorResponse::new(e.to_string())),
            )
                .into_response();
        }
    };

    let Some(archive_path) = job.archive_path else {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(JobErrorResponse::new("No archive was produced")),
        )
            .into_response();
    };

    let file = match tokio::fs::File::open(&archive_path).await {
        Ok(file) => file,
        Err(e) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(JobErrorResponse::new(format!(
                    "Archive disappeared before it could be sent: {}",
                    e
                ))),
            )
                .into_response();
        }
    };

    let file_name = archive_download_name(&job.options.host);
    let body = Body::from_stream(ReaderStream::new(file));

    Response::builder()
        .header(header::CONTENT_TYPE, "application/zip")
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", file_name),
        )
        .body(body)
        .unwrap_or_else(|e| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("failed to build response: {}", e),
            )
                .into_response()
        })
}
