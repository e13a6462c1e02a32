//! Package job API handlers.

use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::sync::Arc;
use tokio_util::io::ReaderStream;
use tracing::{info, warn};

use packsmith_core::{archive_download_name, JobStatus, OrchestratorError, PackageOptions};

use crate::state::AppState;

/// Error response
#[derive(Debug, Serialize)]
pub struct JobErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<String>,
}

impl JobErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            issues: vec![],
        }
    }
}

/// Enqueue a package build job.
///
/// Returns the created job; the client polls it by id until terminal.
pub async fn enqueue_job(
    State(state): State<Arc<AppState>>,
    Json(options): Json<PackageOptions>,
) -> Response {
    info!("Received package job request for {}", options.pwa_url);

    match state.orchestrator().enqueue(options) {
        Ok(job) => {
            info!("Package job enqueued with ID {}", job.id);
            (StatusCode::CREATED, Json(job)).into_response()
        }
        Err(OrchestratorError::Validation(err)) => {
            warn!("Package request was invalid: {}", err);
            (
                StatusCode::BAD_REQUEST,
                Json(JobErrorResponse {
                    error: "invalid package options".to_string(),
                    issues: err.issues.iter().map(|i| i.message.clone()).collect(),
                }),
            )
                .into_response()
        }
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(JobErrorResponse::new(e.to_string())),
        )
            .into_response(),
    }
}

/// Get a job by ID, including status, logs and errors.
pub async fn get_job(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Response {
    match state.job_store().get(&id) {
        Ok(Some(job)) => Json(job).into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(JobErrorResponse::new(format!("Job not found: {}", id))),
        )
            .into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(JobErrorResponse::new(e.to_string())),
        )
            .into_response(),
    }
}

/// Stream the assembled archive of a completed job.
///
/// Fails distinctly when the job is unknown (404), not yet completed (409)
/// or its artifacts have already been cleaned up (410).
pub async fn download_archive(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Response {
    let job = match state.job_store().get(&id) {
        Ok(Some(job)) => job,
        Ok(None) => {
            return (
                StatusCode::NOT_FOUND,
                Json(JobErrorResponse::new(format!("Job not found: {}", id))),
            )
                .into_response();
        }
        Err(e) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(JobErrorResponse::new(e.to_string())),
            )
                .into_response();
        }
    };

    if job.status != JobStatus::Completed {
        return (
            StatusCode::CONFLICT,
            Json(JobErrorResponse::new(format!(
                "Job is not ready for download. Current status: {}",
                job.status
            ))),
        )
            .into_response();
    }

    let Some(archive_path) = job.archive_path else {
        return (
            StatusCode::GONE,
            Json(JobErrorResponse::new(
                "No archive is recorded for this job",
            )),
        )
            .into_response();
    };

    let file = match tokio::fs::File::open(&archive_path).await {
        Ok(file) => file,
        Err(e) => {
            warn!("Archive {} no longer available: {}", archive_path, e);
            return (
                StatusCode::GONE,
                Json(JobErrorResponse::new(
                    "The archive for this job has expired and was deleted",
                )),
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
