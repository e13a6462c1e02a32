//! Types for the build orchestrator.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::archive::ArchiveError;
use crate::bundler::BundlerError;
use crate::job::JobError;
use crate::options::ValidationError;

/// Errors that can occur during orchestration.
///
/// Build and archive failures carry the job id: by the time they surface,
/// the terminal job record has already been written and can be fetched for
/// its full logs and errors.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// Options failed structural validation; no job record was created.
    #[error("{0}")]
    Validation(#[from] ValidationError),

    /// Job store error.
    #[error("job store error: {0}")]
    JobStore(#[from] JobError),

    /// Workspace allocation failed.
    #[error("workspace error: {0}")]
    Workspace(#[from] std::io::Error),

    /// The build itself failed; the job record is terminal with details.
    #[error("build failed for job {job_id}: {source}")]
    Build {
        job_id: String,
        #[source]
        source: BundlerError,
    },

    /// The build succeeded but archive assembly failed. Kept distinct from
    /// build failures so the user is not told the build failed when only
    /// packaging did.
    #[error("archive assembly failed for job {job_id}: {source}")]
    Archive {
        job_id: String,
        #[source]
        source: ArchiveError,
    },

    /// Job not found.
    #[error("job not found: {0}")]
    JobNotFound(String),
}

impl OrchestratorError {
    /// Short class name for logs and error boundaries.
    pub fn category(&self) -> &'static str {
        match self {
            OrchestratorError::Validation(_) => "validation",
            OrchestratorError::JobStore(_) => "store",
            OrchestratorError::Workspace(_) => "workspace",
            OrchestratorError::Build { source, .. } => match source {
                BundlerError::AssetFetch { .. } => "network",
                BundlerError::Timeout { .. } => "timeout",
                _ => "toolchain",
            },
            OrchestratorError::Archive { .. } => "archive",
            OrchestratorError::JobNotFound(_) => "not_found",
        }
    }
}

/// Current status of the orchestrator's queue worker.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrchestratorStatus {
    /// Whether the queue worker is running.
    pub running: bool,
    /// Jobs waiting to be claimed.
    pub queued_count: usize,
    /// Jobs currently building (0 or 1 per worker).
    pub in_progress_count: usize,
    /// Jobs finished successfully.
    pub completed_count: usize,
    /// Jobs finished with errors.
    pub failed_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundler::FetchFailureKind;

    #[test]
    fn test_status_default() {
        let status = OrchestratorStatus::default();
        assert!(!status.running);
        assert_eq!(status.queued_count, 0);
    }

    #[test]
    fn test_error_categories() {
        let err = OrchestratorError::Build {
            job_id: "pkg-1".to_string(),
            source: BundlerError::toolchain("exit 1", None),
        };
        assert_eq!(err.category(), "toolchain");

        let err = OrchestratorError::Build {
            job_id: "pkg-1".to_string(),
            source: BundlerError::AssetFetch {
                url: "https://foo.com/icon.png".to_string(),
                kind: FetchFailureKind::Forbidden,
                detail: None,
            },
        };
        assert_eq!(err.category(), "network");

        let err = OrchestratorError::JobNotFound("pkg-2".to_string());
        assert_eq!(err.category(), "not_found");
    }

    #[test]
    fn test_error_display_includes_job_id() {
        let err = OrchestratorError::Build {
            job_id: "pkg-foo-1".to_string(),
            source: BundlerError::toolchain("builder exited with code 1", None),
        };
        assert!(err.to_string().contains("pkg-foo-1"));
    }
}
