//! Types for the job poller.

use async_trait::async_trait;
use thiserror::Error;

use crate::job::Job;
use crate::options::PackageOptions;

/// Errors from the job API client.
#[derive(Debug, Error)]
pub enum JobApiError {
    /// The transport failed before an HTTP status was obtained.
    #[error("transport error: {0}")]
    Transport(String),

    /// No job exists with the given id.
    #[error("job not found: {0}")]
    NotFound(String),

    /// The server answered with a non-success status.
    #[error("server returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// The response body could not be decoded.
    #[error("failed to decode response: {0}")]
    Decode(String),
}

/// Remote job operations the poller depends on.
#[async_trait]
pub trait JobApi: Send + Sync {
    /// Submit options as a new job; returns the new job's id.
    async fn enqueue(&self, options: &PackageOptions) -> Result<String, JobApiError>;

    /// Fetch the current job record.
    async fn get_job(&self, job_id: &str) -> Result<Job, JobApiError>;

    /// Download the assembled archive of a completed job.
    async fn download_archive(&self, job_id: &str) -> Result<Vec<u8>, JobApiError>;
}

/// How a polling session ended.
#[derive(Debug)]
pub enum PollOutcome {
    /// The job completed and the archive was downloaded.
    Downloaded { archive: Vec<u8> },

    /// The job completed, but too long ago: its artifacts may already be
    /// garbage-collected, so the download was skipped. `download_hint`
    /// names the endpoint for a manual re-fetch attempt.
    Expired { download_hint: String },

    /// The job completed but the archive download failed.
    DownloadFailed { error: String },

    /// The build failed. The options are returned so the caller can offer
    /// a retry, which resubmits them as a brand-new job.
    Failed {
        errors: Vec<String>,
        options: Box<PackageOptions>,
    },

    /// The wall-clock cap elapsed while the job was still running. Says
    /// nothing about the remote job, which may yet complete.
    TimedOut,

    /// A status fetch itself failed; distinct from a failed build.
    StatusCheckFailed { error: String },
}

impl PollOutcome {
    /// Short name for logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            PollOutcome::Downloaded { .. } => "downloaded",
            PollOutcome::Expired { .. } => "expired",
            PollOutcome::DownloadFailed { .. } => "download_failed",
            PollOutcome::Failed { .. } => "failed",
            PollOutcome::TimedOut => "timed_out",
            PollOutcome::StatusCheckFailed { .. } => "status_check_failed",
        }
    }
}

/// The result of one polling session.
#[derive(Debug)]
pub struct PollReport {
    /// How the session ended.
    pub outcome: PollOutcome,
    /// The merged log view accumulated across polls (no duplicates).
    pub logs: Vec<String>,
    /// The last job record observed, if any fetch succeeded.
    pub job: Option<Job>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_names() {
        assert_eq!(PollOutcome::TimedOut.as_str(), "timed_out");
        assert_eq!(
            PollOutcome::StatusCheckFailed {
                error: "boom".to_string()
            }
            .as_str(),
            "status_check_failed"
        );
    }
}
