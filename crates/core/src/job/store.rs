//! Job storage trait and types.

use std::fmt;

use crate::job::{Job, JobStatus};
use crate::options::PackageOptions;

/// Error type for job store operations.
#[derive(Debug)]
pub enum JobError {
    /// Job not found.
    NotFound(String),
    /// Cannot perform operation due to current status. Guards the monotonic
    /// state machine: no backward transitions, no writes after terminal.
    InvalidState {
        job_id: String,
        current_status: String,
        operation: String,
    },
    /// Database error.
    Database(String),
}

impl fmt::Display for JobError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobError::NotFound(id) => write!(f, "Job not found: {}", id),
            JobError::InvalidState {
                job_id,
                current_status,
                operation,
            } => write!(
                f,
                "Cannot {} job {}: current status is {}",
                operation, job_id, current_status
            ),
            JobError::Database(msg) => write!(f, "Database error: {}", msg),
        }
    }
}

impl std::error::Error for JobError {}

/// Filter for querying jobs.
#[derive(Debug, Clone)]
pub struct JobFilter {
    /// Filter by status.
    pub status: Option<JobStatus>,
    /// Maximum number of results.
    pub limit: i64,
    /// Offset for pagination.
    pub offset: i64,
}

impl JobFilter {
    /// Create a new filter with defaults.
    pub fn new() -> Self {
        Self {
            status: None,
            limit: 100,
            offset: 0,
        }
    }

    /// Filter by status.
    pub fn with_status(mut self, status: JobStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Set limit.
    pub fn with_limit(mut self, limit: i64) -> Self {
        self.limit = limit;
        self
    }

    /// Set offset.
    pub fn with_offset(mut self, offset: i64) -> Self {
        self.offset = offset;
        self
    }
}

impl Default for JobFilter {
    fn default() -> Self {
        Self::new()
    }
}

/// Trait for job storage backends.
///
/// The store is the only shared state between a build worker and its
/// observers: many readers per job, exactly one writer. Terminal mutations
/// (`complete`, `fail`) carry the final log line so a stopped job always
/// has its outcome recorded in `logs`.
pub trait JobStore: Send + Sync {
    /// Create a new job with the given initial status.
    ///
    /// `Queued` for builds handed to the background worker, `InProgress`
    /// for builds run inline by the caller.
    fn create(&self, options: PackageOptions, initial: JobStatus) -> Result<Job, JobError>;

    /// Get a job by ID.
    fn get(&self, id: &str) -> Result<Option<Job>, JobError>;

    /// List jobs matching the filter, oldest first.
    fn list(&self, filter: &JobFilter) -> Result<Vec<Job>, JobError>;

    /// Count jobs matching the filter.
    fn count(&self, filter: &JobFilter) -> Result<i64, JobError>;

    /// Atomically claim the oldest `Queued` job, transitioning it to
    /// `InProgress`. Returns `None` when the queue is empty. At most one
    /// caller can claim any given job, which enforces the single-writer
    /// rule for the rest of its lifetime.
    fn claim_next_queued(&self) -> Result<Option<Job>, JobError>;

    /// Append a log line to an active job.
    fn append_log(&self, id: &str, line: &str) -> Result<Job, JobError>;

    /// Increment the retry counter of an active job.
    fn increment_retry(&self, id: &str) -> Result<Job, JobError>;

    /// Transition an active job to `Completed`, recording artifacts, the
    /// assembled archive path, and a final log line.
    fn complete(
        &self,
        id: &str,
        artifacts: Vec<String>,
        archive_path: Option<String>,
        final_log: &str,
    ) -> Result<Job, JobError>;

    /// Transition an active job to `Failed`, recording errors and a final
    /// log line.
    fn fail(&self, id: &str, errors: Vec<String>, final_log: &str) -> Result<Job, JobError>;

    /// Permanently delete a job. Returns the deleted job if found.
    fn delete(&self, id: &str) -> Result<Job, JobError>;
}
