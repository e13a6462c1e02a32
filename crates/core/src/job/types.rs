//! Core job data types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::options::PackageOptions;

/// Current status of a package build job.
///
/// State machine flow:
/// ```text
/// Queued -> InProgress -> {Completed | Failed}
/// ```
///
/// Transitions are strictly monotonic: a job never moves backward, and no
/// mutation of any kind happens after a terminal status. Inline builds are
/// created directly in `InProgress`; only queued builds pass through
/// `Queued`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Job created, waiting for a build worker to claim it.
    Queued,
    /// A build worker owns the job and is running the toolchain.
    InProgress,
    /// Build finished; artifacts and the assembled archive are recorded.
    Completed,
    /// Build stopped with errors recorded.
    Failed,
}

impl JobStatus {
    /// Returns true if this is a terminal status (no further mutation).
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    /// Returns the status as a string (for filtering and logs).
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::InProgress => "in_progress",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A package build job.
///
/// One record per build attempt; identifiers are never reused. A retry by
/// the user always enqueues a brand-new job carrying a copy of the same
/// options.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Job {
    /// Unique identifier, assigned at enqueue time.
    pub id: String,

    /// Current status.
    pub status: JobStatus,

    /// When the job was created.
    pub created_at: DateTime<Utc>,

    /// Bumped on every status or log mutation. Lets observers detect
    /// staleness without diffing full content.
    pub last_modified_at: DateTime<Utc>,

    /// Append-only build log. Contains at least one entry describing the
    /// terminal outcome once the job stops.
    #[serde(default)]
    pub logs: Vec<String>,

    /// Error descriptions; populated only on `Failed`.
    #[serde(default)]
    pub errors: Vec<String>,

    /// Number of times the safe-URL fallback was invoked.
    #[serde(default)]
    pub retry_count: u32,

    /// The immutable build request captured at enqueue time.
    pub options: PackageOptions,

    /// Paths of produced binary files; non-empty iff `Completed`.
    #[serde(default)]
    pub artifacts: Vec<String>,

    /// Path of the assembled downloadable archive, once built.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archive_path: Option<String>,
}

impl Job {
    /// Returns true if the job has stopped processing.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Age of the job relative to `now`.
    pub fn age(&self, now: DateTime<Utc>) -> chrono::Duration {
        now.signed_duration_since(self.created_at)
    }
}

/// Builds a new job identifier from the requested PWA host.
///
/// The host prefix keeps identifiers greppable in logs; uniqueness comes
/// from the UUID suffix.
pub fn new_job_id(host: &str) -> String {
    let sanitizer = regex_lite::Regex::new(r"[^a-zA-Z0-9.-]").unwrap();
    let safe_host = sanitizer.replace_all(host, "-");
    format!("pkg-{}-{}", safe_host, uuid::Uuid::new_v4())
}
