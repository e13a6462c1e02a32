//! Job poller implementation.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::job::{Job, JobStatus};
use crate::options::PackageOptions;

use super::config::PollerConfig;
use super::types::{JobApi, JobApiError, PollOutcome, PollReport};

/// Watches a job until it reaches a terminal state.
///
/// The poll loop and the wall-clock timeout race inside one `select!`:
/// whichever fires first wins and the other is dropped, so no status fetch
/// can happen after the session has ended. A "completed after timed out"
/// transition is never observable from the report.
pub struct JobPoller {
    api: Arc<dyn JobApi>,
    config: PollerConfig,
}

impl JobPoller {
    /// Create a poller over the given job API.
    pub fn new(api: Arc<dyn JobApi>, config: PollerConfig) -> Self {
        Self { api, config }
    }

    /// Poll the job until terminal, timeout, or a status-check failure.
    pub async fn poll(&self, job_id: &str) -> PollReport {
        info!("Polling job {}", job_id);

        let mut logs: Vec<String> = Vec::new();
        let mut last_job: Option<Job> = None;

        let deadline = tokio::time::sleep(self.config.max_wait);
        tokio::pin!(deadline);

        loop {
            tokio::select! {
                _ = &mut deadline => {
                    warn!("Timed out waiting for job {} to complete", job_id);
                    logs.push("timed out waiting for the packaging job to complete".to_string());
                    return PollReport {
                        outcome: PollOutcome::TimedOut,
                        logs,
                        job: last_job,
                    };
                }
                _ = tokio::time::sleep(self.config.poll_interval) => {
                    let job = match self.api.get_job(job_id).await {
                        Ok(job) => job,
                        Err(e) => {
                            warn!("Status check for job {} failed: {}", job_id, e);
                            return PollReport {
                                outcome: PollOutcome::StatusCheckFailed {
                                    error: e.to_string(),
                                },
                                logs,
                                job: last_job,
                            };
                        }
                    };

                    merge_logs(&mut logs, &job.logs);

                    match job.status {
                        JobStatus::Completed => {
                            let outcome = self.handle_completed(&job, &mut logs).await;
                            return PollReport { outcome, logs, job: Some(job) };
                        }
                        JobStatus::Failed => {
                            info!("Job {} failed", job_id);
                            let outcome = PollOutcome::Failed {
                                errors: job.errors.clone(),
                                options: Box::new(job.options.clone()),
                            };
                            return PollReport { outcome, logs, job: Some(job) };
                        }
                        JobStatus::Queued | JobStatus::InProgress => {
                            debug!("Job {} still {}", job_id, job.status);
                            last_job = Some(job);
                        }
                    }
                }
            }
        }
    }

    /// Resubmit options as a brand-new job (the retry affordance for a
    /// failed poll). Never mutates the old record.
    pub async fn resubmit(&self, options: &PackageOptions) -> Result<String, JobApiError> {
        self.api.enqueue(options).await
    }

    async fn handle_completed(&self, job: &Job, logs: &mut Vec<String>) -> PollOutcome {
        let age = job.age(Utc::now());
        if age > self.config.max_artifact_age {
            // The artifacts are probably gone already; surface the manual
            // path instead of a download that would 404 or worse.
            let hint = format!("jobs/{}/download", job.id);
            logs.push(format!(
                "package was generated over {} hours ago; old packages are deleted after a retention period, try fetching {} manually",
                self.config.max_artifact_age.num_hours(),
                hint
            ));
            return PollOutcome::Expired {
                download_hint: hint,
            };
        }

        match self.api.download_archive(&job.id).await {
            Ok(archive) => {
                logs.push("package created successfully, download has begun".to_string());
                PollOutcome::Downloaded { archive }
            }
            Err(e) => {
                warn!("Archive download for job {} failed: {}", job.id, e);
                PollOutcome::DownloadFailed {
                    error: e.to_string(),
                }
            }
        }
    }
}

/// Merges newly observed log lines into the local view, preserving order
/// and never duplicating a line already seen. Re-merging the logs of an
/// unchanged job is a no-op.
pub fn merge_logs(local: &mut Vec<String>, remote: &[String]) {
    for line in remote {
        if !local.iter().any(|existing| existing == line) {
            local.push(line.clone());
        }
    }
}
