//! Mock job API for poller testing.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::job::Job;
use crate::options::PackageOptions;
use crate::poller::{JobApi, JobApiError};

/// One scripted response to a status fetch.
#[derive(Debug, Clone)]
enum ScriptedResponse {
    Job(Box<Job>),
    TransportError(String),
}

/// Mock implementation of the JobApi trait.
///
/// Status fetches replay scripted responses in order; the final scripted
/// response is sticky, so a poller can keep observing an unchanged job.
#[derive(Debug, Clone, Default)]
pub struct MockJobApi {
    script: Arc<RwLock<VecDeque<ScriptedResponse>>>,
    download: Arc<RwLock<Option<Result<Vec<u8>, String>>>>,
    enqueued: Arc<RwLock<Vec<PackageOptions>>>,
    fetch_count: Arc<AtomicUsize>,
}

impl MockJobApi {
    /// Create a mock with an empty script. An unscripted fetch returns a
    /// transport error.
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the next status-fetch response.
    pub async fn push_job(&self, job: Job) {
        self.script
            .write()
            .await
            .push_back(ScriptedResponse::Job(Box::new(job)));
    }

    /// Script a transport failure for the next status fetch.
    pub async fn push_status_error(&self, message: impl Into<String>) {
        self.script
            .write()
            .await
            .push_back(ScriptedResponse::TransportError(message.into()));
    }

    /// Set the archive bytes returned by `download_archive`.
    pub async fn set_download(&self, bytes: Vec<u8>) {
        *self.download.write().await = Some(Ok(bytes));
    }

    /// Make `download_archive` fail.
    pub async fn set_download_error(&self, message: impl Into<String>) {
        *self.download.write().await = Some(Err(message.into()));
    }

    /// Number of status fetches performed.
    pub fn fetch_count(&self) -> usize {
        self.fetch_count.load(Ordering::SeqCst)
    }

    /// Options submitted via `enqueue`.
    pub async fn enqueued_options(&self) -> Vec<PackageOptions> {
        self.enqueued.read().await.clone()
    }
}

#[async_trait]
impl JobApi for MockJobApi {
    async fn enqueue(&self, options: &PackageOptions) -> Result<String, JobApiError> {
        let mut enqueued = self.enqueued.write().await;
        enqueued.push(options.clone());
        Ok(format!("pkg-mock-{}", enqueued.len()))
    }

    async fn get_job(&self, job_id: &str) -> Result<Job, JobApiError> {
        self.fetch_count.fetch_add(1, Ordering::SeqCst);

        let mut script = self.script.write().await;
        let response = if script.len() > 1 {
            script.pop_front()
        } else {
            // Sticky last response: the job record does not disappear just
            // because the poller looked at it twice.
            script.front().cloned()
        };

        match response {
            Some(ScriptedResponse::Job(job)) => Ok(*job),
            Some(ScriptedResponse::TransportError(message)) => {
                Err(JobApiError::Transport(message))
            }
            None => Err(JobApiError::NotFound(job_id.to_string())),
        }
    }

    async fn download_archive(&self, job_id: &str) -> Result<Vec<u8>, JobApiError> {
        match self.download.read().await.clone() {
            Some(Ok(bytes)) => Ok(bytes),
            Some(Err(message)) => Err(JobApiError::Transport(message)),
            None => Err(JobApiError::NotFound(job_id.to_string())),
        }
    }
}
