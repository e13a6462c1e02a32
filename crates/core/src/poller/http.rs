//! HTTP implementation of the job API client.

use async_trait::async_trait;
use std::time::Duration;

use crate::job::Job;
use crate::options::PackageOptions;

use super::types::{JobApi, JobApiError};

/// Job API client over the packaging server's HTTP endpoints.
pub struct HttpJobApi {
    client: reqwest::Client,
    base_url: String,
}

impl HttpJobApi {
    /// Create a client against a server base URL, e.g.
    /// `https://packsmith.example.com/api/v1`.
    pub fn new(base_url: impl Into<String>) -> Result<Self, JobApiError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| JobApiError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn error_from(response: reqwest::Response, job_id: Option<&str>) -> JobApiError {
        let status = response.status().as_u16();
        if status == 404 {
            return JobApiError::NotFound(job_id.unwrap_or("<unknown>").to_string());
        }
        let body = response.text().await.unwrap_or_default();
        JobApiError::Http { status, body }
    }
}

#[async_trait]
impl JobApi for HttpJobApi {
    async fn enqueue(&self, options: &PackageOptions) -> Result<String, JobApiError> {
        let response = self
            .client
            .post(self.url("jobs"))
            .json(options)
            .send()
            .await
            .map_err(|e| JobApiError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::error_from(response, None).await);
        }

        let job: Job = response
            .json()
            .await
            .map_err(|e| JobApiError::Decode(e.to_string()))?;
        Ok(job.id)
    }

    async fn get_job(&self, job_id: &str) -> Result<Job, JobApiError> {
        let response = self
            .client
            .get(self.url(&format!("jobs/{}", job_id)))
            .send()
            .await
            .map_err(|e| JobApiError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::error_from(response, Some(job_id)).await);
        }

        response
            .json()
            .await
            .map_err(|e| JobApiError::Decode(e.to_string()))
    }

    async fn download_archive(&self, job_id: &str) -> Result<Vec<u8>, JobApiError> {
        let response = self
            .client
            .get(self.url(&format!("jobs/{}/download", job_id)))
            .send()
            .await
            .map_err(|e| JobApiError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::error_from(response, Some(job_id)).await);
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| JobApiError::Transport(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let api = HttpJobApi::new("http://localhost:8080/api/v1/").unwrap();
        assert_eq!(api.url("jobs"), "http://localhost:8080/api/v1/jobs");
        assert_eq!(
            api.url("jobs/pkg-1/download"),
            "http://localhost:8080/api/v1/jobs/pkg-1/download"
        );
    }
}
