//! HTTP client for the asynchronous audio processing endpoints
//!
//! Every call goes through [`SessionManager::authenticated_request`], so
//! expired or revoked tokens are recovered the same way as everywhere else.

use serde::de::DeserializeOwned;
use session::SessionManager;
use tracing::{debug, info};

use crate::error::{JobError, JobResult};
use crate::models::{AudioUpload, JobRecord, RetryAccepted, SubmittedJob};

/// Jobs service client
#[derive(Clone)]
pub struct JobsClient {
    session: SessionManager,
}

impl JobsClient {
    pub fn new(session: SessionManager) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    /// Submit recorded audio for asynchronous processing
    pub async fn submit_upload(&self, upload: &AudioUpload) -> JobResult<SubmittedJob> {
        upload.validate()?;

        let url = self.session.config().upload_url();
        info!(
            "Uploading {} ({} bytes) for processing",
            upload.file_name,
            upload.audio.len()
        );

        let response = self
            .session
            .authenticated_request(|http| http.post(url.as_str()).multipart(upload.to_form()))
            .await?;

        let submitted: SubmittedJob = Self::decode(response, "upload").await?;
        info!("Upload accepted as job {}", submitted.job_id);
        Ok(submitted)
    }

    /// Fetch the current record of a job
    pub async fn fetch_status(&self, job_id: &str) -> JobResult<JobRecord> {
        let url = self.session.config().upload_status_url(job_id);

        let response = self
            .session
            .authenticated_request(|http| http.get(url.as_str()))
            .await?;

        let record: JobRecord = Self::decode(response, "status query").await?;
        debug!(
            "Job {} is {} ({}%)",
            record.job_id, record.status, record.progress
        );
        Ok(record.normalized())
    }

    /// Ask the backend to run a failed job again
    pub async fn retry(&self, job_id: &str) -> JobResult<RetryAccepted> {
        let url = self.session.config().retry_processing_url(job_id);

        let response = self
            .session
            .authenticated_request(|http| http.post(url.as_str()))
            .await?;

        let accepted: RetryAccepted = Self::decode(response, "retry").await?;
        info!("Retry of job {} accepted", job_id);
        Ok(accepted)
    }

    async fn decode<T: DeserializeOwned>(
        response: reqwest::Response,
        operation: &'static str,
    ) -> JobResult<T> {
        let response = Self::ensure_success(response, operation).await?;
        response
            .json::<T>()
            .await
            .map_err(|source| JobError::Decode { operation, source })
    }

    /// Checks HTTP response status; returns the response on success or an error with details.
    async fn ensure_success(
        response: reqwest::Response,
        operation: &'static str,
    ) -> JobResult<reqwest::Response> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let detail = response.text().await.unwrap_or_default();
        Err(JobError::Rejected {
            operation,
            status,
            detail,
        })
    }
}
