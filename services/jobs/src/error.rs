//! Custom error types for job tracking

use session::SessionError;
use thiserror::Error;

/// Custom error type for job operations
#[derive(Error, Debug)]
pub enum JobError {
    /// Failure of the authenticated call itself (transport, or a fatal auth failure)
    #[error(transparent)]
    Session(#[from] SessionError),

    /// The jobs endpoint answered with a non-success status
    #[error("{operation} failed with status {status}: {detail}")]
    Rejected {
        operation: &'static str,
        status: u16,
        detail: String,
    },

    /// The response body could not be decoded
    #[error("Malformed response from {operation}: {source}")]
    Decode {
        operation: &'static str,
        #[source]
        source: reqwest::Error,
    },

    /// Retry requested for a job that is not failed or has no retries left
    #[error("Job {job_id} cannot be retried: {reason}")]
    NotRetryable { job_id: String, reason: String },

    /// Upload rejected before sending
    #[error("Invalid upload: {0}")]
    Validation(String),
}

impl JobError {
    /// Whether the underlying session ended while serving this call
    pub fn ended_session(&self) -> bool {
        matches!(self, JobError::Session(e) if e.is_fatal())
    }
}

/// Type alias for job results
pub type JobResult<T> = Result<T, JobError>;
