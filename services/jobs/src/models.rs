//! Job models for the processing pipeline

use chrono::{DateTime, NaiveDateTime, Utc};
use common::validation;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

use crate::error::{JobError, JobResult};

/// Largest audio file the backend accepts
pub const MAX_UPLOAD_BYTES: usize = 100 * 1024 * 1024;

/// Processing status of a job or of one of its steps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Skipped,
    /// Any status this client does not know; polled like a running job
    #[serde(other)]
    Unknown,
}

impl JobStatus {
    /// No automatic polling happens past a terminal status
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Skipped
        )
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::Skipped => "skipped",
            JobStatus::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// One processing pipeline run as reported by the status endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    pub job_id: String,
    pub status: JobStatus,
    #[serde(default)]
    pub transcription_status: Option<JobStatus>,
    /// Percentage, clamped to 0..=100
    #[serde(default, deserialize_with = "percentage")]
    pub progress: u8,
    #[serde(default, deserialize_with = "count")]
    pub retry_count: u32,
    #[serde(default, deserialize_with = "count")]
    pub max_retries: u32,
    #[serde(default, deserialize_with = "timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "timestamp")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "timestamp")]
    pub completed_at: Option<DateTime<Utc>>,
    /// Server error detail, kept only while the job is failed
    #[serde(default, rename = "transcription_error")]
    pub last_error: Option<String>,
    #[serde(default)]
    pub audio_url: Option<String>,
    #[serde(default)]
    pub transcript_url: Option<String>,
    #[serde(default)]
    pub patient_email: Option<String>,
    #[serde(default)]
    pub therapist_email: Option<String>,
    #[serde(default)]
    pub session_date: Option<String>,
}

impl JobRecord {
    /// Drop fields that contradict the status
    pub fn normalized(mut self) -> Self {
        if self.status != JobStatus::Failed {
            self.last_error = None;
        }
        self
    }

    /// Whether a retry may be offered for this job
    pub fn can_retry(&self) -> bool {
        self.status == JobStatus::Failed && self.retry_count < self.max_retries
    }
}

/// Response to an upload submission
#[derive(Debug, Clone, Deserialize)]
pub struct SubmittedJob {
    pub job_id: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub audio_url: Option<String>,
    #[serde(default)]
    pub processing_status: Option<String>,
}

/// Response to a retry request
#[derive(Debug, Clone, Deserialize)]
pub struct RetryAccepted {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub job_id: Option<String>,
}

/// Recorded session audio plus the metadata the upload form carries
#[derive(Clone)]
pub struct AudioUpload {
    pub file_name: String,
    pub audio: Vec<u8>,
    pub patient_email: String,
    pub therapist_email: String,
    /// `YYYY-MM-DD`
    pub session_date: String,
    pub notes: String,
}

impl fmt::Debug for AudioUpload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AudioUpload")
            .field("file_name", &self.file_name)
            .field("audio_bytes", &self.audio.len())
            .field("patient_email", &self.patient_email)
            .field("therapist_email", &self.therapist_email)
            .field("session_date", &self.session_date)
            .finish_non_exhaustive()
    }
}

impl AudioUpload {
    /// Reject uploads the backend would refuse
    pub fn validate(&self) -> JobResult<()> {
        if self.file_name.trim().is_empty() {
            return Err(JobError::Validation("File has no filename".to_string()));
        }
        if self.audio.is_empty() {
            return Err(JobError::Validation("File is empty".to_string()));
        }
        if self.audio.len() > MAX_UPLOAD_BYTES {
            return Err(JobError::Validation(format!(
                "File too large. Maximum size allowed: {}MB",
                MAX_UPLOAD_BYTES / (1024 * 1024)
            )));
        }
        validation::validate_email(&self.patient_email).map_err(JobError::Validation)?;
        validation::validate_email(&self.therapist_email).map_err(JobError::Validation)?;
        validation::validate_session_date(&self.session_date).map_err(JobError::Validation)?;
        Ok(())
    }

    /// Multipart body for one submission attempt
    pub(crate) fn to_form(&self) -> reqwest::multipart::Form {
        let file = reqwest::multipart::Part::bytes(self.audio.clone()).file_name(self.file_name.clone());

        reqwest::multipart::Form::new()
            .part("file", file)
            .text("patient_email", self.patient_email.clone())
            .text("therapist_email", self.therapist_email.clone())
            .text("session_date", self.session_date.clone())
            .text("notes", self.notes.clone())
    }
}

fn percentage<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<f64>::deserialize(deserializer)?;
    Ok(match value {
        Some(p) if p.is_finite() => p.clamp(0.0, 100.0).round() as u8,
        _ => 0,
    })
}

fn count<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<u32>::deserialize(deserializer)?.unwrap_or_default())
}

/// Accepts RFC 3339 and the backend's naive UTC form; unparsable values read as absent
fn timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(raw) = Option::<String>::deserialize(deserializer)? else {
        return Ok(None);
    };
    Ok(parse_timestamp(&raw))
}

pub(crate) fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}
