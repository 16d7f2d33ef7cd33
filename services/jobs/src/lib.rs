//! Asynchronous processing job tracking
//!
//! Submits recorded session audio, then follows the resulting server-side
//! job until it completes, fails or is skipped. Failed jobs can be retried
//! while the backend still allows it.
//!
//! ```rust,no_run
//! use common::ClientConfig;
//! use jobs::{AudioUpload, JobTracker, JobsClient};
//! use session::{LogOnlyNavigator, SessionManager};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let session = SessionManager::from_config(ClientConfig::from_env()?, Arc::new(LogOnlyNavigator))?;
//!     session.login("therapist@clinic.org", "secret").await?;
//!
//!     let client = JobsClient::new(session);
//!     let submitted = client
//!         .submit_upload(&AudioUpload {
//!             file_name: "session.wav".to_string(),
//!             audio: std::fs::read("session.wav")?,
//!             patient_email: "patient@mail.com".to_string(),
//!             therapist_email: "therapist@clinic.org".to_string(),
//!             session_date: "2024-05-02".to_string(),
//!             notes: String::new(),
//!         })
//!         .await?;
//!
//!     let tracker = JobTracker::new(client, submitted.job_id);
//!     let _polling = tracker.start();
//!     let mut updates = tracker.subscribe();
//!     while updates.changed().await.is_ok() {
//!         let state = updates.borrow_and_update().clone();
//!         println!("{:?} {}%", state.status(), state.progress());
//!         if state.status().is_some_and(|s| s.is_terminal()) {
//!             break;
//!         }
//!     }
//!     Ok(())
//! }
//! ```

mod backoff;
pub mod client;
pub mod error;
pub mod models;
pub mod tracker;

pub use backoff::PollSchedule;
pub use client::JobsClient;
pub use error::{JobError, JobResult};
pub use models::{AudioUpload, JobRecord, JobStatus, RetryAccepted, SubmittedJob};
pub use tracker::{JobTracker, PollHandle, TrackerState};
