//! Per-job status tracking
//!
//! A [`JobTracker`] follows one job id. [`JobTracker::start`] spawns the
//! polling task: it queries the status immediately, then again after every
//! interval until the job reaches a terminal status. Polling is
//! single-flight (the next query starts only after the previous one has
//! returned) and stops as soon as the returned [`PollHandle`] is cancelled
//! or dropped. The latest state is published on a `watch` channel.

use rand::SeedableRng;
use rand::rngs::StdRng;
use session::SessionError;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::{Mutex as AsyncMutex, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::backoff::PollSchedule;
use crate::client::JobsClient;
use crate::error::{JobError, JobResult};
use crate::models::{JobRecord, JobStatus, RetryAccepted};

/// What the presentation layer sees of a tracked job
#[derive(Debug, Clone, PartialEq)]
pub struct TrackerState {
    /// Last record returned by the backend
    pub record: Option<JobRecord>,
    /// Last status query failure; cleared by the next successful query
    pub poll_error: Option<String>,
    /// Last failed retry request
    pub retry_error: Option<String>,
    /// True until the first status arrives and while a retry is in flight
    pub loading: bool,
}

impl Default for TrackerState {
    fn default() -> Self {
        Self {
            record: None,
            poll_error: None,
            retry_error: None,
            loading: true,
        }
    }
}

impl TrackerState {
    pub fn status(&self) -> Option<JobStatus> {
        self.record.as_ref().map(|r| r.status)
    }

    pub fn progress(&self) -> u8 {
        self.record.as_ref().map_or(0, |r| r.progress)
    }

    pub fn can_retry(&self) -> bool {
        self.record.as_ref().is_some_and(JobRecord::can_retry)
    }
}

/// Cancels the polling started by [`JobTracker::start`], including polling
/// resumed later by a retry. Dropping the handle cancels as well.
#[must_use = "polling stops when the handle is dropped"]
#[derive(Debug)]
pub struct PollHandle {
    token: CancellationToken,
}

impl PollHandle {
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

enum PollOutcome {
    Running,
    Finished(JobStatus),
    Unreachable,
    SessionEnded,
    Skipped,
}

impl PollOutcome {
    fn of(result: &JobResult<JobRecord>) -> Self {
        match result {
            Ok(record) if record.status.is_terminal() => PollOutcome::Finished(record.status),
            Ok(_) => PollOutcome::Running,
            Err(JobError::Session(SessionError::NotAuthenticated)) => PollOutcome::SessionEnded,
            Err(e) if e.ended_session() => PollOutcome::SessionEnded,
            Err(_) => PollOutcome::Unreachable,
        }
    }
}

struct Shared {
    job_id: String,
    client: JobsClient,
    schedule: PollSchedule,
    state: watch::Sender<TrackerState>,
    in_flight: AsyncMutex<()>,
}

impl Shared {
    /// One status query. The caller holds `in_flight`.
    async fn fetch(&self, cancel: &CancellationToken) -> JobResult<JobRecord> {
        let result = self.client.fetch_status(&self.job_id).await;

        if cancel.is_cancelled() {
            return result;
        }

        if let Err(e) = &result {
            warn!("Status query for job {} failed: {}", self.job_id, e);
        }
        self.state.send_modify(|state| {
            state.loading = false;
            match &result {
                Ok(record) => {
                    state.record = Some(record.clone());
                    state.poll_error = None;
                }
                Err(e) => state.poll_error = Some(e.to_string()),
            }
        });
        result
    }
}

async fn poll_loop(shared: Arc<Shared>, cancel: CancellationToken) {
    let mut rng = StdRng::from_entropy();
    let mut failures: u32 = 0;

    debug!("Polling job {}", shared.job_id);
    loop {
        let outcome = match shared.in_flight.try_lock() {
            Ok(_guard) => tokio::select! {
                _ = cancel.cancelled() => break,
                result = shared.fetch(&cancel) => PollOutcome::of(&result),
            },
            Err(_) => {
                debug!("Status query for job {} still running, skipping tick", shared.job_id);
                PollOutcome::Skipped
            }
        };

        match outcome {
            PollOutcome::Finished(status) => {
                info!("Job {} reached {}, polling stopped", shared.job_id, status);
                break;
            }
            PollOutcome::SessionEnded => {
                warn!("Session ended, polling of job {} stopped", shared.job_id);
                break;
            }
            PollOutcome::Running => failures = 0,
            PollOutcome::Unreachable => failures = failures.saturating_add(1),
            PollOutcome::Skipped => {}
        }

        let delay = shared.schedule.next_delay(failures, &mut rng);
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(delay) => {}
        }
    }
    debug!("Polling task for job {} finished", shared.job_id);
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Status tracker for one submitted job
pub struct JobTracker {
    shared: Arc<Shared>,
    /// Cancelled when the tracker is dropped
    lifetime: CancellationToken,
    /// Token of the current `start`; resumed polling runs under it too
    active: Mutex<Option<CancellationToken>>,
    task: Mutex<Option<JoinHandle<()>>>,
    /// Held for the whole of a retry request
    retry_in_flight: AsyncMutex<()>,
}

impl JobTracker {
    pub fn new(client: JobsClient, job_id: impl Into<String>) -> Self {
        let config = client.session().config();
        let schedule = PollSchedule::new(config.poll_interval(), config.poll_max_backoff());
        let (state, _) = watch::channel(TrackerState::default());

        Self {
            shared: Arc::new(Shared {
                job_id: job_id.into(),
                client,
                schedule,
                state,
                in_flight: AsyncMutex::new(()),
            }),
            lifetime: CancellationToken::new(),
            active: Mutex::new(None),
            task: Mutex::new(None),
            retry_in_flight: AsyncMutex::new(()),
        }
    }

    pub fn job_id(&self) -> &str {
        &self.shared.job_id
    }

    /// Start polling. Must be called inside a tokio runtime.
    ///
    /// Starting again replaces the previous polling.
    pub fn start(&self) -> PollHandle {
        let token = self.lifetime.child_token();
        if let Some(previous) = lock(&self.active).replace(token.clone()) {
            previous.cancel();
        }
        self.spawn_poller(&token);
        PollHandle { token }
    }

    fn spawn_poller(&self, parent: &CancellationToken) {
        let task = tokio::spawn(poll_loop(Arc::clone(&self.shared), parent.child_token()));
        if let Some(previous) = lock(&self.task).replace(task) {
            previous.abort();
        }
    }

    /// Whether a polling task is currently running
    pub fn is_polling(&self) -> bool {
        lock(&self.task)
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }

    pub fn subscribe(&self) -> watch::Receiver<TrackerState> {
        self.shared.state.subscribe()
    }

    pub fn state(&self) -> TrackerState {
        self.shared.state.borrow().clone()
    }

    /// Query the status now, waiting for a query already in flight
    pub async fn fetch_status(&self) -> JobResult<JobRecord> {
        let _guard = self.shared.in_flight.lock().await;
        self.shared.fetch(&self.lifetime).await
    }

    /// Request another processing run of a failed job and resume polling
    pub async fn retry(&self) -> JobResult<RetryAccepted> {
        let job_id = self.job_id().to_string();
        let not_retryable = |reason: String| JobError::NotRetryable {
            job_id: job_id.clone(),
            reason,
        };

        if self.lifetime.is_cancelled() {
            return Err(not_retryable("tracker was dismissed".to_string()));
        }
        // Each accepted retry spends one of the server's attempts
        let Ok(_retrying) = self.retry_in_flight.try_lock() else {
            return Err(not_retryable("retry already in flight".to_string()));
        };
        let record = self.shared.state.borrow().record.clone();
        let Some(record) = record else {
            return Err(not_retryable("status not known yet".to_string()));
        };
        if record.status != JobStatus::Failed {
            return Err(not_retryable(format!("status is {}", record.status)));
        }
        if record.retry_count >= record.max_retries {
            return Err(not_retryable(format!(
                "retry limit reached ({}/{})",
                record.retry_count, record.max_retries
            )));
        }

        info!(
            "Retrying job {} (attempt {} of {})",
            job_id,
            record.retry_count + 1,
            record.max_retries
        );
        self.shared.state.send_modify(|state| {
            state.loading = true;
            state.retry_error = None;
        });

        let result = self.shared.client.retry(&job_id).await;
        if self.lifetime.is_cancelled() {
            return result;
        }

        match result {
            Ok(accepted) => {
                self.shared.state.send_modify(|state| {
                    if let Some(record) = state.record.as_mut() {
                        record.status = JobStatus::Pending;
                        record.progress = 0;
                        record.last_error = None;
                    }
                    state.poll_error = None;
                    state.loading = false;
                });

                let active = lock(&self.active)
                    .clone()
                    .filter(|token| !token.is_cancelled());
                match active {
                    Some(token) => self.spawn_poller(&token),
                    None => debug!("Job {} is not being polled, not resuming", job_id),
                }
                Ok(accepted)
            }
            Err(e) => {
                warn!("Retry of job {} failed: {}", job_id, e);
                self.shared.state.send_modify(|state| {
                    state.loading = false;
                    state.retry_error = Some(e.to_string());
                });
                Err(e)
            }
        }
    }

    /// Stop all polling for good
    pub fn dismiss(&self) {
        self.lifetime.cancel();
    }
}

impl Drop for JobTracker {
    fn drop(&mut self) {
        self.lifetime.cancel();
    }
}
