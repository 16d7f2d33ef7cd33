//! Background token upkeep
//!
//! A repeated scheduler job looks at the stored access token and refreshes
//! it once it has expired, so interactive requests rarely pay for a
//! refresh-then-retry round trip.

use std::sync::Arc;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info};
use uuid::Uuid;

use crate::credentials::CredentialSet;
use crate::error::{SessionError, SessionResult};
use crate::jwt;
use crate::session::SessionManager;

/// Running upkeep scheduler
pub(crate) struct Upkeep {
    scheduler: JobScheduler,
    job_id: Uuid,
}

fn scheduler_error(e: impl std::fmt::Debug) -> SessionError {
    SessionError::Scheduler(format!("{:?}", e))
}

impl SessionManager {
    /// Start the background token check. Calling it twice is a no-op.
    pub async fn initialize(&self) -> SessionResult<()> {
        let mut slot = self.inner.upkeep.lock().await;
        if slot.is_some() {
            return Ok(());
        }

        let interval = self.inner.config.token_check_interval();
        let scheduler = JobScheduler::new().await.map_err(scheduler_error)?;

        // The job must not keep the manager alive after the last handle is dropped
        let weak = Arc::downgrade(&self.inner);
        let job = Job::new_repeated_async(interval, move |_, _| {
            let weak = weak.clone();
            Box::pin(async move {
                let Some(inner) = weak.upgrade() else {
                    return;
                };
                let manager = SessionManager { inner };
                if let Err(e) = manager.check_and_refresh().await {
                    error!("Background token check failed: {}", e);
                }
            })
        })
        .map_err(scheduler_error)?;

        let job_id = scheduler.add(job).await.map_err(scheduler_error)?;
        scheduler.start().await.map_err(scheduler_error)?;

        info!(
            "Started background token check every {} seconds",
            interval.as_secs()
        );
        *slot = Some(Upkeep { scheduler, job_id });
        Ok(())
    }

    /// Stop the background token check
    pub async fn dispose(&self) -> SessionResult<()> {
        let Some(mut upkeep) = self.inner.upkeep.lock().await.take() else {
            return Ok(());
        };

        upkeep
            .scheduler
            .remove(&upkeep.job_id)
            .await
            .map_err(scheduler_error)?;
        upkeep.scheduler.shutdown().await.map_err(scheduler_error)?;

        info!("Stopped background token check");
        Ok(())
    }

    /// One upkeep pass: refresh if the stored access token has expired.
    ///
    /// Returns whether a refresh was performed.
    pub async fn check_and_refresh(&self) -> SessionResult<bool> {
        let Some(credentials) = CredentialSet::load(self.inner.storage.as_ref())? else {
            return Ok(false);
        };

        if !jwt::is_expired(&credentials.access_token) {
            return Ok(false);
        }

        info!("Background check found an expired access token");
        self.refresh_stale(&credentials.access_token).await?;
        Ok(true)
    }
}
