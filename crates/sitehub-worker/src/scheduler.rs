//! Cron scheduler for periodic jobs.

use std::sync::Arc;

use tokio_cron_scheduler::{Job as CronJob, JobScheduler};

use sitehub_core::error::AppError;

use crate::jobs::ScheduledJob;

/// Runs [`ScheduledJob`]s on their cron schedules.
pub struct CronScheduler {
    /// The underlying job scheduler
    scheduler: JobScheduler,
}

impl std::fmt::Debug for CronScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CronScheduler").finish()
    }
}

impl CronScheduler {
    /// Create a new cron scheduler
    pub async fn new() -> Result<Self, AppError> {
        let scheduler = JobScheduler::new()
            .await
            .map_err(|e| AppError::internal(format!("Failed to create scheduler: {e}")))?;

        Ok(Self { scheduler })
    }

    /// Register a job on its own schedule
    pub async fn register(&self, job: Arc<dyn ScheduledJob>) -> Result<(), AppError> {
        let name = job.name().to_string();
        let schedule = job.schedule().to_string();
        let task = Arc::clone(&job);
        let cron = CronJob::new_async(schedule.as_str(), move |_uuid, _lock| {
            let task = Arc::clone(&task);
            Box::pin(async move {
                tracing::debug!(job = task.name(), "Running scheduled job");
                if let Err(e) = task.run().await {
                    tracing::error!(job = task.name(), error = %e, "Scheduled job failed");
                }
            })
        })
        .map_err(|e| AppError::configuration(format!("Invalid schedule '{schedule}' for {name}: {e}")))?;

        self.scheduler
            .add(cron)
            .await
            .map_err(|e| AppError::internal(format!("Failed to add {name} schedule: {e}")))?;

        tracing::info!(job = %name, %schedule, "Registered scheduled job");
        Ok(())
    }

    /// Start the scheduler
    pub async fn start(&self) -> Result<(), AppError> {
        self.scheduler
            .start()
            .await
            .map_err(|e| AppError::internal(format!("Failed to start scheduler: {e}")))?;

        tracing::info!("Cron scheduler started");
        Ok(())
    }

    /// Shutdown the scheduler
    pub async fn shutdown(&self) -> Result<(), AppError> {
        let mut scheduler = self.scheduler.clone();
        scheduler
            .shutdown()
            .await
            .map_err(|e| AppError::internal(format!("Failed to shutdown scheduler: {e}")))?;

        tracing::info!("Cron scheduler shut down");
        Ok(())
    }
}
