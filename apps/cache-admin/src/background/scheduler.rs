//! Cron-style job scheduler using tokio-cron-scheduler.

use std::sync::Arc;

use dixis_core::CacheFacade;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

/// Every 15 minutes, on the minute.
const DEFAULT_WARMUP_CRON: &str = "0 */15 * * * *";

/// Scheduler configuration.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Enable scheduler.
    pub enabled: bool,
    /// Six-field cron expression (with seconds) for the periodic warm-up.
    pub warm_up_cron: String,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            warm_up_cron: DEFAULT_WARMUP_CRON.to_string(),
        }
    }
}

impl SchedulerConfig {
    pub fn from_env() -> Self {
        Self {
            enabled: std::env::var("SCHEDULER_ENABLED")
                .map(|v| v != "false" && v != "0")
                .unwrap_or(true),
            warm_up_cron: std::env::var("CACHE_WARMUP_CRON")
                .unwrap_or_else(|_| DEFAULT_WARMUP_CRON.to_string()),
        }
    }
}

/// Cron job scheduler wrapper.
pub struct Scheduler {
    inner: JobScheduler,
    config: SchedulerConfig,
}

impl Scheduler {
    pub async fn new(config: SchedulerConfig) -> Result<Self, JobSchedulerError> {
        let inner = JobScheduler::new().await?;
        Ok(Self { inner, config })
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Add a cron job.
    pub async fn add_cron<F, Fut>(
        &self,
        schedule: &str,
        task: F,
    ) -> Result<uuid::Uuid, JobSchedulerError>
    where
        F: Fn() -> Fut + Send + Sync + Clone + 'static,
        Fut: std::future::Future<Output = ()> + Send + 'static,
    {
        let job = Job::new_async(schedule, move |_uuid, _lock| {
            let task = task.clone();
            Box::pin(async move {
                task().await;
            })
        })?;

        let id = self.inner.add(job).await?;
        tracing::info!(schedule = %schedule, job_id = %id, "Cron job registered");
        Ok(id)
    }

    /// Start the scheduler.
    pub async fn start(&self) -> Result<(), JobSchedulerError> {
        if !self.config.enabled {
            tracing::info!("Scheduler disabled");
            return Ok(());
        }

        self.inner.start().await?;
        tracing::info!("Scheduler started");
        Ok(())
    }

    /// Stop the scheduler.
    pub async fn shutdown(&mut self) -> Result<(), JobSchedulerError> {
        self.inner.shutdown().await?;
        tracing::info!("Scheduler stopped");
        Ok(())
    }
}

/// Register the periodic cache warm-up on `scheduler`.
pub async fn schedule_warm_up(
    scheduler: &Scheduler,
    cache: Arc<CacheFacade>,
) -> Result<uuid::Uuid, JobSchedulerError> {
    let schedule = scheduler.config().warm_up_cron.clone();
    scheduler
        .add_cron(&schedule, move || {
            let cache = cache.clone();
            async move {
                let report = cache.warm_up_caches().await;
                if report.has_failures() {
                    tracing::warn!(
                        failed = ?report.failed_sections(),
                        "Scheduled cache warm-up incomplete"
                    );
                } else {
                    tracing::info!("Scheduled cache warm-up complete");
                }
            }
        })
        .await
}
