//! Background job scheduler.
//!
//! Registers the recurring discovery job. A tick that finds a run already
//! in progress is skipped, not queued.

use boxfinder_core::TriggerKind;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

use crate::discovery::{DiscoveryService, TriggerOutcome};

/// Builds and starts the scheduler with the discovery job on `cron`.
///
/// Returns the running [`JobScheduler`] handle, which must be kept alive
/// for the lifetime of the process; dropping it stops the job.
///
/// # Errors
///
/// Returns [`JobSchedulerError`] if the scheduler cannot be initialised,
/// `cron` does not parse, or the scheduler fails to start.
pub async fn build_scheduler(
    discovery: DiscoveryService,
    cron: &str,
) -> Result<JobScheduler, JobSchedulerError> {
    let scheduler = JobScheduler::new().await?;
    register_discovery_job(&scheduler, discovery, cron).await?;
    scheduler.start().await?;
    Ok(scheduler)
}

async fn register_discovery_job(
    scheduler: &JobScheduler,
    discovery: DiscoveryService,
    cron: &str,
) -> Result<(), JobSchedulerError> {
    let job = Job::new_async(cron, move |_uuid, _lock| {
        let discovery = discovery.clone();
        Box::pin(async move {
            match discovery.trigger(TriggerKind::Scheduled) {
                TriggerOutcome::Started => {
                    tracing::info!("scheduler: discovery run started");
                }
                TriggerOutcome::AlreadyRunning => {
                    tracing::warn!("scheduler: previous discovery run still active; tick skipped");
                }
            }
        })
    })?;
    scheduler.add(job).await?;
    tracing::info!(cron, "scheduler: discovery job registered");
    Ok(())
}
