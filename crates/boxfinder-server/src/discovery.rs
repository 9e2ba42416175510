//! Background discovery runs shared by the HTTP trigger and the scheduler.

use std::sync::Arc;

use boxfinder_core::{RunReporter, TriggerKind};
use boxfinder_pipeline::{PgDiscoveryPipeline, RunGuard, RunOptions, RunPermit};
use tokio_util::sync::CancellationToken;

/// Starts a run in the background. The permit must be held until the run
/// ends.
pub trait RunLauncher: Send + Sync {
    fn launch(&self, trigger: TriggerKind, permit: RunPermit);
}

/// Launches the Postgres-backed pipeline on the Tokio runtime.
pub struct PipelineLauncher<R> {
    pipeline: Arc<PgDiscoveryPipeline<R>>,
    options: RunOptions,
    shutdown: CancellationToken,
}

impl<R> PipelineLauncher<R> {
    pub fn new(
        pipeline: PgDiscoveryPipeline<R>,
        options: RunOptions,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            options,
            shutdown,
        }
    }
}

impl<R: RunReporter + 'static> RunLauncher for PipelineLauncher<R> {
    fn launch(&self, trigger: TriggerKind, permit: RunPermit) {
        let pipeline = Arc::clone(&self.pipeline);
        let options = self.options;
        let shutdown = self.shutdown.clone();
        tokio::spawn(async move {
            let _permit = permit;
            let result = pipeline.run(trigger, options, &shutdown).await;
            tracing::info!(
                run_id = %result.run_id,
                %trigger,
                status = %result.status,
                "background discovery run ended"
            );
        });
    }
}

/// Whether a trigger started a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerOutcome {
    Started,
    AlreadyRunning,
}

/// Single entry point for starting runs; at most one is active at a time.
#[derive(Clone)]
pub struct DiscoveryService {
    launcher: Arc<dyn RunLauncher>,
    guard: RunGuard,
}

impl DiscoveryService {
    pub fn new(launcher: Arc<dyn RunLauncher>, guard: RunGuard) -> Self {
        Self { launcher, guard }
    }

    pub fn trigger(&self, trigger: TriggerKind) -> TriggerOutcome {
        match self.guard.try_acquire() {
            Some(permit) => {
                self.launcher.launch(trigger, permit);
                TriggerOutcome::Started
            }
            None => {
                tracing::warn!(%trigger, "discovery run already in progress; trigger ignored");
                TriggerOutcome::AlreadyRunning
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.guard.is_busy()
    }

    pub async fn wait_idle(&self) {
        self.guard.wait_idle().await;
    }
}
