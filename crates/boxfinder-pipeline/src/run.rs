//! The discovery run state machine.

use boxfinder_core::{
    AppConfig, DirectoryStore, InactiveCandidateStore, ItemOutcome, Place, RunReporter,
    RunResult, RunStage, RunStatus, SlugTranslator, TriggerKind,
};
use boxfinder_places::{ApiCallCounter, PlaceSearch, RegionSearchEngine};
use chrono::Utc;
use tokio_util::sync::CancellationToken;

use crate::error::PipelineError;
use crate::filter::FilterEngine;
use crate::reconcile::{DirectoryIndex, MatchStrategy, Reconciler, SyncStats};

/// Per-invocation switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOptions {
    /// Stop after filtering; nothing is written to the directory.
    pub dry_run: bool,
    /// Look up phone/website for places not yet in the directory.
    pub enrich: bool,
}

impl RunOptions {
    /// Full run, enriching only when the deployment enables it.
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            dry_run: false,
            enrich: config.enrich_details,
        }
    }
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            enrich: true,
        }
    }
}

/// Owns every stage of a run and the shared API call counter.
///
/// A run is a pure function of its configuration and the external world:
/// all state lives in the returned [`RunResult`].
pub struct DiscoveryPipeline<S, D, T, R, M> {
    search: RegionSearchEngine<S>,
    filter: FilterEngine,
    directory: D,
    translator: T,
    reporter: R,
    strategy: M,
    counter: ApiCallCounter,
}

impl<S, D, T, R, M> DiscoveryPipeline<S, D, T, R, M>
where
    S: PlaceSearch,
    D: DirectoryStore + InactiveCandidateStore,
    T: SlugTranslator,
    R: RunReporter,
    M: MatchStrategy,
{
    /// `counter` must be the same counter the search source records into.
    #[must_use]
    pub fn new(
        search: RegionSearchEngine<S>,
        filter: FilterEngine,
        directory: D,
        translator: T,
        reporter: R,
        strategy: M,
        counter: ApiCallCounter,
    ) -> Self {
        Self {
            search,
            filter,
            directory,
            translator,
            reporter,
            strategy,
            counter,
        }
    }

    #[must_use]
    pub fn region_count(&self) -> usize {
        self.search.region_count()
    }

    /// Runs every stage and hands the result to the reporter.
    ///
    /// Never fails: a fatal fault ends the run as `Failed` with the
    /// statistics gathered so far, and the reporter still sees it.
    pub async fn run(
        &self,
        trigger: TriggerKind,
        options: RunOptions,
        cancel: &CancellationToken,
    ) -> RunResult {
        let mut run = RunResult::start(trigger);
        self.counter.reset();
        tracing::info!(
            run_id = %run.run_id,
            %trigger,
            dry_run = options.dry_run,
            enrich = options.enrich,
            "discovery run started"
        );

        let outcome = self.execute(&mut run, options, cancel).await;
        self.finish(run, outcome).await
    }

    async fn execute(
        &self,
        run: &mut RunResult,
        options: RunOptions,
        cancel: &CancellationToken,
    ) -> Result<(), PipelineError> {
        run.stats.regions_configured = self.search.region_count();
        if run.stats.regions_configured == 0 {
            return Err(PipelineError::NoRegions);
        }

        advance(run, RunStage::Searching);
        let raw = self.search.search_all_regions(cancel).await;
        self.sync_api_counts(run);
        let raw = raw?;
        run.stats.raw_found = raw.len();
        check_cancelled(cancel)?;

        advance(run, RunStage::Filtering);
        let (places, filtered) = self.filter.filter(raw);
        run.stats.included_by_keyword = filtered.included_by_keyword;
        run.stats.excluded_by_keyword = filtered.excluded_by_keyword;
        run.stats.excluded_by_type = filtered.excluded_by_type;
        run.stats.kept_by_default = filtered.kept_by_default;
        run.stats.duplicates_removed = filtered.duplicates_removed;
        run.stats.final_count = filtered.final_count;

        if options.dry_run {
            return Ok(());
        }
        check_cancelled(cancel)?;

        let reconciler = Reconciler::new(&self.directory, &self.translator, &self.strategy);

        // Directory faults are reconciliation faults.
        let mut index = match reconciler.load_index().await {
            Ok(index) => index,
            Err(e) => {
                advance(run, RunStage::Reconciling);
                return Err(e.into());
            }
        };

        advance(run, RunStage::Enriching);
        let places = if options.enrich {
            self.enrich_unmatched(places, &index, run, cancel).await?
        } else {
            places
        };
        self.sync_api_counts(run);

        advance(run, RunStage::Reconciling);
        let mut synced = SyncStats::default();
        let detected_on = run.started_at.date_naive();
        let outcome = reconciler
            .sync(&places, &mut index, detected_on, cancel, &mut synced)
            .await;
        run.stats.records_created = synced.created;
        run.stats.records_skipped = synced.skipped;
        run.stats.records_flagged_inactive = synced.inactive;
        run.stats.records_already_flagged = synced.already_flagged;
        run.stats.records_failed = synced.failed;
        outcome
    }

    /// Enriches only places with no directory match; matched places would
    /// be skipped at reconciliation anyway.
    async fn enrich_unmatched(
        &self,
        places: Vec<Place>,
        index: &DirectoryIndex,
        run: &mut RunResult,
        cancel: &CancellationToken,
    ) -> Result<Vec<Place>, PipelineError> {
        let mut enriched = Vec::with_capacity(places.len());
        for place in places {
            if index.has_match(&place, &self.strategy) {
                enriched.push(place);
                continue;
            }
            check_cancelled(cancel)?;
            let (place, outcome) = self.search.source().enrich(place).await;
            match outcome {
                ItemOutcome::Applied => run.stats.enriched += 1,
                ItemOutcome::Skipped => {}
                ItemOutcome::Failed(_) => run.stats.enrich_failed += 1,
            }
            enriched.push(place);
        }
        tracing::info!(
            enriched = run.stats.enriched,
            failed = run.stats.enrich_failed,
            "enrichment complete"
        );
        Ok(enriched)
    }

    async fn finish(&self, mut run: RunResult, outcome: Result<(), PipelineError>) -> RunResult {
        self.sync_api_counts(&mut run);

        match outcome {
            Ok(()) => {
                advance(&mut run, RunStage::Reporting);
                run.status = RunStatus::Succeeded;
                run.stage = RunStage::Succeeded;
            }
            Err(e) => {
                tracing::error!(run_id = %run.run_id, stage = %run.stage, error = %e, "discovery run failed");
                run.errors.push(format!("{}: {e}", run.stage));
                run.status = RunStatus::Failed;
                run.stage = RunStage::Failed;
            }
        }
        run.finished_at = Some(Utc::now());

        if let Err(e) = self.reporter.report(&run).await {
            tracing::warn!(run_id = %run.run_id, error = %e, "failed to report discovery run");
            run.errors.push(format!("report: {e}"));
        }
        run
    }

    fn sync_api_counts(&self, run: &mut RunResult) {
        run.stats.api_calls = self.counter.calls();
        run.stats.api_failures = self.counter.failures();
    }
}

fn advance(run: &mut RunResult, stage: RunStage) {
    tracing::info!(run_id = %run.run_id, from = %run.stage, to = %stage, "stage transition");
    run.stage = stage;
}

fn check_cancelled(cancel: &CancellationToken) -> Result<(), PipelineError> {
    if cancel.is_cancelled() {
        Err(PipelineError::Cancelled)
    } else {
        Ok(())
    }
}

#[cfg(test)]
#[path = "run_test.rs"]
mod tests;
