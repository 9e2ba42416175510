use boxfinder_core::{RunReporter, RunResult, RunStatus, StoreError};

/// Logs a one-line run summary through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl RunReporter for TracingReporter {
    async fn report(&self, result: &RunResult) -> Result<(), StoreError> {
        let stats = &result.stats;
        let duration_ms = result.duration().map(|d| d.num_milliseconds());
        if result.status == RunStatus::Failed {
            tracing::error!(
                run_id = %result.run_id,
                trigger = %result.trigger,
                stage = %result.stage,
                errors = ?result.errors,
                raw_found = stats.raw_found,
                final_count = stats.final_count,
                api_calls = stats.api_calls,
                ?duration_ms,
                "discovery run failed"
            );
        } else {
            tracing::info!(
                run_id = %result.run_id,
                trigger = %result.trigger,
                regions = stats.regions_configured,
                raw_found = stats.raw_found,
                final_count = stats.final_count,
                duplicates = stats.duplicates_removed,
                api_calls = stats.api_calls,
                api_failures = stats.api_failures,
                enriched = stats.enriched,
                created = stats.records_created,
                flagged_inactive = stats.records_flagged_inactive,
                item_failures = stats.records_failed + stats.enrich_failed,
                ?duration_ms,
                "discovery run finished"
            );
        }
        Ok(())
    }
}
