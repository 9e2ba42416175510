//! `discover` command handlers.

use boxfinder_core::{AppConfig, RegionNode, RegionsFile, RunResult, RunStatus, TriggerKind};
use boxfinder_db::PgRunReporter;
use boxfinder_pipeline::{build_pipeline, RunOptions, TracingReporter};
use clap::Subcommand;
use sqlx::PgPool;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Subcommand)]
pub enum DiscoverCommands {
    /// Run the discovery pipeline once
    Run {
        /// Search and filter only; nothing is written to the directory
        #[arg(long)]
        dry_run: bool,
        /// Do not look up phone numbers and websites
        #[arg(long)]
        skip_enrich: bool,
    },
    /// Print the configured search regions
    Regions,
}

/// Runs one manual discovery pass. Ctrl-C cancels the run cleanly.
///
/// Dry runs only log their summary; full runs are also stored in
/// `discovery_runs`.
///
/// # Errors
///
/// Returns an error if the pipeline cannot be assembled or the run ends as
/// failed.
pub(crate) async fn run_discover(
    config: &AppConfig,
    pool: PgPool,
    dry_run: bool,
    skip_enrich: bool,
) -> anyhow::Result<()> {
    let cancel = CancellationToken::new();
    cancel_on_ctrl_c(cancel.clone());

    let mut options = RunOptions::from_app_config(config);
    options.dry_run = dry_run;
    options.enrich = options.enrich && !skip_enrich;

    let result = if dry_run {
        let pipeline = build_pipeline(config, pool, TracingReporter, cancel.clone())?;
        pipeline.run(TriggerKind::Manual, options, &cancel).await
    } else {
        let reporter = (PgRunReporter::new(pool.clone()), TracingReporter);
        let pipeline = build_pipeline(config, pool, reporter, cancel.clone())?;
        pipeline.run(TriggerKind::Manual, options, &cancel).await
    };

    if dry_run {
        println!("dry-run: nothing was written to the directory");
    }
    for line in summary_lines(&result) {
        println!("{line}");
    }

    if result.status == RunStatus::Failed {
        anyhow::bail!(
            "discovery run {} failed: {}",
            result.run_id,
            result.errors.join("; ")
        );
    }
    Ok(())
}

fn cancel_on_ctrl_c(cancel: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received; cancelling discovery run");
            cancel.cancel();
        }
    });
}

/// Human-readable run summary, one `label value` pair per line.
fn summary_lines(result: &RunResult) -> Vec<String> {
    let s = &result.stats;
    let duration = result.duration().map_or_else(
        || "\u{2014}".to_string(),
        |d| format!("{}ms", d.num_milliseconds()),
    );
    let rows: Vec<(&str, String)> = vec![
        ("run", result.run_id.to_string()),
        ("status", result.status.to_string()),
        ("duration", duration),
        ("regions", s.regions_configured.to_string()),
        ("raw results", s.raw_found.to_string()),
        ("included by keyword", s.included_by_keyword.to_string()),
        ("excluded by keyword", s.excluded_by_keyword.to_string()),
        ("excluded by type", s.excluded_by_type.to_string()),
        ("kept by default", s.kept_by_default.to_string()),
        ("duplicates removed", s.duplicates_removed.to_string()),
        ("final", s.final_count.to_string()),
        ("api calls", format!("{} ({} failed)", s.api_calls, s.api_failures)),
        ("enriched", format!("{} ({} failed)", s.enriched, s.enrich_failed)),
        ("records created", s.records_created.to_string()),
        ("records matched", s.records_skipped.to_string()),
        (
            "flagged inactive",
            format!("{} ({} already open)", s.records_flagged_inactive, s.records_already_flagged),
        ),
        ("record failures", s.records_failed.to_string()),
    ];
    let mut lines: Vec<String> = rows
        .into_iter()
        .map(|(label, value)| format!("{label:<22}{value}"))
        .collect();
    lines.extend(result.errors.iter().map(|e| format!("{:<22}{e}", "error")));
    lines
}

/// Loads and prints the region configuration without touching the network.
///
/// # Errors
///
/// Returns an error if the regions file cannot be loaded.
pub(crate) fn run_regions(config: &AppConfig) -> anyhow::Result<()> {
    let regions = boxfinder_core::load_regions(&config.regions_path)?;
    for line in region_lines(&regions) {
        println!("{line}");
    }
    println!("{} search regions configured", regions.region_count());
    Ok(())
}

fn region_lines(regions: &RegionsFile) -> Vec<String> {
    let mut lines = Vec::new();
    for node in regions.nodes() {
        match node {
            RegionNode::Broad(region) => {
                for query in &region.queries {
                    lines.push(format!("{:<28}{query}", region.name));
                }
            }
            RegionNode::Nested(entry) => {
                for sub in &entry.sub_regions {
                    let label = format!("{}/{sub}", entry.name);
                    lines.push(format!("{label:<28}{}", entry.query_for(sub)));
                }
            }
        }
    }
    lines
}
