//! Read-only run history plus inactive-candidate review.

use boxfinder_core::RunStats;
use chrono::{DateTime, Utc};
use clap::Subcommand;
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Debug, Subcommand)]
pub enum RunsCommands {
    /// List recent discovery runs
    List {
        /// Maximum number of runs to show
        #[arg(long, default_value = "20")]
        limit: i64,
    },
    /// Show the stored statistics of one run
    Show {
        /// Run id as printed by `runs list`
        run_id: Uuid,
    },
}

#[derive(Debug, Subcommand)]
pub enum CandidatesCommands {
    /// List open inactive candidates
    List,
    /// Close the open candidate for a directory record
    Resolve {
        /// Directory record id
        record_id: i64,
    },
}

fn fmt_time(at: Option<DateTime<Utc>>) -> String {
    at.map_or_else(
        || "\u{2014}".to_string(),
        |t| t.format("%Y-%m-%d %H:%M").to_string(),
    )
}

fn stats_of(value: &serde_json::Value) -> RunStats {
    serde_json::from_value(value.clone()).unwrap_or_default()
}

/// # Errors
///
/// Returns an error if the database query fails.
pub(crate) async fn run_runs_list(pool: &PgPool, limit: i64) -> anyhow::Result<()> {
    let rows = boxfinder_db::list_discovery_runs(pool, limit.clamp(1, 200)).await?;
    if rows.is_empty() {
        println!("no discovery runs yet; run `discover run` first");
        return Ok(());
    }

    println!(
        "{:<38}{:<11}{:<11}{:<13}{:<18}{:>7}{:>9}{:>9}",
        "RUN", "TRIGGER", "STATUS", "STAGE", "STARTED", "FINAL", "CREATED", "FLAGGED"
    );
    for row in &rows {
        let stats = stats_of(&row.stats);
        println!(
            "{:<38}{:<11}{:<11}{:<13}{:<18}{:>7}{:>9}{:>9}",
            row.public_id,
            row.trigger_source,
            row.status,
            row.stage,
            fmt_time(Some(row.started_at)),
            stats.final_count,
            stats.records_created,
            stats.records_flagged_inactive
        );
    }
    Ok(())
}

/// # Errors
///
/// Returns an error if the run does not exist or the query fails.
pub(crate) async fn run_runs_show(pool: &PgPool, run_id: Uuid) -> anyhow::Result<()> {
    let row = boxfinder_db::get_discovery_run(pool, run_id)
        .await
        .map_err(|e| match e {
            boxfinder_db::DbError::NotFound => anyhow::anyhow!("run '{run_id}' not found"),
            other => other.into(),
        })?;

    println!("Run: {} ({})", row.public_id, row.trigger_source);
    println!("Status: {} at stage {}", row.status, row.stage);
    println!(
        "Started: {}  Finished: {}",
        fmt_time(Some(row.started_at)),
        fmt_time(row.finished_at)
    );
    println!();
    println!("{}", serde_json::to_string_pretty(&row.stats)?);
    if let Some(errors) = row.errors.as_array().filter(|e| !e.is_empty()) {
        println!();
        for error in errors {
            println!("error: {}", error.as_str().unwrap_or_default());
        }
    }
    Ok(())
}

/// # Errors
///
/// Returns an error if the database query fails.
pub(crate) async fn run_candidates_list(pool: &PgPool) -> anyhow::Result<()> {
    let rows = boxfinder_db::list_open_inactive_candidates(pool).await?;
    if rows.is_empty() {
        println!("no open inactive candidates");
        return Ok(());
    }
    println!("{:<10}{:<12}DETECTED", "ID", "RECORD");
    for row in &rows {
        println!(
            "{:<10}{:<12}{}",
            row.id,
            row.directory_record_id,
            row.detected_on.format("%Y-%m-%d")
        );
    }
    Ok(())
}

/// # Errors
///
/// Returns an error if the update fails.
pub(crate) async fn run_candidates_resolve(pool: &PgPool, record_id: i64) -> anyhow::Result<()> {
    if boxfinder_db::resolve_inactive_candidate(pool, record_id).await? {
        println!("resolved open candidate for record {record_id}");
    } else {
        println!("record {record_id} has no open candidate");
    }
    Ok(())
}
