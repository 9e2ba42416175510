//! Database operations for `discovery_runs`.

use boxfinder_core::RunResult;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

/// A row from the `discovery_runs` table. `stats` and `errors` hold the
/// JSON-encoded `RunStats` and error list.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct DiscoveryRunRow {
    pub id: i64,
    pub public_id: Uuid,
    pub trigger_source: String,
    pub status: String,
    pub stage: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub stats: serde_json::Value,
    pub errors: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

const RUN_COLUMNS: &str = "id, public_id, trigger_source, status, stage, started_at, \
                           finished_at, stats, errors, created_at";

/// Persists a run result. Reporting the same run twice overwrites the
/// earlier row.
///
/// # Errors
///
/// Returns [`DbError::Json`] if the result cannot be encoded, or
/// [`DbError::Sqlx`] if the upsert fails.
pub async fn insert_discovery_run(
    pool: &PgPool,
    result: &RunResult,
) -> Result<DiscoveryRunRow, DbError> {
    let stats = serde_json::to_value(&result.stats)?;
    let errors = serde_json::to_value(&result.errors)?;

    let row = sqlx::query_as::<_, DiscoveryRunRow>(&format!(
        "INSERT INTO discovery_runs \
         (public_id, trigger_source, status, stage, started_at, finished_at, stats, errors) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
         ON CONFLICT (public_id) DO UPDATE SET \
             status = EXCLUDED.status, \
             stage = EXCLUDED.stage, \
             finished_at = EXCLUDED.finished_at, \
             stats = EXCLUDED.stats, \
             errors = EXCLUDED.errors \
         RETURNING {RUN_COLUMNS}"
    ))
    .bind(result.run_id)
    .bind(result.trigger.to_string())
    .bind(result.status.to_string())
    .bind(result.stage.to_string())
    .bind(result.started_at)
    .bind(result.finished_at)
    .bind(stats)
    .bind(errors)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Most recent runs first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_discovery_runs(pool: &PgPool, limit: i64) -> Result<Vec<DiscoveryRunRow>, DbError> {
    let rows = sqlx::query_as::<_, DiscoveryRunRow>(&format!(
        "SELECT {RUN_COLUMNS} FROM discovery_runs ORDER BY started_at DESC, id DESC LIMIT $1"
    ))
    .bind(limit)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// # Errors
///
/// Returns [`DbError::NotFound`] if no run has `public_id`, or
/// [`DbError::Sqlx`] if the query fails.
pub async fn get_discovery_run(pool: &PgPool, public_id: Uuid) -> Result<DiscoveryRunRow, DbError> {
    sqlx::query_as::<_, DiscoveryRunRow>(&format!(
        "SELECT {RUN_COLUMNS} FROM discovery_runs WHERE public_id = $1"
    ))
    .bind(public_id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)
}
