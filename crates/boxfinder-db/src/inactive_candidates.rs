//! Database operations for `inactive_candidates`.
//!
//! A partial unique index keeps at most one open (unresolved) candidate per
//! directory record, so inserts are idempotent at the database level too.

use boxfinder_core::InactiveCandidate;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;

use crate::DbError;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct InactiveCandidateRow {
    pub id: i64,
    pub directory_record_id: i64,
    pub detected_on: NaiveDate,
    pub resolved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<InactiveCandidateRow> for InactiveCandidate {
    fn from(row: InactiveCandidateRow) -> Self {
        Self {
            id: row.id,
            directory_record_id: row.directory_record_id,
            detected_on: row.detected_on,
            resolved_at: row.resolved_at,
        }
    }
}

/// Result of [`insert_inactive_candidate`].
#[derive(Debug, Clone)]
pub struct CandidateInsert {
    pub row: InactiveCandidateRow,
    /// `false` when an open candidate already existed.
    pub inserted: bool,
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn open_inactive_candidate_exists(
    pool: &PgPool,
    directory_record_id: i64,
) -> Result<bool, DbError> {
    let exists = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS ( \
             SELECT 1 FROM inactive_candidates \
             WHERE directory_record_id = $1 AND resolved_at IS NULL \
         )",
    )
    .bind(directory_record_id)
    .fetch_one(pool)
    .await?;
    Ok(exists)
}

/// Opens a candidate for `directory_record_id`, or returns the one already
/// open with `inserted` unset.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if either statement fails, or
/// [`DbError::NotFound`] if the conflicting row vanished in between.
pub async fn insert_inactive_candidate(
    pool: &PgPool,
    directory_record_id: i64,
    detected_on: NaiveDate,
) -> Result<CandidateInsert, DbError> {
    let inserted = sqlx::query_as::<_, InactiveCandidateRow>(
        "INSERT INTO inactive_candidates (directory_record_id, detected_on) \
         VALUES ($1, $2) \
         ON CONFLICT (directory_record_id) WHERE resolved_at IS NULL DO NOTHING \
         RETURNING id, directory_record_id, detected_on, resolved_at, created_at",
    )
    .bind(directory_record_id)
    .bind(detected_on)
    .fetch_optional(pool)
    .await?;

    if let Some(row) = inserted {
        return Ok(CandidateInsert {
            row,
            inserted: true,
        });
    }

    let row = sqlx::query_as::<_, InactiveCandidateRow>(
        "SELECT id, directory_record_id, detected_on, resolved_at, created_at \
         FROM inactive_candidates \
         WHERE directory_record_id = $1 AND resolved_at IS NULL",
    )
    .bind(directory_record_id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)?;
    Ok(CandidateInsert {
        row,
        inserted: false,
    })
}

/// Closes the open candidate for `directory_record_id`. Returns `false`
/// when there was nothing open.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn resolve_inactive_candidate(
    pool: &PgPool,
    directory_record_id: i64,
) -> Result<bool, DbError> {
    let result = sqlx::query(
        "UPDATE inactive_candidates SET resolved_at = NOW() \
         WHERE directory_record_id = $1 AND resolved_at IS NULL",
    )
    .bind(directory_record_id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Open candidates, oldest detection first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_open_inactive_candidates(
    pool: &PgPool,
) -> Result<Vec<InactiveCandidateRow>, DbError> {
    let rows = sqlx::query_as::<_, InactiveCandidateRow>(
        "SELECT id, directory_record_id, detected_on, resolved_at, created_at \
         FROM inactive_candidates \
         WHERE resolved_at IS NULL \
         ORDER BY detected_on, id",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows)
}
