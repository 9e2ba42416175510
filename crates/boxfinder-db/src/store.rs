//! Postgres-backed implementations of the core store traits.

use boxfinder_core::{
    CandidateFlag, DirectoryRecord, DirectoryStore, InactiveCandidateStore, NewDirectoryRecord,
    RunReporter, RunResult, StoreError,
};
use chrono::NaiveDate;
use sqlx::PgPool;

use crate::{directory, discovery_runs, inactive_candidates};

/// Directory and inactive-candidate store over a shared pool.
#[derive(Debug, Clone)]
pub struct PgDirectory {
    pool: PgPool,
}

impl PgDirectory {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl DirectoryStore for PgDirectory {
    async fn find_all(&self) -> Result<Vec<DirectoryRecord>, StoreError> {
        let rows = directory::list_directory_records(&self.pool).await?;
        Ok(rows.into_iter().map(DirectoryRecord::from).collect())
    }

    async fn login_exists(&self, login: &str) -> Result<bool, StoreError> {
        Ok(directory::login_exists(&self.pool, login).await?)
    }

    async fn create(&self, record: NewDirectoryRecord) -> Result<DirectoryRecord, StoreError> {
        let row = directory::insert_directory_record(&self.pool, &record).await?;
        Ok(row.into())
    }
}

impl InactiveCandidateStore for PgDirectory {
    async fn open_exists_for_record(&self, record_id: i64) -> Result<bool, StoreError> {
        Ok(inactive_candidates::open_inactive_candidate_exists(&self.pool, record_id).await?)
    }

    async fn create_candidate(
        &self,
        record_id: i64,
        detected_on: NaiveDate,
    ) -> Result<CandidateFlag, StoreError> {
        let insert =
            inactive_candidates::insert_inactive_candidate(&self.pool, record_id, detected_on)
                .await?;
        let candidate = insert.row.into();
        Ok(if insert.inserted {
            CandidateFlag::Opened(candidate)
        } else {
            CandidateFlag::AlreadyOpen(candidate)
        })
    }
}

/// Stores each run result in `discovery_runs`.
#[derive(Debug, Clone)]
pub struct PgRunReporter {
    pool: PgPool,
}

impl PgRunReporter {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl RunReporter for PgRunReporter {
    async fn report(&self, result: &RunResult) -> Result<(), StoreError> {
        let row = discovery_runs::insert_discovery_run(&self.pool, result).await?;
        tracing::debug!(run_id = %row.public_id, status = %row.status, "discovery run stored");
        Ok(())
    }
}
