//! Database operations for `directory_records`.

use boxfinder_core::{DirectoryRecord, NewDirectoryRecord};
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::DbError;

/// A row from the `directory_records` table. `secret_hash` is never selected.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct DirectoryRecordRow {
    pub id: i64,
    pub login: String,
    pub display_name: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub created_at: DateTime<Utc>,
}

impl From<DirectoryRecordRow> for DirectoryRecord {
    fn from(row: DirectoryRecordRow) -> Self {
        Self {
            id: row.id,
            login: row.login,
            display_name: row.display_name,
            phone: row.phone,
            address: row.address,
            latitude: row.latitude,
            longitude: row.longitude,
            created_at: row.created_at,
        }
    }
}

const RECORD_COLUMNS: &str =
    "id, login, display_name, phone, address, latitude, longitude, created_at";

/// Every directory record, ordered by id.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_directory_records(pool: &PgPool) -> Result<Vec<DirectoryRecordRow>, DbError> {
    let rows = sqlx::query_as::<_, DirectoryRecordRow>(&format!(
        "SELECT {RECORD_COLUMNS} FROM directory_records ORDER BY id"
    ))
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn login_exists(pool: &PgPool, login: &str) -> Result<bool, DbError> {
    let exists = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS (SELECT 1 FROM directory_records WHERE login = $1)",
    )
    .bind(login)
    .fetch_one(pool)
    .await?;
    Ok(exists)
}

/// Inserts a new record and returns it.
///
/// # Errors
///
/// - [`DbError::LoginTaken`] if the login collides with an existing record.
/// - [`DbError::Sqlx`] for any other failure.
pub async fn insert_directory_record(
    pool: &PgPool,
    record: &NewDirectoryRecord,
) -> Result<DirectoryRecordRow, DbError> {
    let result = sqlx::query_as::<_, DirectoryRecordRow>(&format!(
        "INSERT INTO directory_records \
         (login, secret_hash, display_name, phone, address, latitude, longitude) \
         VALUES ($1, $2, $3, $4, $5, $6, $7) \
         RETURNING {RECORD_COLUMNS}"
    ))
    .bind(&record.login)
    .bind(&record.secret_hash)
    .bind(&record.display_name)
    .bind(&record.phone)
    .bind(&record.address)
    .bind(record.latitude)
    .bind(record.longitude)
    .fetch_one(pool)
    .await;

    match result {
        Ok(row) => Ok(row),
        Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
            Err(DbError::LoginTaken(record.login.clone()))
        }
        Err(e) => Err(e.into()),
    }
}
