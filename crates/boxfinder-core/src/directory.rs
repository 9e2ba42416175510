//! Business directory records and the store boundaries the reconciliation
//! stage writes through.

use std::future::Future;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geo::Coordinates;

/// A persisted business/account entry for a known gym.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectoryRecord {
    pub id: i64,
    /// Unique login handle.
    pub login: String,
    pub display_name: String,
    pub phone: Option<String>,
    /// Free-text address; filled from the provider's formatted address.
    pub address: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub created_at: DateTime<Utc>,
}

impl DirectoryRecord {
    #[must_use]
    pub fn coordinates(&self) -> Option<Coordinates> {
        Coordinates::from_parts(self.latitude, self.longitude)
    }
}

/// Input for creating a directory record.
#[derive(Debug, Clone, PartialEq)]
pub struct NewDirectoryRecord {
    pub login: String,
    /// Hex SHA-256 digest of the generated initial secret.
    pub secret_hash: String,
    pub display_name: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// A directory record flagged as possibly closed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InactiveCandidate {
    pub id: i64,
    pub directory_record_id: i64,
    pub detected_on: NaiveDate,
    /// `None` while the candidate is open.
    pub resolved_at: Option<DateTime<Utc>>,
}

/// What flagging a record did. A concurrent writer may have opened the
/// candidate first.
#[derive(Debug, Clone, PartialEq)]
pub enum CandidateFlag {
    Opened(InactiveCandidate),
    AlreadyOpen(InactiveCandidate),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("login already taken: {0}")]
    LoginTaken(String),

    #[error("directory backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Read/write access to directory records.
pub trait DirectoryStore: Send + Sync {
    /// Every existing record, in a single bulk read.
    fn find_all(&self) -> impl Future<Output = Result<Vec<DirectoryRecord>, StoreError>> + Send;

    fn login_exists(&self, login: &str) -> impl Future<Output = Result<bool, StoreError>> + Send;

    fn create(
        &self,
        record: NewDirectoryRecord,
    ) -> impl Future<Output = Result<DirectoryRecord, StoreError>> + Send;
}

/// Open inactive-candidate flags, at most one per directory record.
pub trait InactiveCandidateStore: Send + Sync {
    fn open_exists_for_record(
        &self,
        record_id: i64,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send;

    fn create_candidate(
        &self,
        record_id: i64,
        detected_on: NaiveDate,
    ) -> impl Future<Output = Result<CandidateFlag, StoreError>> + Send;
}

/// Translates a display name (often Korean) into an ASCII login slug.
pub trait SlugTranslator: Send + Sync {
    fn translate(
        &self,
        display_name: &str,
    ) -> impl Future<Output = Result<String, StoreError>> + Send;
}

/// Naive ASCII slug used when translation fails: lower-cased ASCII
/// alphanumerics joined by single hyphens.
#[must_use]
pub fn fallback_slug(name: &str) -> String {
    name.to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { ' ' })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
}
