//! Directory reconciliation: create records for newly discovered gyms and
//! flag records no longer seen.

mod index;
mod login;
mod matching;
mod romanize;

use boxfinder_core::{
    CandidateFlag, DirectoryRecord, DirectoryStore, InactiveCandidateStore, ItemOutcome,
    NewDirectoryRecord, Place, SlugTranslator, StoreError,
};
use chrono::NaiveDate;
use tokio_util::sync::CancellationToken;

use crate::error::PipelineError;

pub use index::DirectoryIndex;
pub use login::{
    base_login, generate_secret, hash_secret, unique_login, DEFAULT_LOGIN_BASE, MAX_LOGIN_SUFFIX,
};
pub use matching::{MatchStrategy, NameProximityMatch};
pub use romanize::{romanize, HangulRomanizer};

/// Counts for one reconciliation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncStats {
    pub created: usize,
    /// Places that matched an existing (or just created) record.
    pub skipped: usize,
    pub inactive: usize,
    pub already_flagged: usize,
    pub failed: usize,
}

/// Writes reconciliation results through the directory store.
pub struct Reconciler<'a, S, T, M> {
    store: &'a S,
    translator: &'a T,
    strategy: &'a M,
}

impl<'a, S, T, M> Reconciler<'a, S, T, M>
where
    S: DirectoryStore + InactiveCandidateStore,
    T: SlugTranslator,
    M: MatchStrategy,
{
    pub fn new(store: &'a S, translator: &'a T, strategy: &'a M) -> Self {
        Self {
            store,
            translator,
            strategy,
        }
    }

    /// Bulk-loads the directory once.
    ///
    /// # Errors
    ///
    /// Returns the store's error; without the directory nothing can be
    /// reconciled.
    pub async fn load_index(&self) -> Result<DirectoryIndex, StoreError> {
        let records = self.store.find_all().await?;
        tracing::info!(records = records.len(), "directory loaded");
        Ok(DirectoryIndex::from_records(records))
    }

    /// Matches every place against the index, creating records for the
    /// unmatched, then flags every existing record no place matched.
    ///
    /// Per-item failures are counted in `stats` and never abort the pass.
    /// Flagging only happens once every place has been seen.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Cancelled`] if `cancel` fires between
    /// places; nothing is flagged in that case.
    pub async fn sync(
        &self,
        places: &[Place],
        index: &mut DirectoryIndex,
        detected_on: NaiveDate,
        cancel: &CancellationToken,
        stats: &mut SyncStats,
    ) -> Result<(), PipelineError> {
        for place in places {
            if cancel.is_cancelled() {
                return Err(PipelineError::Cancelled);
            }
            if index.mark_matches(place, self.strategy) > 0 {
                stats.skipped += 1;
                continue;
            }
            match self.create_for(place, index).await {
                ItemOutcome::Applied => stats.created += 1,
                ItemOutcome::Skipped => stats.skipped += 1,
                ItemOutcome::Failed(reason) => {
                    tracing::warn!(name = %place.name, %reason, "failed to create directory record");
                    stats.failed += 1;
                }
            }
        }

        if cancel.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }

        let unmatched: Vec<i64> = index.unmatched_existing().map(|r| r.id).collect();
        for record_id in unmatched {
            match self.flag_inactive(record_id, detected_on).await {
                ItemOutcome::Applied => stats.inactive += 1,
                ItemOutcome::Skipped => stats.already_flagged += 1,
                ItemOutcome::Failed(reason) => {
                    tracing::warn!(record_id, %reason, "failed to flag inactive record");
                    stats.failed += 1;
                }
            }
        }

        tracing::info!(
            created = stats.created,
            skipped = stats.skipped,
            inactive = stats.inactive,
            already_flagged = stats.already_flagged,
            failed = stats.failed,
            "reconciliation complete"
        );
        Ok(())
    }

    async fn create_for(&self, place: &Place, index: &mut DirectoryIndex) -> ItemOutcome {
        if !place.has_name() {
            return ItemOutcome::Skipped;
        }
        match self.create_record(place).await {
            Ok(record) => {
                tracing::info!(login = %record.login, name = %record.display_name, "directory record created");
                index.insert_created(record);
                ItemOutcome::Applied
            }
            Err(e) => ItemOutcome::Failed(e.to_string()),
        }
    }

    async fn create_record(&self, place: &Place) -> Result<DirectoryRecord, StoreError> {
        let base = base_login(self.translator, &place.name).await;
        let login = unique_login(self.store, &base).await?;
        // Only the digest is stored; owners set their own secret on first
        // sign-in.
        let secret = generate_secret();
        let address = Some(place.formatted_address.trim())
            .filter(|a| !a.is_empty())
            .map(str::to_owned);
        self.store
            .create(NewDirectoryRecord {
                login,
                secret_hash: hash_secret(&secret),
                display_name: place.name.clone(),
                phone: place.phone.clone(),
                address,
                latitude: place.latitude,
                longitude: place.longitude,
            })
            .await
    }

    async fn flag_inactive(&self, record_id: i64, detected_on: NaiveDate) -> ItemOutcome {
        match self.store.open_exists_for_record(record_id).await {
            Ok(true) => return ItemOutcome::Skipped,
            Ok(false) => {}
            Err(e) => return ItemOutcome::Failed(e.to_string()),
        }
        match self.store.create_candidate(record_id, detected_on).await {
            Ok(CandidateFlag::Opened(_)) => ItemOutcome::Applied,
            Ok(CandidateFlag::AlreadyOpen(_)) => ItemOutcome::Skipped,
            Err(e) => ItemOutcome::Failed(e.to_string()),
        }
    }
}
