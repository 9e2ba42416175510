use std::collections::HashMap;

use boxfinder_core::{DirectoryRecord, Place};

use super::matching::MatchStrategy;

#[derive(Debug)]
struct Entry {
    record: DirectoryRecord,
    /// Loaded at the start of the run, as opposed to created during it.
    existing: bool,
    matched: bool,
}

/// In-memory view of the directory for one reconciliation pass.
///
/// Records are grouped by exact display name. Records created during the
/// run are added as already matched so later places in the same batch see
/// them.
#[derive(Debug, Default)]
pub struct DirectoryIndex {
    entries: Vec<Entry>,
    by_name: HashMap<String, Vec<usize>>,
}

impl DirectoryIndex {
    #[must_use]
    pub fn from_records(records: Vec<DirectoryRecord>) -> Self {
        let mut index = Self::default();
        for record in records {
            index.push(record, true, false);
        }
        index
    }

    fn push(&mut self, record: DirectoryRecord, existing: bool, matched: bool) {
        let slot = self.entries.len();
        self.by_name
            .entry(record.display_name.clone())
            .or_default()
            .push(slot);
        self.entries.push(Entry {
            record,
            existing,
            matched,
        });
    }

    fn candidates<'a, M: MatchStrategy>(
        &'a self,
        place: &'a Place,
        strategy: &'a M,
    ) -> impl Iterator<Item = usize> + 'a {
        self.by_name
            .get(&place.name)
            .into_iter()
            .flatten()
            .copied()
            .filter(move |&slot| strategy.matches(place, &self.entries[slot].record))
    }

    /// Whether any record matches `place`, without marking anything.
    #[must_use]
    pub fn has_match<M: MatchStrategy>(&self, place: &Place, strategy: &M) -> bool {
        self.candidates(place, strategy).next().is_some()
    }

    /// Marks every record matching `place` as seen and returns how many
    /// there were.
    pub fn mark_matches<M: MatchStrategy>(&mut self, place: &Place, strategy: &M) -> usize {
        let slots: Vec<usize> = self.candidates(place, strategy).collect();
        for &slot in &slots {
            self.entries[slot].matched = true;
        }
        slots.len()
    }

    /// Adds a record created during this run.
    pub fn insert_created(&mut self, record: DirectoryRecord) {
        self.push(record, false, true);
    }

    /// Records loaded at the start of the run that no place matched.
    pub fn unmatched_existing(&self) -> impl Iterator<Item = &DirectoryRecord> {
        self.entries
            .iter()
            .filter(|e| e.existing && !e.matched)
            .map(|e| &e.record)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
