//! Keyword/category filtering followed by de-duplication.

mod dedup;
mod similarity;

use boxfinder_core::{ConfigError, FilterRuleSet, Place};
use regex::Regex;

pub use dedup::deduplicate;
pub use similarity::{normalize_for_match, similarity};

/// Category tag that always overrides a type-based exclusion.
pub const FITNESS_TAG: &str = "gym";

/// How a single place was classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Included,
    ExcludedByKeyword,
    ExcludedByType,
    KeptByDefault,
}

impl Verdict {
    #[must_use]
    pub fn is_kept(self) -> bool {
        matches!(self, Verdict::Included | Verdict::KeptByDefault)
    }
}

/// Counts for one filter pass.
///
/// `included_by_keyword + excluded_by_keyword + excluded_by_type +
/// kept_by_default == total`, and `final_count == kept − duplicates_removed`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilterStats {
    pub total: usize,
    pub included_by_keyword: usize,
    pub excluded_by_keyword: usize,
    pub excluded_by_type: usize,
    pub kept_by_default: usize,
    pub duplicates_removed: usize,
    pub final_count: usize,
}

impl FilterStats {
    #[must_use]
    pub fn kept_before_dedup(&self) -> usize {
        self.included_by_keyword + self.kept_by_default
    }
}

/// Rules compiled once per run.
#[derive(Debug, Clone)]
pub struct FilterEngine {
    include: Vec<String>,
    exclude: Vec<String>,
    exclude_types: Vec<String>,
    compound: Option<(Vec<String>, Vec<String>)>,
    abbreviation: Option<Regex>,
    similarity_threshold: f64,
}

fn normalized(keywords: &[String]) -> Vec<String> {
    keywords
        .iter()
        .map(|k| normalize_for_match(k))
        .filter(|k| !k.is_empty())
        .collect()
}

impl FilterEngine {
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] if the abbreviation pattern is not
    /// a valid regex or the rule set fails validation.
    pub fn new(rules: &FilterRuleSet) -> Result<Self, ConfigError> {
        rules.validate()?;
        let abbreviation = rules
            .abbreviation_pattern
            .as_deref()
            .map(|pattern| {
                Regex::new(pattern).map_err(|e| {
                    ConfigError::Validation(format!("invalid abbreviation_pattern {pattern:?}: {e}"))
                })
            })
            .transpose()?;

        Ok(Self {
            include: normalized(&rules.include_keywords),
            exclude: normalized(&rules.exclude_keywords),
            exclude_types: rules.exclude_types.clone(),
            compound: rules
                .compound
                .as_ref()
                .map(|c| (normalized(&c.first), normalized(&c.second))),
            abbreviation,
            similarity_threshold: rules.similarity_threshold,
        })
    }

    /// First matching rule wins: include override, then keyword exclusion,
    /// then category exclusion, otherwise kept.
    ///
    /// A place without a name can match no keyword rule and is counted as
    /// excluded by keyword.
    #[must_use]
    pub fn classify(&self, place: &Place) -> Verdict {
        if !place.has_name() {
            return Verdict::ExcludedByKeyword;
        }
        let name = normalize_for_match(&place.name);

        if self.is_included(&place.name, &name) {
            return Verdict::Included;
        }
        if self.exclude.iter().any(|k| name.contains(k.as_str())) {
            return Verdict::ExcludedByKeyword;
        }
        if !place.types.contains(FITNESS_TAG)
            && self.exclude_types.iter().any(|t| place.types.contains(t))
        {
            return Verdict::ExcludedByType;
        }
        Verdict::KeptByDefault
    }

    fn is_included(&self, raw_name: &str, name: &str) -> bool {
        if self.include.iter().any(|k| name.contains(k.as_str())) {
            return true;
        }
        if self
            .abbreviation
            .as_ref()
            .is_some_and(|re| re.is_match(raw_name.trim()))
        {
            return true;
        }
        self.compound.as_ref().is_some_and(|(first, second)| {
            first.iter().any(|k| name.contains(k.as_str()))
                && second.iter().any(|k| name.contains(k.as_str()))
        })
    }

    /// Classifies every place, then de-duplicates the survivors.
    #[must_use]
    pub fn filter(&self, places: Vec<Place>) -> (Vec<Place>, FilterStats) {
        let mut stats = FilterStats {
            total: places.len(),
            ..FilterStats::default()
        };

        let mut kept = Vec::with_capacity(places.len());
        for place in places {
            let verdict = self.classify(&place);
            match verdict {
                Verdict::Included => stats.included_by_keyword += 1,
                Verdict::ExcludedByKeyword => stats.excluded_by_keyword += 1,
                Verdict::ExcludedByType => stats.excluded_by_type += 1,
                Verdict::KeptByDefault => stats.kept_by_default += 1,
            }
            if verdict.is_kept() {
                kept.push(place);
            } else {
                tracing::debug!(name = %place.name, ?verdict, "place filtered out");
            }
        }

        let (survivors, removed) = deduplicate(kept, self.similarity_threshold);
        stats.duplicates_removed = removed;
        stats.final_count = survivors.len();

        tracing::info!(
            total = stats.total,
            included = stats.included_by_keyword,
            excluded_keyword = stats.excluded_by_keyword,
            excluded_type = stats.excluded_by_type,
            kept_default = stats.kept_by_default,
            duplicates = stats.duplicates_removed,
            final_count = stats.final_count,
            "filter pass complete"
        );
        (survivors, stats)
    }
}

#[cfg(test)]
#[path = "../filter_test.rs"]
mod tests;
