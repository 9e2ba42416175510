//! Filter rule configuration for discovered places.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Two-letter uppercase abbreviation followed by a word, e.g. `CF 강남`.
pub const DEFAULT_ABBREVIATION_PATTERN: &str = r"^[A-Z]{2}\s+\S+";

const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.9;

/// Inclusion by co-occurrence: a name containing a keyword from `first` and a
/// keyword from `second` is kept.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompoundRule {
    pub first: Vec<String>,
    pub second: Vec<String>,
}

/// Keyword, category and similarity rules applied to each run's raw results.
///
/// Loaded once per run and treated as immutable afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterRuleSet {
    #[serde(default)]
    pub include_keywords: Vec<String>,
    #[serde(default)]
    pub exclude_keywords: Vec<String>,
    #[serde(default)]
    pub exclude_types: Vec<String>,
    #[serde(default)]
    pub compound: Option<CompoundRule>,
    /// Regex matched against the raw name; `None` disables the rule.
    #[serde(default = "default_abbreviation_pattern")]
    pub abbreviation_pattern: Option<String>,
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f64,
}

fn default_abbreviation_pattern() -> Option<String> {
    Some(DEFAULT_ABBREVIATION_PATTERN.to_string())
}

fn default_similarity_threshold() -> f64 {
    DEFAULT_SIMILARITY_THRESHOLD
}

impl Default for FilterRuleSet {
    fn default() -> Self {
        Self {
            include_keywords: Vec::new(),
            exclude_keywords: Vec::new(),
            exclude_types: Vec::new(),
            compound: None,
            abbreviation_pattern: default_abbreviation_pattern(),
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
        }
    }
}

impl FilterRuleSet {
    /// Checks value ranges that serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] when the similarity threshold is
    /// outside `[0, 1]` or a keyword is blank.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.similarity_threshold) {
            return Err(ConfigError::Validation(format!(
                "similarity_threshold must be within [0, 1], got {}",
                self.similarity_threshold
            )));
        }

        let compound_keywords = self
            .compound
            .iter()
            .flat_map(|c| c.first.iter().chain(c.second.iter()));
        let blank = self
            .include_keywords
            .iter()
            .chain(&self.exclude_keywords)
            .chain(compound_keywords)
            .any(|k| k.trim().is_empty());
        if blank {
            return Err(ConfigError::Validation(
                "filter keywords must be non-empty".to_string(),
            ));
        }

        Ok(())
    }
}

/// Load and validate filter rules from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_filter_rules(path: &Path) -> Result<FilterRuleSet, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    let rules: FilterRuleSet =
        serde_yaml::from_str(&content).map_err(|e| ConfigError::FileParse {
            path: path.display().to_string(),
            source: e,
        })?;

    rules.validate()?;
    Ok(rules)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let rules: FilterRuleSet = serde_yaml::from_str("include_keywords: [크로스핏]").unwrap();
        assert_eq!(rules.include_keywords, vec!["크로스핏".to_string()]);
        assert_eq!(
            rules.abbreviation_pattern.as_deref(),
            Some(DEFAULT_ABBREVIATION_PATTERN)
        );
        assert!((rules.similarity_threshold - 0.9).abs() < f64::EPSILON);
        assert!(rules.compound.is_none());
    }

    #[test]
    fn abbreviation_rule_can_be_disabled() {
        let rules: FilterRuleSet = serde_yaml::from_str("abbreviation_pattern: null").unwrap();
        assert!(rules.abbreviation_pattern.is_none());
    }

    #[test]
    fn compound_rule_parses() {
        let yaml = "compound:\n  first: [cross]\n  second: [fit, 핏]\n";
        let rules: FilterRuleSet = serde_yaml::from_str(yaml).unwrap();
        let compound = rules.compound.expect("compound rule");
        assert_eq!(compound.first, vec!["cross"]);
        assert_eq!(compound.second.len(), 2);
    }

    #[test]
    fn threshold_out_of_range_is_rejected() {
        let rules = FilterRuleSet {
            similarity_threshold: 1.5,
            ..FilterRuleSet::default()
        };
        assert!(matches!(rules.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn blank_keyword_is_rejected() {
        let rules = FilterRuleSet {
            exclude_keywords: vec!["  ".to_string()],
            ..FilterRuleSet::default()
        };
        assert!(rules.validate().is_err());
    }

    #[test]
    fn default_rules_are_valid() {
        assert!(FilterRuleSet::default().validate().is_ok());
    }

    #[test]
    fn shipped_filter_rules_are_valid() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../config/filter_rules.yaml");
        let rules = load_filter_rules(&path).expect("shipped filter rules load");
        assert!(rules.include_keywords.iter().any(|k| k == "크로스핏"));
        assert!(rules.compound.is_some());
    }
}
