//! Region hierarchy configuration: the regions to search and the
//! administrative tree used when a region has to be subdivided.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Placeholder substituted with a sub-region name in nested query templates.
pub const REGION_PLACEHOLDER: &str = "{region}";

/// A level-1 region searched with one or more literal queries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BroadRegion {
    pub name: String,
    pub queries: Vec<String>,
    /// Key into the administrative hierarchy; defaults to `name`.
    #[serde(default)]
    pub admin_key: Option<String>,
}

/// A level-2 entry: one query template expanded over named sub-regions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NestedRegion {
    pub name: String,
    pub query_template: String,
    pub sub_regions: Vec<String>,
    /// Scope in the administrative hierarchy under which sub-regions are
    /// looked up; defaults to `name`.
    #[serde(default)]
    pub admin_key: Option<String>,
}

impl NestedRegion {
    /// The concrete query for one sub-region.
    #[must_use]
    pub fn query_for(&self, sub_region: &str) -> String {
        self.query_template.replace(REGION_PLACEHOLDER, sub_region)
    }
}

/// A node in the administrative hierarchy (province, city, district, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminArea {
    pub name: String,
    #[serde(default)]
    pub children: Vec<AdminArea>,
}

impl AdminArea {
    /// Depth-first search for the area called `name` within this subtree.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<&AdminArea> {
        if self.name == name {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(name))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegionNode {
    Broad(BroadRegion),
    Nested(NestedRegion),
}

impl RegionNode {
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            RegionNode::Broad(r) => &r.name,
            RegionNode::Nested(r) => &r.name,
        }
    }

    #[must_use]
    pub fn admin_key(&self) -> &str {
        match self {
            RegionNode::Broad(r) => r.admin_key.as_deref().unwrap_or(&r.name),
            RegionNode::Nested(r) => r.admin_key.as_deref().unwrap_or(&r.name),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegionsFile {
    #[serde(default)]
    pub broad: Vec<BroadRegion>,
    #[serde(default)]
    pub nested: Vec<NestedRegion>,
    #[serde(default)]
    pub hierarchy: Vec<AdminArea>,
}

impl RegionsFile {
    /// All regions in traversal order: broad regions first, then nested
    /// entries, each in declaration order.
    #[must_use]
    pub fn nodes(&self) -> Vec<RegionNode> {
        self.broad
            .iter()
            .cloned()
            .map(RegionNode::Broad)
            .chain(self.nested.iter().cloned().map(RegionNode::Nested))
            .collect()
    }

    /// Number of configured search regions: each broad region plus each
    /// nested sub-region.
    #[must_use]
    pub fn region_count(&self) -> usize {
        self.broad.len() + self.nested.iter().map(|n| n.sub_regions.len()).sum::<usize>()
    }
}

/// Load and validate the regions configuration from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_regions(path: &Path) -> Result<RegionsFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    let regions: RegionsFile =
        serde_yaml::from_str(&content).map_err(|e| ConfigError::FileParse {
            path: path.display().to_string(),
            source: e,
        })?;

    validate_regions(&regions)?;
    Ok(regions)
}

fn validate_regions(regions: &RegionsFile) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();

    for region in &regions.broad {
        if region.name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "region name must be non-empty".to_string(),
            ));
        }
        if region.queries.iter().all(|q| q.trim().is_empty()) {
            return Err(ConfigError::Validation(format!(
                "region '{}' has no search queries",
                region.name
            )));
        }
        if !seen.insert(region.name.clone()) {
            return Err(ConfigError::Validation(format!(
                "duplicate region name: '{}'",
                region.name
            )));
        }
    }

    for entry in &regions.nested {
        if entry.name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "region name must be non-empty".to_string(),
            ));
        }
        if !entry.query_template.contains(REGION_PLACEHOLDER) {
            return Err(ConfigError::Validation(format!(
                "region '{}' query_template must contain {REGION_PLACEHOLDER}",
                entry.name
            )));
        }
        if entry.sub_regions.iter().any(|s| s.trim().is_empty()) {
            return Err(ConfigError::Validation(format!(
                "region '{}' has an empty sub-region name",
                entry.name
            )));
        }
        if !seen.insert(entry.name.clone()) {
            return Err(ConfigError::Validation(format!(
                "duplicate region name: '{}'",
                entry.name
            )));
        }
    }

    Ok(())
}
