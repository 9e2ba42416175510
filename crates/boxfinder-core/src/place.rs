use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::geo::Coordinates;

/// One result from the external places search, normalized for this run.
///
/// Places are ephemeral: they live for the duration of a single run and are
/// never persisted directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Place {
    /// Provider place identifier. Not every result carries one.
    pub place_id: Option<String>,
    /// Display name; empty when the provider omitted it.
    pub name: String,
    pub formatted_address: String,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub rating: Option<f64>,
    pub rating_count: Option<u32>,
    /// Provider category tags (e.g. `gym`, `health`).
    pub types: BTreeSet<String>,
    /// Label of the region query that produced this place.
    pub region: String,
    pub discovered_at: DateTime<Utc>,
}

impl Place {
    /// Builds a place with only a name and region; everything else empty.
    #[must_use]
    pub fn named(name: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            place_id: None,
            name: name.into(),
            formatted_address: String::new(),
            phone: None,
            website: None,
            latitude: None,
            longitude: None,
            rating: None,
            rating_count: None,
            types: BTreeSet::new(),
            region: region.into(),
            discovered_at: Utc::now(),
        }
    }

    #[must_use]
    pub fn has_name(&self) -> bool {
        !self.name.trim().is_empty()
    }

    #[must_use]
    pub fn coordinates(&self) -> Option<Coordinates> {
        Coordinates::from_parts(self.latitude, self.longitude)
    }

    /// The provider identifier when present and non-empty.
    #[must_use]
    pub fn source_id(&self) -> Option<&str> {
        self.place_id.as_deref().filter(|id| !id.is_empty())
    }
}
