use boxfinder_core::Place;
use chrono::{DateTime, Utc};

use crate::types::RawPlace;

/// Maps a raw text-search result onto the domain [`Place`].
///
/// Missing strings become empty, missing coordinates stay `None`, and the
/// provider's type tags are collected into a set.
#[must_use]
pub fn normalize_place(raw: RawPlace, region: &str, discovered_at: DateTime<Utc>) -> Place {
    let location = raw.geometry.and_then(|g| g.location);
    Place {
        place_id: raw
            .place_id
            .map(|id| id.trim().to_owned())
            .filter(|id| !id.is_empty()),
        name: raw.name.map(|n| n.trim().to_owned()).unwrap_or_default(),
        formatted_address: raw
            .formatted_address
            .map(|a| a.trim().to_owned())
            .unwrap_or_default(),
        phone: None,
        website: None,
        latitude: location.map(|l| l.lat),
        longitude: location.map(|l| l.lng),
        rating: raw.rating,
        rating_count: raw.user_ratings_total,
        types: raw.types.into_iter().collect(),
        region: region.to_owned(),
        discovered_at,
    }
}
