use std::collections::HashSet;

use boxfinder_core::Place;

use super::similarity::similarity;

/// Drops duplicates in two passes per place, keeping the first occurrence.
///
/// A place is a duplicate when its provider id was already seen, or when an
/// accepted place has the exact same formatted address and a name
/// similarity of at least `threshold`. Returns the survivors and the number
/// removed.
#[must_use]
pub fn deduplicate(places: Vec<Place>, threshold: f64) -> (Vec<Place>, usize) {
    let mut seen_ids: HashSet<String> = HashSet::new();
    let mut accepted: Vec<Place> = Vec::with_capacity(places.len());
    let mut removed = 0usize;

    for place in places {
        if let Some(id) = place.source_id() {
            if seen_ids.contains(id) {
                removed += 1;
                continue;
            }
        }

        let near_duplicate = accepted.iter().any(|kept| {
            kept.formatted_address == place.formatted_address
                && similarity(&kept.name, &place.name) >= threshold
        });
        if near_duplicate {
            tracing::debug!(name = %place.name, address = %place.formatted_address, "dropping near-duplicate");
            removed += 1;
            continue;
        }

        if let Some(id) = place.source_id() {
            seen_ids.insert(id.to_owned());
        }
        accepted.push(place);
    }

    (accepted, removed)
}
