use boxfinder_core::{is_nearby, DirectoryRecord, Place};

/// Decides whether a discovered place is the same gym as an existing record.
///
/// The index only offers records whose display name equals the place name,
/// so strategies refine an exact-name candidate set.
pub trait MatchStrategy: Send + Sync {
    fn matches(&self, place: &Place, record: &DirectoryRecord) -> bool;
}

/// Exact name plus geographic proximity.
///
/// When either side has no coordinates the records are treated as nearby
/// and the name alone decides.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NameProximityMatch {
    radius_km: f64,
}

impl NameProximityMatch {
    #[must_use]
    pub fn new(radius_km: f64) -> Self {
        Self { radius_km }
    }

    #[must_use]
    pub fn radius_km(&self) -> f64 {
        self.radius_km
    }
}

impl Default for NameProximityMatch {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl MatchStrategy for NameProximityMatch {
    fn matches(&self, place: &Place, record: &DirectoryRecord) -> bool {
        record.display_name == place.name
            && is_nearby(place.coordinates(), record.coordinates(), self.radius_km)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn record(name: &str, lat: Option<f64>, lng: Option<f64>) -> DirectoryRecord {
        DirectoryRecord {
            id: 1,
            login: "test-box".to_owned(),
            display_name: name.to_owned(),
            phone: None,
            address: None,
            latitude: lat,
            longitude: lng,
            created_at: Utc::now(),
        }
    }

    fn place_at(name: &str, lat: f64, lng: f64) -> Place {
        let mut p = Place::named(name, "서울");
        p.latitude = Some(lat);
        p.longitude = Some(lng);
        p
    }

    #[test]
    fn same_name_within_radius_matches() {
        let strategy = NameProximityMatch::new(1.0);
        let r = record("Test Box", Some(37.50), Some(127.00));
        assert!(strategy.matches(&place_at("Test Box", 37.505, 127.003), &r));
    }

    #[test]
    fn same_name_far_away_does_not_match() {
        let strategy = NameProximityMatch::new(1.0);
        let r = record("Test Box", Some(37.5665), Some(126.9780));
        assert!(!strategy.matches(&place_at("Test Box", 35.1796, 129.0756), &r));
    }

    #[test]
    fn name_must_match_exactly() {
        let strategy = NameProximityMatch::default();
        let r = record("Test Box", Some(37.50), Some(127.00));
        assert!(!strategy.matches(&place_at("test box", 37.50, 127.00), &r));
    }

    #[test]
    fn missing_coordinates_fall_back_to_name() {
        let strategy = NameProximityMatch::default();
        let r = record("Test Box", None, None);
        assert!(strategy.matches(&place_at("Test Box", 35.0, 129.0), &r));
    }
}
