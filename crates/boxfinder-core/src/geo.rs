//! Great-circle distance helpers used for proximity matching.

/// Mean earth radius used by the spherical approximation.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinates {
    /// Pairs latitude and longitude; `None` unless both are present.
    #[must_use]
    pub fn from_parts(lat: Option<f64>, lng: Option<f64>) -> Option<Self> {
        Some(Self { lat: lat?, lng: lng? })
    }
}

/// Haversine distance in kilometres between two points.
#[must_use]
pub fn haversine_km(a: Coordinates, b: Coordinates) -> f64 {
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lng = (b.lng - a.lng).to_radians();
    let h = (d_lat / 2.0).sin().powi(2)
        + a.lat.to_radians().cos() * b.lat.to_radians().cos() * (d_lng / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().atan2((1.0 - h).sqrt())
}

/// Whether two optional positions are within `radius_km` of each other.
///
/// Missing coordinates on either side count as nearby, so matching falls
/// back to the name alone.
#[must_use]
pub fn is_nearby(a: Option<Coordinates>, b: Option<Coordinates>, radius_km: f64) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => haversine_km(a, b) <= radius_km,
        _ => true,
    }
}
