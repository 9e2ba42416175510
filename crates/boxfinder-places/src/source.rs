use std::future::Future;

use boxfinder_core::{ItemOutcome, Place};

/// Anything that can answer a text query with places and fill in contact
/// details for a single place.
///
/// [`crate::PlacesClient`] is the production implementation; tests plug in
/// in-memory fakes.
pub trait PlaceSearch: Send + Sync {
    /// Every result for `query`, tagged with `region`. Provider failures are
    /// absorbed and yield whatever was collected before the failure.
    fn search(&self, query: &str, region: &str) -> impl Future<Output = Vec<Place>> + Send;

    /// Best-effort phone/website lookup. The place is returned either way.
    fn enrich(&self, place: Place) -> impl Future<Output = (Place, ItemOutcome)> + Send;
}
