use boxfinder_core::{ItemOutcome, Place};
use chrono::Utc;

use super::{PlacesClient, MAX_PAGES};
use crate::error::PlacesError;
use crate::normalize::normalize_place;
use crate::source::PlaceSearch;

impl PlacesClient {
    /// Runs `query` across up to [`MAX_PAGES`] pages, tagging each result
    /// with `region`.
    ///
    /// A page that fails ends pagination; pages already fetched are kept.
    /// Failures are counted on the shared counter and never propagated.
    pub async fn search_text(&self, query: &str, region: &str) -> Vec<Place> {
        let mut places = Vec::new();
        let mut page_token: Option<String> = None;

        for page in 1..=MAX_PAGES {
            if page > 1 {
                // Continuation tokens only become valid after a short delay.
                if crate::retry::cancellable_sleep(self.page_token_delay, &self.cancel)
                    .await
                    .is_err()
                {
                    break;
                }
            }

            match self.text_search_page(query, page_token.as_deref()).await {
                Ok(response) => {
                    let now = Utc::now();
                    tracing::debug!(
                        query,
                        page,
                        results = response.results.len(),
                        "text search page fetched"
                    );
                    places.extend(
                        response
                            .results
                            .into_iter()
                            .map(|raw| normalize_place(raw, region, now)),
                    );
                    page_token = response.next_page_token.filter(|t| !t.is_empty());
                    if page_token.is_none() {
                        break;
                    }
                }
                Err(PlacesError::Cancelled) => break,
                Err(PlacesError::InvalidRequest(message)) => {
                    self.counter.record_failure();
                    tracing::warn!(query, page, %message, "text search rejected as malformed");
                    break;
                }
                Err(e) => {
                    self.counter.record_failure();
                    tracing::error!(query, page, error = %e, "text search failed");
                    break;
                }
            }
        }

        places
    }

    /// Fills phone and website from the details endpoint.
    ///
    /// Places without a provider id are skipped. A place that gained
    /// nothing new is reported as skipped rather than applied.
    pub async fn enrich_details(&self, mut place: Place) -> (Place, ItemOutcome) {
        let Some(place_id) = place.source_id().map(str::to_owned) else {
            return (place, ItemOutcome::Skipped);
        };

        match self.place_details(&place_id).await {
            Ok(Some(details)) => {
                let mut changed = false;
                if let Some(phone) = details.formatted_phone_number.filter(|p| !p.trim().is_empty())
                {
                    place.phone = Some(phone);
                    changed = true;
                }
                if let Some(website) = details.website.filter(|w| !w.trim().is_empty()) {
                    place.website = Some(website);
                    changed = true;
                }
                let outcome = if changed {
                    ItemOutcome::Applied
                } else {
                    ItemOutcome::Skipped
                };
                (place, outcome)
            }
            Ok(None) => (place, ItemOutcome::Skipped),
            Err(e) => {
                if !matches!(e, PlacesError::Cancelled) {
                    self.counter.record_failure();
                }
                tracing::warn!(place_id, name = %place.name, error = %e, "details lookup failed");
                (place, ItemOutcome::Failed(e.to_string()))
            }
        }
    }
}

impl PlaceSearch for PlacesClient {
    async fn search(&self, query: &str, region: &str) -> Vec<Place> {
        self.search_text(query, region).await
    }

    async fn enrich(&self, place: Place) -> (Place, ItemOutcome) {
        self.enrich_details(place).await
    }
}
