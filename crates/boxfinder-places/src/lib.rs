pub mod client;
pub mod counter;
pub mod error;
pub mod normalize;
pub mod region;
pub mod retry;
pub mod source;
pub mod types;

pub use client::{ClientSettings, PlacesClient, MAX_PAGES};
pub use counter::ApiCallCounter;
pub use error::PlacesError;
pub use normalize::normalize_place;
pub use region::{AdminHierarchy, RegionSearchEngine, SearchSettings};
pub use retry::{Attempt, Backoff};
pub use source::PlaceSearch;
pub use types::{ApiStatus, DetailsResponse, RawPlace, TextSearchResponse};
