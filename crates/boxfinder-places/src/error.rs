use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlacesError {
    /// Stored without its URL, which carries the API key.
    #[error("HTTP error: {0}")]
    Http(reqwest::Error),

    #[error("places API quota exceeded (OVER_QUERY_LIMIT)")]
    QuotaExceeded,

    #[error("places API rejected the request as malformed: {0}")]
    InvalidRequest(String),

    #[error("places API returned status {status}: {message}")]
    ApiStatus { status: String, message: String },

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid places base URL \"{base_url}\": {reason}")]
    InvalidBaseUrl { base_url: String, reason: String },

    #[error("PLACES_API_KEY is not configured")]
    MissingApiKey,

    #[error("request cancelled")]
    Cancelled,
}

impl From<reqwest::Error> for PlacesError {
    fn from(e: reqwest::Error) -> Self {
        Self::Http(e.without_url())
    }
}
