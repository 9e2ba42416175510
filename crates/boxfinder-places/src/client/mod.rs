//! HTTP client for the Places text-search and details endpoints.

mod search;

use std::time::Duration;

use boxfinder_core::AppConfig;
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;

use crate::counter::ApiCallCounter;
use crate::error::PlacesError;
use crate::retry::{retry_with_backoff, Backoff};
use crate::types::{ApiStatus, DetailsResponse, PlaceDetails, TextSearchResponse};

/// Pages fetched per query. The provider serves at most three.
pub const MAX_PAGES: usize = 3;

const DETAILS_FIELDS: &str = "formatted_phone_number,website";

/// Everything the client needs besides the shared counter.
#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub api_key: String,
    pub base_url: String,
    pub language: String,
    pub timeout_secs: u64,
    pub user_agent: String,
    /// Minimum pause before every outbound request.
    pub call_delay: Duration,
    /// Pause before requesting a continuation page.
    pub page_token_delay: Duration,
    pub backoff: Backoff,
}

impl ClientSettings {
    /// # Errors
    ///
    /// Returns [`PlacesError::MissingApiKey`] when no key is configured.
    pub fn from_app_config(config: &AppConfig) -> Result<Self, PlacesError> {
        let api_key = config
            .places_api_key
            .clone()
            .ok_or(PlacesError::MissingApiKey)?;
        Ok(Self {
            api_key,
            base_url: config.places_base_url.clone(),
            language: config.places_language.clone(),
            timeout_secs: config.request_timeout_secs,
            user_agent: config.user_agent.clone(),
            call_delay: Duration::from_millis(config.call_delay_ms),
            page_token_delay: Duration::from_millis(config.page_token_delay_ms),
            backoff: Backoff::new(
                config.max_attempts,
                Duration::from_millis(config.backoff_initial_ms),
            ),
        })
    }
}

/// Rate-limited Places client.
///
/// Every outbound attempt is preceded by the configured call delay. Attempts
/// that reach the provider are counted on the shared [`ApiCallCounter`]. Provider statuses are mapped
/// onto [`PlacesError`] so the retry layer can classify them.
pub struct PlacesClient {
    client: Client,
    base_url: Url,
    api_key: String,
    language: String,
    call_delay: Duration,
    page_token_delay: Duration,
    backoff: Backoff,
    counter: ApiCallCounter,
    cancel: CancellationToken,
}

impl PlacesClient {
    /// # Errors
    ///
    /// - [`PlacesError::Http`] if the `reqwest::Client` cannot be built.
    /// - [`PlacesError::InvalidBaseUrl`] if `settings.base_url` does not parse.
    pub fn new(settings: ClientSettings, counter: ApiCallCounter) -> Result<Self, PlacesError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(settings.user_agent.as_str())
            .build()?;

        // Exactly one trailing slash so `join` appends instead of replacing
        // the last path segment.
        let normalised = format!("{}/", settings.base_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalised).map_err(|e| PlacesError::InvalidBaseUrl {
            base_url: settings.base_url.clone(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            client,
            base_url,
            api_key: settings.api_key,
            language: settings.language,
            call_delay: settings.call_delay,
            page_token_delay: settings.page_token_delay,
            backoff: settings.backoff,
            counter,
            cancel: CancellationToken::new(),
        })
    }

    /// Ties in-flight waits and retries to `cancel`.
    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    #[must_use]
    pub fn counter(&self) -> &ApiCallCounter {
        &self.counter
    }

    fn endpoint_url(&self, endpoint: &str, params: &[(&str, &str)]) -> Result<Url, PlacesError> {
        let mut url = self
            .base_url
            .join(endpoint)
            .map_err(|e| PlacesError::InvalidBaseUrl {
                base_url: self.base_url.to_string(),
                reason: e.to_string(),
            })?;
        {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in params {
                pairs.append_pair(key, value);
            }
            pairs.append_pair("language", &self.language);
            pairs.append_pair("key", &self.api_key);
        }
        Ok(url)
    }

    /// One paced, counted GET decoded as `T`. No retry at this level.
    async fn get_json<T: DeserializeOwned>(&self, url: &Url, context: &str) -> Result<T, PlacesError> {
        tokio::time::sleep(self.call_delay).await;

        // Attempts refused before a connection was made are not counted.
        let response = match self.client.get(url.clone()).send().await {
            Ok(response) => {
                self.counter.record_call();
                response
            }
            Err(e) => {
                if !e.is_connect() {
                    self.counter.record_call();
                }
                return Err(e.into());
            }
        };
        let status = response.status();
        if !status.is_success() {
            return Err(PlacesError::UnexpectedStatus {
                status: status.as_u16(),
                url: url.path().to_owned(),
            });
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| PlacesError::Deserialize {
            context: context.to_owned(),
            source: e,
        })
    }

    /// Fetches one text-search page with retry.
    ///
    /// `ZERO_RESULTS` comes back as an empty page.
    ///
    /// # Errors
    ///
    /// - [`PlacesError::InvalidRequest`] on `INVALID_REQUEST` (never retried).
    /// - [`PlacesError::QuotaExceeded`] or [`PlacesError::ApiStatus`] once
    ///   the retry schedule is exhausted.
    /// - [`PlacesError::Http`], [`PlacesError::UnexpectedStatus`] or
    ///   [`PlacesError::Deserialize`] likewise.
    /// - [`PlacesError::Cancelled`] if the run was cancelled mid-wait.
    pub async fn text_search_page(
        &self,
        query: &str,
        page_token: Option<&str>,
    ) -> Result<TextSearchResponse, PlacesError> {
        let mut params = vec![("query", query)];
        if let Some(token) = page_token {
            params.push(("pagetoken", token));
        }
        let url = &self.endpoint_url("textsearch/json", &params)?;
        let context = &format!("textsearch(query={query})");

        retry_with_backoff(&self.backoff, &self.cancel, move |_| async move {
            let mut response: TextSearchResponse = self.get_json(url, context).await?;
            match ApiStatus::parse(&response.status) {
                ApiStatus::Ok => Ok(response),
                ApiStatus::ZeroResults => {
                    response.results.clear();
                    response.next_page_token = None;
                    Ok(response)
                }
                status => Err(status_error(status, &response.status, response.error_message)),
            }
        })
        .await
    }

    /// Fetches phone and website for `place_id` with retry.
    ///
    /// Returns `Ok(None)` when the provider has no record for the id.
    ///
    /// # Errors
    ///
    /// Same classification as [`PlacesClient::text_search_page`].
    pub async fn place_details(&self, place_id: &str) -> Result<Option<PlaceDetails>, PlacesError> {
        let url = &self.endpoint_url(
            "details/json",
            &[("place_id", place_id), ("fields", DETAILS_FIELDS)],
        )?;
        let context = &format!("details(place_id={place_id})");

        retry_with_backoff(&self.backoff, &self.cancel, move |_| async move {
            let response: DetailsResponse = self.get_json(url, context).await?;
            match ApiStatus::parse(&response.status) {
                ApiStatus::Ok => Ok(response.result),
                ApiStatus::ZeroResults | ApiStatus::NotFound => Ok(None),
                status => Err(status_error(status, &response.status, response.error_message)),
            }
        })
        .await
    }
}

fn status_error(status: ApiStatus, raw: &str, message: Option<String>) -> PlacesError {
    let message = message.unwrap_or_default();
    match status {
        ApiStatus::OverQueryLimit => PlacesError::QuotaExceeded,
        ApiStatus::InvalidRequest => PlacesError::InvalidRequest(message),
        _ => PlacesError::ApiStatus {
            status: raw.to_owned(),
            message,
        },
    }
}

#[cfg(test)]
#[path = "../client_test.rs"]
mod tests;
