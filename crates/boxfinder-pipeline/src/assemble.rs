//! Wires the production pipeline from configuration.

use boxfinder_core::{load_filter_rules, load_regions, AppConfig, RunReporter};
use boxfinder_db::PgDirectory;
use boxfinder_places::{
    ApiCallCounter, ClientSettings, PlacesClient, RegionSearchEngine, SearchSettings,
};
use sqlx::PgPool;
use tokio_util::sync::CancellationToken;

use crate::error::PipelineError;
use crate::filter::FilterEngine;
use crate::reconcile::{HangulRomanizer, NameProximityMatch};
use crate::run::DiscoveryPipeline;

pub type PgDiscoveryPipeline<R> =
    DiscoveryPipeline<PlacesClient, PgDirectory, HangulRomanizer, R, NameProximityMatch>;

/// Loads the region and filter files, builds the Places client and binds
/// everything to `pool`.
///
/// `cancel` interrupts in-flight waits and retries inside the client; pass
/// the same token to [`DiscoveryPipeline::run`].
///
/// # Errors
///
/// - [`PipelineError::Config`] if either YAML file is missing or invalid.
/// - [`PipelineError::Places`] if no API key is configured or the client
///   cannot be built.
pub fn build_pipeline<R: RunReporter>(
    config: &AppConfig,
    pool: PgPool,
    reporter: R,
    cancel: CancellationToken,
) -> Result<PgDiscoveryPipeline<R>, PipelineError> {
    let regions = load_regions(&config.regions_path)?;
    let rules = load_filter_rules(&config.filter_rules_path)?;
    let filter = FilterEngine::new(&rules)?;

    let counter = ApiCallCounter::new();
    let client = PlacesClient::new(ClientSettings::from_app_config(config)?, counter.clone())?
        .with_cancellation(cancel);
    let search = RegionSearchEngine::new(client, regions, SearchSettings::from_app_config(config));

    tracing::debug!(
        regions = search.region_count(),
        match_radius_km = config.match_radius_km,
        "discovery pipeline assembled"
    );

    Ok(DiscoveryPipeline::new(
        search,
        filter,
        PgDirectory::new(pool),
        HangulRomanizer,
        reporter,
        NameProximityMatch::new(config.match_radius_km),
        counter,
    ))
}
