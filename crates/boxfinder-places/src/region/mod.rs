//! Region-driven search: walks the configured regions, subdividing any
//! region dense enough to hit the provider's result cap.

mod hierarchy;

use std::time::Duration;

use boxfinder_core::{AppConfig, Place, RegionNode, RegionsFile};
use futures::future::BoxFuture;
use futures::stream::{self, StreamExt};
use tokio_util::sync::CancellationToken;

use crate::error::PlacesError;
use crate::retry::cancellable_sleep;
use crate::source::PlaceSearch;

pub use hierarchy::AdminHierarchy;

#[derive(Debug, Clone, PartialEq)]
pub struct SearchSettings {
    /// Result count at which a region is split into its children.
    pub subdivision_threshold: usize,
    /// How many times a region may be split below its configured level.
    pub max_depth: u32,
    /// Pause between consecutive region and sub-region queries.
    pub inter_region_delay: Duration,
    /// Region branches searched at once.
    pub max_concurrent_regions: usize,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            subdivision_threshold: 60,
            max_depth: 1,
            inter_region_delay: Duration::from_millis(500),
            max_concurrent_regions: 1,
        }
    }
}

impl SearchSettings {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            subdivision_threshold: config.subdivision_threshold,
            max_depth: config.subdivision_max_depth,
            inter_region_delay: Duration::from_millis(config.inter_region_delay_ms),
            max_concurrent_regions: config.max_concurrent_regions,
        }
    }
}

/// One independently searchable branch: a broad region, or a single
/// sub-region of a nested entry.
#[derive(Debug, Clone)]
struct SearchUnit {
    label: String,
    queries: Vec<String>,
    /// Area to look up when subdividing.
    area: String,
    /// Subtree the lookup is confined to.
    scope: Option<String>,
}

fn search_units(regions: &RegionsFile) -> Vec<SearchUnit> {
    let mut units = Vec::with_capacity(regions.region_count());
    for node in regions.nodes() {
        match &node {
            RegionNode::Broad(region) => units.push(SearchUnit {
                label: region.name.clone(),
                queries: region.queries.clone(),
                area: node.admin_key().to_owned(),
                scope: None,
            }),
            RegionNode::Nested(entry) => {
                for sub in &entry.sub_regions {
                    units.push(SearchUnit {
                        label: format!("{}/{sub}", entry.name),
                        queries: vec![entry.query_for(sub)],
                        area: sub.clone(),
                        scope: Some(node.admin_key().to_owned()),
                    });
                }
            }
        }
    }
    units
}

/// Where a subdivision step currently stands.
#[derive(Debug, Clone, Copy)]
struct Subdivision<'a> {
    label: &'a str,
    base_query: &'a str,
    area: &'a str,
    scope: Option<&'a str>,
    depth: u32,
}

/// Searches every configured region through a [`PlaceSearch`] source.
pub struct RegionSearchEngine<S> {
    source: S,
    regions: RegionsFile,
    hierarchy: AdminHierarchy,
    settings: SearchSettings,
}

impl<S: PlaceSearch> RegionSearchEngine<S> {
    #[must_use]
    pub fn new(source: S, regions: RegionsFile, settings: SearchSettings) -> Self {
        let hierarchy = AdminHierarchy::new(regions.hierarchy.clone());
        Self {
            source,
            regions,
            hierarchy,
            settings,
        }
    }

    /// The underlying source, for follow-up calls such as enrichment.
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Configured broad regions plus nested sub-regions.
    #[must_use]
    pub fn region_count(&self) -> usize {
        self.regions.region_count()
    }

    /// Runs every region query, subdividing dense regions, and returns all
    /// places found. Order follows region declaration order.
    ///
    /// # Errors
    ///
    /// Returns [`PlacesError::Cancelled`] if `cancel` fires. Provider
    /// failures are absorbed by the source and never surface here.
    pub async fn search_all_regions(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Vec<Place>, PlacesError> {
        let units = search_units(&self.regions);
        tracing::info!(
            regions = units.len(),
            concurrency = self.settings.max_concurrent_regions.max(1),
            "starting region search"
        );

        let pending: Vec<_> = units
            .iter()
            .enumerate()
            .map(|(index, unit)| self.search_unit(index, unit, cancel))
            .collect();
        let batches: Vec<Result<Vec<Place>, PlacesError>> = stream::iter(pending)
            .buffered(self.settings.max_concurrent_regions.max(1))
            .collect()
            .await;

        let mut places = Vec::new();
        for batch in batches {
            places.extend(batch?);
        }
        tracing::info!(found = places.len(), "region search complete");
        Ok(places)
    }

    async fn search_unit(
        &self,
        index: usize,
        unit: &SearchUnit,
        cancel: &CancellationToken,
    ) -> Result<Vec<Place>, PlacesError> {
        if index > 0 {
            cancellable_sleep(self.settings.inter_region_delay, cancel).await?;
        } else if cancel.is_cancelled() {
            return Err(PlacesError::Cancelled);
        }

        let mut found = Vec::new();
        for (i, query) in unit.queries.iter().enumerate() {
            if i > 0 {
                cancellable_sleep(self.settings.inter_region_delay, cancel).await?;
            }
            found.extend(self.source.search(query, &unit.label).await);
        }
        tracing::info!(region = %unit.label, found = found.len(), "region searched");

        let Some(base_query) = unit.queries.first() else {
            return Ok(found);
        };
        let step = Subdivision {
            label: &unit.label,
            base_query,
            area: &unit.area,
            scope: unit.scope.as_deref(),
            depth: 0,
        };
        self.subdivide(step, found, cancel).await
    }

    /// Replaces `results` with the union of per-child searches when the
    /// region is dense and has known children; otherwise keeps `results`.
    fn subdivide<'a>(
        &'a self,
        step: Subdivision<'a>,
        results: Vec<Place>,
        cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, Result<Vec<Place>, PlacesError>> {
        Box::pin(async move {
            if results.len() < self.settings.subdivision_threshold
                || step.depth >= self.settings.max_depth
            {
                return Ok(results);
            }
            let Some(children) = self.hierarchy.children_of(step.scope, step.area) else {
                tracing::debug!(
                    region = step.label,
                    results = results.len(),
                    "dense region has no known children; keeping results"
                );
                return Ok(results);
            };

            tracing::info!(
                region = step.label,
                results = results.len(),
                children = children.len(),
                depth = step.depth,
                "threshold reached; subdividing region"
            );

            let mut subdivided = Vec::new();
            for child in children {
                cancellable_sleep(self.settings.inter_region_delay, cancel).await?;
                let query = format!("{} in {child}", step.base_query);
                let label = format!("{}/{child}", step.label);
                let found = self.source.search(&query, &label).await;
                let next = Subdivision {
                    label: &label,
                    base_query: &query,
                    area: child,
                    scope: step.scope,
                    depth: step.depth + 1,
                };
                subdivided.extend(self.subdivide(next, found, cancel).await?);
            }
            Ok(subdivided)
        })
    }
}

#[cfg(test)]
#[path = "../region_test.rs"]
mod tests;
