use boxfinder_core::{ConfigError, StoreError};
use boxfinder_places::PlacesError;
use thiserror::Error;

/// Faults that end a run, or prevent one from being assembled.
///
/// Per-item failures (one enrichment, one record) never become a
/// `PipelineError`; they are counted in the run statistics.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("run cancelled")]
    Cancelled,

    #[error("no regions configured")]
    NoRegions,

    #[error("directory unavailable: {0}")]
    Directory(#[from] StoreError),

    #[error("place search failed: {0}")]
    Places(PlacesError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl From<PlacesError> for PipelineError {
    fn from(err: PlacesError) -> Self {
        match err {
            PlacesError::Cancelled => PipelineError::Cancelled,
            other => PipelineError::Places(other),
        }
    }
}

impl PipelineError {
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, PipelineError::Cancelled)
    }
}
