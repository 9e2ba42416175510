pub mod app_config;
pub mod config;
pub mod directory;
pub mod geo;
pub mod place;
pub mod regions;
pub mod rules;
pub mod run;

pub use app_config::{AppConfig, Environment};
pub use config::{build_app_config, load_app_config, load_app_config_from_env};
pub use directory::{
    fallback_slug, CandidateFlag, DirectoryRecord, DirectoryStore, InactiveCandidate,
    InactiveCandidateStore, NewDirectoryRecord, SlugTranslator, StoreError,
};
pub use geo::{haversine_km, is_nearby, Coordinates, EARTH_RADIUS_KM};
pub use place::Place;
pub use regions::{
    load_regions, AdminArea, BroadRegion, NestedRegion, RegionNode, RegionsFile,
    REGION_PLACEHOLDER,
};
pub use rules::{load_filter_rules, CompoundRule, FilterRuleSet, DEFAULT_ABBREVIATION_PATTERN};
pub use run::{
    ItemOutcome, RunReporter, RunResult, RunStage, RunStats, RunStatus, TriggerKind,
};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read config file {path}: {source}")]
    FileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    FileParse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("config validation failed: {0}")]
    Validation(String),
}
