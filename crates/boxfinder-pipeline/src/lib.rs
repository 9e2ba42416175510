//! Discovery run: region search, filtering, enrichment and directory
//! reconciliation, driven by a single orchestrator.

pub mod assemble;
pub mod error;
pub mod filter;
pub mod guard;
pub mod reconcile;
pub mod reporter;
pub mod run;

pub use assemble::{build_pipeline, PgDiscoveryPipeline};
pub use error::PipelineError;
pub use filter::{deduplicate, similarity, FilterEngine, FilterStats, Verdict, FITNESS_TAG};
pub use guard::{RunGuard, RunPermit};
pub use reconcile::{
    romanize, DirectoryIndex, HangulRomanizer, MatchStrategy, NameProximityMatch, Reconciler,
    SyncStats,
};
pub use reporter::TracingReporter;
pub use run::{DiscoveryPipeline, RunOptions};
