//! Discovery run bookkeeping: the statistics a run accumulates and the
//! terminal result handed to reporters.

use std::future::Future;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::directory::StoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerKind {
    Manual,
    Scheduled,
}

impl std::fmt::Display for TriggerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TriggerKind::Manual => write!(f, "manual"),
            TriggerKind::Scheduled => write!(f, "scheduled"),
        }
    }
}

/// Orchestrator state. Stages advance strictly in declaration order until a
/// terminal state is reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStage {
    Started,
    Searching,
    Filtering,
    Enriching,
    Reconciling,
    Reporting,
    Succeeded,
    Failed,
}

impl std::fmt::Display for RunStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RunStage::Started => "started",
            RunStage::Searching => "searching",
            RunStage::Filtering => "filtering",
            RunStage::Enriching => "enriching",
            RunStage::Reconciling => "reconciling",
            RunStage::Reporting => "reporting",
            RunStage::Succeeded => "succeeded",
            RunStage::Failed => "failed",
        };
        f.write_str(name)
    }
}

impl RunStage {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, RunStage::Succeeded | RunStage::Failed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Running,
    Succeeded,
    Failed,
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunStatus::Running => write!(f, "running"),
            RunStatus::Succeeded => write!(f, "succeeded"),
            RunStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Result of a single per-item operation (enrich, create, flag).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    Applied,
    Skipped,
    Failed(String),
}

/// Per-stage counters gathered over one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStats {
    pub regions_configured: usize,
    pub raw_found: usize,
    pub included_by_keyword: usize,
    pub excluded_by_keyword: usize,
    pub excluded_by_type: usize,
    pub kept_by_default: usize,
    pub duplicates_removed: usize,
    pub final_count: usize,
    pub api_calls: u64,
    pub api_failures: u64,
    pub enriched: usize,
    pub enrich_failed: usize,
    pub records_created: usize,
    pub records_skipped: usize,
    pub records_flagged_inactive: usize,
    pub records_already_flagged: usize,
    pub records_failed: usize,
}

/// Terminal record of a discovery run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    pub run_id: Uuid,
    pub trigger: TriggerKind,
    pub status: RunStatus,
    /// Last stage reached. A faulted run ends in `Failed` and its first
    /// error is prefixed with the stage that faulted.
    pub stage: RunStage,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub stats: RunStats,
    pub errors: Vec<String>,
}

impl RunResult {
    #[must_use]
    pub fn start(trigger: TriggerKind) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            trigger,
            status: RunStatus::Running,
            stage: RunStage::Started,
            started_at: Utc::now(),
            finished_at: None,
            stats: RunStats::default(),
            errors: Vec::new(),
        }
    }

    /// Wall-clock duration once the run has finished.
    #[must_use]
    pub fn duration(&self) -> Option<chrono::Duration> {
        self.finished_at.map(|end| end - self.started_at)
    }
}

/// Receives the final (or partial) run result. Formatting and storage are
/// the reporter's concern.
pub trait RunReporter: Send + Sync {
    fn report(&self, result: &RunResult) -> impl Future<Output = Result<(), StoreError>> + Send;
}

/// Reports to both reporters in order. Both always run; the first error
/// wins.
impl<A: RunReporter, B: RunReporter> RunReporter for (A, B) {
    async fn report(&self, result: &RunResult) -> Result<(), StoreError> {
        let first = self.0.report(result).await;
        let second = self.1.report(result).await;
        first.and(second)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_run_starts_running_with_empty_stats() {
        let run = RunResult::start(TriggerKind::Manual);
        assert_eq!(run.status, RunStatus::Running);
        assert_eq!(run.stage, RunStage::Started);
        assert_eq!(run.stats, RunStats::default());
        assert!(run.errors.is_empty());
        assert!(run.duration().is_none());
    }

    #[test]
    fn only_succeeded_and_failed_are_terminal() {
        assert!(RunStage::Succeeded.is_terminal());
        assert!(RunStage::Failed.is_terminal());
        assert!(!RunStage::Reporting.is_terminal());
        assert!(!RunStage::Started.is_terminal());
    }

    struct Failing;

    impl RunReporter for Failing {
        async fn report(&self, _result: &RunResult) -> Result<(), StoreError> {
            Err(StoreError::Backend("unavailable".into()))
        }
    }

    struct Counting(std::sync::atomic::AtomicUsize);

    impl RunReporter for Counting {
        async fn report(&self, _result: &RunResult) -> Result<(), StoreError> {
            self.0.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn paired_reporters_both_run_even_when_first_fails() {
        let pair = (Failing, Counting(std::sync::atomic::AtomicUsize::new(0)));
        let result = pair.report(&RunResult::start(TriggerKind::Manual)).await;
        assert!(matches!(result, Err(StoreError::Backend(_))));
        assert_eq!(pair.1 .0.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[test]
    fn stage_display_matches_serialized_name() {
        for stage in [RunStage::Searching, RunStage::Reporting, RunStage::Failed] {
            let json = serde_json::to_value(stage).expect("serialize stage");
            assert_eq!(json.as_str(), Some(stage.to_string().as_str()));
        }
    }

    #[test]
    fn run_result_serializes_lowercase_enums() {
        let run = RunResult::start(TriggerKind::Scheduled);
        let json = serde_json::to_string(&run).expect("serialize run");
        assert!(json.contains("\"trigger\":\"scheduled\""));
        assert!(json.contains("\"status\":\"running\""));
        assert!(json.contains("\"stage\":\"started\""));
    }
}
