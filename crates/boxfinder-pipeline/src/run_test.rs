use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use boxfinder_core::{
    BroadRegion, CandidateFlag, DirectoryRecord, FilterRuleSet, InactiveCandidate, NewDirectoryRecord,
    RegionsFile, RunStats, StoreError,
};
use boxfinder_places::SearchSettings;
use chrono::NaiveDate;

use super::*;
use crate::reconcile::{HangulRomanizer, NameProximityMatch};

const QUERY: &str = "크로스핏 서울";

#[derive(Clone, Default)]
struct FakeSource {
    places: HashMap<String, Vec<Place>>,
    counter: ApiCallCounter,
    phone: Option<String>,
    enrich_calls: Arc<Mutex<Vec<String>>>,
}

impl PlaceSearch for FakeSource {
    async fn search(&self, query: &str, region: &str) -> Vec<Place> {
        self.counter.record_call();
        self.places
            .get(query)
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .map(|mut p| {
                p.region = region.to_owned();
                p
            })
            .collect()
    }

    async fn enrich(&self, mut place: Place) -> (Place, ItemOutcome) {
        self.enrich_calls.lock().unwrap().push(place.name.clone());
        match &self.phone {
            Some(phone) => {
                place.phone = Some(phone.clone());
                (place, ItemOutcome::Applied)
            }
            None => (place, ItemOutcome::Skipped),
        }
    }
}

#[derive(Clone, Default)]
struct FakeDirectory {
    records: Arc<Mutex<Vec<DirectoryRecord>>>,
    candidates: Arc<Mutex<Vec<(i64, NaiveDate)>>>,
    unreachable: bool,
    reject_name: Option<String>,
    /// Open candidates stay invisible to the existence check, as if another
    /// writer opened them after it ran.
    stale_candidate_reads: bool,
}

impl FakeDirectory {
    fn with(records: Vec<DirectoryRecord>) -> Self {
        Self {
            records: Arc::new(Mutex::new(records)),
            ..Self::default()
        }
    }

    fn records(&self) -> Vec<DirectoryRecord> {
        self.records.lock().unwrap().clone()
    }

    fn candidates(&self) -> Vec<(i64, NaiveDate)> {
        self.candidates.lock().unwrap().clone()
    }
}

impl DirectoryStore for FakeDirectory {
    async fn find_all(&self) -> Result<Vec<DirectoryRecord>, StoreError> {
        if self.unreachable {
            return Err(StoreError::Backend("connection refused".into()));
        }
        Ok(self.records())
    }

    async fn login_exists(&self, login: &str) -> Result<bool, StoreError> {
        Ok(self.records.lock().unwrap().iter().any(|r| r.login == login))
    }

    async fn create(&self, new: NewDirectoryRecord) -> Result<DirectoryRecord, StoreError> {
        if self.reject_name.as_deref() == Some(new.display_name.as_str()) {
            return Err(StoreError::Backend("insert rejected".into()));
        }
        let mut records = self.records.lock().unwrap();
        let id = records.iter().map(|r| r.id).max().unwrap_or(0) + 1;
        let record = DirectoryRecord {
            id,
            login: new.login,
            display_name: new.display_name,
            phone: new.phone,
            address: new.address,
            latitude: new.latitude,
            longitude: new.longitude,
            created_at: Utc::now(),
        };
        records.push(record.clone());
        Ok(record)
    }
}

impl InactiveCandidateStore for FakeDirectory {
    async fn open_exists_for_record(&self, record_id: i64) -> Result<bool, StoreError> {
        if self.stale_candidate_reads {
            return Ok(false);
        }
        Ok(self
            .candidates
            .lock()
            .unwrap()
            .iter()
            .any(|(id, _)| *id == record_id))
    }

    async fn create_candidate(
        &self,
        record_id: i64,
        detected_on: NaiveDate,
    ) -> Result<CandidateFlag, StoreError> {
        let mut candidates = self.candidates.lock().unwrap();
        if let Some(pos) = candidates.iter().position(|(id, _)| *id == record_id) {
            return Ok(CandidateFlag::AlreadyOpen(InactiveCandidate {
                id: i64::try_from(pos + 1).unwrap(),
                directory_record_id: record_id,
                detected_on: candidates[pos].1,
                resolved_at: None,
            }));
        }
        candidates.push((record_id, detected_on));
        Ok(CandidateFlag::Opened(InactiveCandidate {
            id: i64::try_from(candidates.len()).unwrap(),
            directory_record_id: record_id,
            detected_on,
            resolved_at: None,
        }))
    }
}

#[derive(Clone, Default)]
struct FakeReporter {
    reports: Arc<Mutex<Vec<RunResult>>>,
    fail: bool,
}

impl FakeReporter {
    fn reports(&self) -> Vec<RunResult> {
        self.reports.lock().unwrap().clone()
    }
}

impl RunReporter for FakeReporter {
    async fn report(&self, result: &RunResult) -> Result<(), StoreError> {
        self.reports.lock().unwrap().push(result.clone());
        if self.fail {
            return Err(StoreError::Backend("report table missing".into()));
        }
        Ok(())
    }
}

type TestPipeline =
    DiscoveryPipeline<FakeSource, FakeDirectory, HangulRomanizer, FakeReporter, NameProximityMatch>;

fn record(id: i64, name: &str, login: &str, lat: f64, lng: f64) -> DirectoryRecord {
    DirectoryRecord {
        id,
        login: login.to_owned(),
        display_name: name.to_owned(),
        phone: None,
        address: None,
        latitude: Some(lat),
        longitude: Some(lng),
        created_at: Utc::now(),
    }
}

fn place(id: &str, name: &str, lat: f64, lng: f64) -> Place {
    let mut p = Place::named(name, "");
    p.place_id = Some(id.to_owned());
    p.formatted_address = format!("{name} address");
    p.latitude = Some(lat);
    p.longitude = Some(lng);
    p
}

fn seoul() -> RegionsFile {
    RegionsFile {
        broad: vec![BroadRegion {
            name: "서울".to_owned(),
            queries: vec![QUERY.to_owned()],
            admin_key: None,
        }],
        ..RegionsFile::default()
    }
}

fn source_with(places: Vec<Place>) -> FakeSource {
    FakeSource {
        places: HashMap::from([(QUERY.to_owned(), places)]),
        phone: Some("02-555-0100".to_owned()),
        ..FakeSource::default()
    }
}

fn pipeline_with(
    regions: RegionsFile,
    source: FakeSource,
    directory: FakeDirectory,
    reporter: FakeReporter,
) -> TestPipeline {
    let settings = SearchSettings {
        inter_region_delay: Duration::ZERO,
        ..SearchSettings::default()
    };
    let counter = source.counter.clone();
    DiscoveryPipeline::new(
        RegionSearchEngine::new(source, regions, settings),
        FilterEngine::new(&FilterRuleSet::default()).unwrap(),
        directory,
        HangulRomanizer,
        reporter,
        NameProximityMatch::new(1.0),
        counter,
    )
}

/// "Test Box" already listed about 0.6 km away, "CF 강남" new, and
/// "Gone Box" no longer found.
fn gangnam_scenario() -> (FakeSource, FakeDirectory) {
    let source = source_with(vec![
        place("p-1", "Test Box", 37.505, 127.003),
        place("p-2", "CF 강남", 37.498, 127.027),
    ]);
    let directory = FakeDirectory::with(vec![
        record(1, "Test Box", "test-box", 37.50, 127.00),
        record(2, "Gone Box", "gone-box", 37.60, 127.10),
    ]);
    (source, directory)
}

#[tokio::test]
async fn full_run_creates_skips_and_flags() {
    let (source, directory) = gangnam_scenario();
    let enrich_calls = Arc::clone(&source.enrich_calls);
    let reporter = FakeReporter::default();
    let pipeline = pipeline_with(seoul(), source, directory.clone(), reporter.clone());

    let result = pipeline
        .run(TriggerKind::Manual, RunOptions::default(), &CancellationToken::new())
        .await;

    assert_eq!(result.status, RunStatus::Succeeded);
    assert_eq!(result.stage, RunStage::Succeeded);
    assert!(result.errors.is_empty(), "{:?}", result.errors);
    assert!(result.finished_at.is_some());
    assert_eq!(result.stats.regions_configured, 1);
    assert_eq!(result.stats.raw_found, 2);
    assert_eq!(result.stats.final_count, 2);
    assert_eq!(result.stats.records_skipped, 1);
    assert_eq!(result.stats.records_created, 1);
    assert_eq!(result.stats.records_flagged_inactive, 1);
    assert_eq!(result.stats.enriched, 1);

    assert_eq!(*enrich_calls.lock().unwrap(), vec!["CF 강남".to_owned()]);

    let created = directory
        .records()
        .into_iter()
        .find(|r| r.display_name == "CF 강남")
        .expect("record created");
    assert_eq!(created.login, "cf-gangnam");
    assert_eq!(created.phone.as_deref(), Some("02-555-0100"));
    assert_eq!(created.address.as_deref(), Some("CF 강남 address"));

    let flagged: Vec<i64> = directory.candidates().iter().map(|(id, _)| *id).collect();
    assert_eq!(flagged, vec![2]);
    assert_eq!(directory.candidates()[0].1, result.started_at.date_naive());

    let reports = reporter.reports();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0], result);
}

#[tokio::test]
async fn rerun_does_not_flag_twice() {
    let (source, directory) = gangnam_scenario();
    let pipeline = pipeline_with(seoul(), source, directory.clone(), FakeReporter::default());
    let cancel = CancellationToken::new();

    pipeline.run(TriggerKind::Scheduled, RunOptions::default(), &cancel).await;
    let second = pipeline
        .run(TriggerKind::Scheduled, RunOptions::default(), &cancel)
        .await;

    assert_eq!(second.status, RunStatus::Succeeded);
    assert_eq!(second.stats.records_created, 0);
    assert_eq!(second.stats.records_skipped, 2);
    assert_eq!(second.stats.records_flagged_inactive, 0);
    assert_eq!(second.stats.records_already_flagged, 1);
    assert_eq!(directory.candidates().len(), 1);
    assert_eq!(directory.records().len(), 3);
}

#[tokio::test]
async fn same_gym_twice_in_one_batch_creates_one_record() {
    let mut second_listing = place("p-2", "New Box", 37.5101, 127.0501);
    second_listing.formatted_address = "New Box, 2nd floor".to_owned();
    let source = source_with(vec![place("p-1", "New Box", 37.51, 127.05), second_listing]);
    let directory = FakeDirectory::default();
    let pipeline = pipeline_with(seoul(), source, directory.clone(), FakeReporter::default());

    let result = pipeline
        .run(TriggerKind::Manual, RunOptions::default(), &CancellationToken::new())
        .await;

    assert_eq!(result.stats.final_count, 2);
    assert_eq!(result.stats.records_created, 1);
    assert_eq!(result.stats.records_skipped, 1);
    assert_eq!(directory.records().len(), 1);
}

#[tokio::test]
async fn unreachable_directory_fails_but_reports_partial_stats() {
    let (source, mut directory) = gangnam_scenario();
    directory.unreachable = true;
    let reporter = FakeReporter::default();
    let pipeline = pipeline_with(seoul(), source, directory.clone(), reporter.clone());

    let result = pipeline
        .run(TriggerKind::Manual, RunOptions::default(), &CancellationToken::new())
        .await;

    assert_eq!(result.status, RunStatus::Failed);
    assert_eq!(result.stage, RunStage::Failed);
    assert!(result.errors[0].starts_with("reconciling:"), "{:?}", result.errors);
    assert_eq!(result.stats.raw_found, 2);
    assert_eq!(result.stats.final_count, 2);
    assert_eq!(result.stats.records_created, 0);
    assert!(directory.candidates().is_empty());

    let reports = reporter.reports();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].status, RunStatus::Failed);
}

#[tokio::test]
async fn cancelled_run_writes_nothing() {
    let (source, directory) = gangnam_scenario();
    let pipeline = pipeline_with(seoul(), source, directory.clone(), FakeReporter::default());
    let cancel = CancellationToken::new();
    cancel.cancel();

    let result = pipeline
        .run(TriggerKind::Manual, RunOptions::default(), &cancel)
        .await;

    assert_eq!(result.status, RunStatus::Failed);
    assert!(result.errors[0].starts_with("searching:"), "{:?}", result.errors);
    assert!(result.errors[0].contains("cancelled"));
    assert_eq!(directory.records().len(), 2);
    assert!(directory.candidates().is_empty());
}

#[tokio::test]
async fn call_counter_is_reset_at_start() {
    let (source, directory) = gangnam_scenario();
    for _ in 0..5 {
        source.counter.record_call();
    }
    source.counter.record_failure();
    let pipeline = pipeline_with(seoul(), source, directory, FakeReporter::default());

    let result = pipeline
        .run(TriggerKind::Manual, RunOptions::default(), &CancellationToken::new())
        .await;

    assert_eq!(result.stats.api_calls, 1);
    assert_eq!(result.stats.api_failures, 0);
}

#[tokio::test]
async fn dry_run_stops_after_filtering() {
    let (source, directory) = gangnam_scenario();
    let enrich_calls = Arc::clone(&source.enrich_calls);
    let pipeline = pipeline_with(seoul(), source, directory.clone(), FakeReporter::default());
    let options = RunOptions {
        dry_run: true,
        ..RunOptions::default()
    };

    let result = pipeline
        .run(TriggerKind::Manual, options, &CancellationToken::new())
        .await;

    assert_eq!(result.status, RunStatus::Succeeded);
    assert_eq!(result.stats.final_count, 2);
    assert_eq!(result.stats.records_created, 0);
    assert_eq!(result.stats.records_flagged_inactive, 0);
    assert!(enrich_calls.lock().unwrap().is_empty());
    assert_eq!(directory.records().len(), 2);
    assert!(directory.candidates().is_empty());
}

#[tokio::test]
async fn disabled_enrichment_makes_no_detail_calls() {
    let (source, directory) = gangnam_scenario();
    let enrich_calls = Arc::clone(&source.enrich_calls);
    let pipeline = pipeline_with(seoul(), source, directory.clone(), FakeReporter::default());
    let options = RunOptions {
        enrich: false,
        ..RunOptions::default()
    };

    let result = pipeline
        .run(TriggerKind::Manual, options, &CancellationToken::new())
        .await;

    assert_eq!(result.stats.enriched, 0);
    assert_eq!(result.stats.records_created, 1);
    assert!(enrich_calls.lock().unwrap().is_empty());
    let created = directory
        .records()
        .into_iter()
        .find(|r| r.display_name == "CF 강남")
        .expect("record created");
    assert!(created.phone.is_none());
}

#[tokio::test]
async fn reporter_failure_keeps_status() {
    let (source, directory) = gangnam_scenario();
    let reporter = FakeReporter {
        fail: true,
        ..FakeReporter::default()
    };
    let pipeline = pipeline_with(seoul(), source, directory, reporter);

    let result = pipeline
        .run(TriggerKind::Manual, RunOptions::default(), &CancellationToken::new())
        .await;

    assert_eq!(result.status, RunStatus::Succeeded);
    assert_eq!(result.errors.len(), 1);
    assert!(result.errors[0].starts_with("report:"));
}

#[tokio::test]
async fn empty_region_config_fails_fast() {
    let (source, directory) = gangnam_scenario();
    let pipeline = pipeline_with(RegionsFile::default(), source, directory, FakeReporter::default());

    let result = pipeline
        .run(TriggerKind::Manual, RunOptions::default(), &CancellationToken::new())
        .await;

    assert_eq!(result.status, RunStatus::Failed);
    assert_eq!(result.errors, vec!["started: no regions configured".to_owned()]);
    assert_eq!(result.stats.api_calls, 0);
    assert_eq!(result.stats.raw_found, 0);
}

#[tokio::test]
async fn one_failed_create_does_not_fail_the_run() {
    let (source, mut directory) = gangnam_scenario();
    directory.reject_name = Some("CF 강남".to_owned());
    let pipeline = pipeline_with(seoul(), source, directory.clone(), FakeReporter::default());

    let result = pipeline
        .run(TriggerKind::Manual, RunOptions::default(), &CancellationToken::new())
        .await;

    assert_eq!(result.status, RunStatus::Succeeded);
    assert_eq!(result.stats.records_failed, 1);
    assert_eq!(result.stats.records_created, 0);
    assert_eq!(result.stats.records_flagged_inactive, 1);
}

#[tokio::test]
async fn empty_search_flags_every_existing_record() {
    let directory = FakeDirectory::with(vec![
        record(1, "Test Box", "test-box", 37.50, 127.00),
        record(2, "Gone Box", "gone-box", 37.60, 127.10),
    ]);
    let pipeline = pipeline_with(
        seoul(),
        source_with(Vec::new()),
        directory.clone(),
        FakeReporter::default(),
    );

    let result = pipeline
        .run(TriggerKind::Scheduled, RunOptions::default(), &CancellationToken::new())
        .await;

    assert_eq!(result.status, RunStatus::Succeeded);
    assert_eq!(
        result.stats,
        RunStats {
            regions_configured: 1,
            api_calls: 1,
            records_flagged_inactive: 2,
            ..RunStats::default()
        }
    );
    assert_eq!(directory.candidates().len(), 2);
}

#[tokio::test]
async fn candidate_opened_by_another_writer_is_not_counted() {
    let (source, mut directory) = gangnam_scenario();
    directory.stale_candidate_reads = true;
    let earlier = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
    directory.candidates.lock().unwrap().push((2, earlier));
    let pipeline = pipeline_with(seoul(), source, directory.clone(), FakeReporter::default());

    let result = pipeline
        .run(TriggerKind::Scheduled, RunOptions::default(), &CancellationToken::new())
        .await;

    assert_eq!(result.status, RunStatus::Succeeded);
    assert_eq!(result.stats.records_flagged_inactive, 0);
    assert_eq!(result.stats.records_already_flagged, 1);
    assert_eq!(directory.candidates(), vec![(2, earlier)]);
}

#[tokio::test]
async fn directory_fault_is_reported_as_reconciling_without_enrichment() {
    let (source, mut directory) = gangnam_scenario();
    directory.unreachable = true;
    let enrich_calls = Arc::clone(&source.enrich_calls);
    let pipeline = pipeline_with(seoul(), source, directory, FakeReporter::default());
    let options = RunOptions {
        enrich: false,
        ..RunOptions::default()
    };

    let result = pipeline
        .run(TriggerKind::Manual, options, &CancellationToken::new())
        .await;

    assert_eq!(result.status, RunStatus::Failed);
    assert_eq!(
        result.errors,
        vec!["reconciling: directory unavailable: directory backend error: connection refused"
            .to_owned()]
    );
    assert!(enrich_calls.lock().unwrap().is_empty());
}
