//! Request-path tests for AppState against a scripted detector

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use appstate::{AppState, AppStateConfig};
use bytes::Bytes;
use chrono::Utc;
use common::backend::AppStateProvider;
use common::{
    AuditOutcome, AuditRecord, CacheEntry, DetectedFeatures, FeatureResult, ImageFingerprint,
    ProcessError, ReadinessState, ResultSource,
};
use feature_detector::{DetectorAdapter, MockDetector};
use parking_lot::Mutex;
use storage::{
    FeatureStore, InMemoryFeatureStore, MdbxFeatureStore, PutOutcome, StorageError, StorageResult,
};

const CAT: &[u8] = b"cat.jpg: pretend jpeg bytes";
const DOG: &[u8] = b"dog.jpeg: other pretend bytes";

struct Harness {
    state: AppState,
    mock: Arc<MockDetector>,
    store: Arc<InMemoryFeatureStore>,
}

fn harness(mock: MockDetector, config: AppStateConfig) -> Harness {
    let mock = Arc::new(mock);
    let store = Arc::new(InMemoryFeatureStore::new());
    let state = AppState::new(
        store.clone(),
        Arc::new(DetectorAdapter::new(mock.clone())),
        config,
    );
    Harness { state, mock, store }
}

async fn ready(mock: MockDetector) -> Harness {
    let h = harness(mock, AppStateConfig::default());
    h.state.start_warmup().await.expect("warm-up task panicked");
    assert_eq!(h.state.readiness(), ReadinessState::Ready);
    h
}

fn image(bytes: &'static [u8]) -> Option<Bytes> {
    Some(Bytes::from_static(bytes))
}

/// Store whose every operation fails.
struct BrokenStore;

impl FeatureStore for BrokenStore {
    fn get(&self, _: &ImageFingerprint) -> StorageResult<Option<CacheEntry>> {
        Err(StorageError::Unavailable("disk on fire".into()))
    }
    fn put(&self, _: &CacheEntry) -> StorageResult<PutOutcome> {
        Err(StorageError::Unavailable("disk on fire".into()))
    }
    fn log(&self, _: &AuditRecord) -> StorageResult<()> {
        Err(StorageError::Unavailable("disk on fire".into()))
    }
    fn recent_logs(&self, _: usize) -> StorageResult<Vec<AuditRecord>> {
        Err(StorageError::Unavailable("disk on fire".into()))
    }
    fn backend_name(&self) -> &'static str {
        "broken"
    }
}

/// Misses the first lookup of each fingerprint, as if another leader stored
/// the result between that lookup and this request's claim.
struct LateArrivalStore {
    inner: InMemoryFeatureStore,
    looked_up: Mutex<HashSet<ImageFingerprint>>,
}

impl FeatureStore for LateArrivalStore {
    fn get(&self, fingerprint: &ImageFingerprint) -> StorageResult<Option<CacheEntry>> {
        if self.looked_up.lock().insert(fingerprint.clone()) {
            return Ok(None);
        }
        self.inner.get(fingerprint)
    }
    fn put(&self, entry: &CacheEntry) -> StorageResult<PutOutcome> {
        self.inner.put(entry)
    }
    fn log(&self, record: &AuditRecord) -> StorageResult<()> {
        self.inner.log(record)
    }
    fn recent_logs(&self, limit: usize) -> StorageResult<Vec<AuditRecord>> {
        self.inner.recent_logs(limit)
    }
    fn backend_name(&self) -> &'static str {
        "late-arrival"
    }
}

/// Request log writes take a long time; everything else is in memory.
struct SlowLogStore {
    inner: InMemoryFeatureStore,
    log_delay: Duration,
}

impl FeatureStore for SlowLogStore {
    fn get(&self, fingerprint: &ImageFingerprint) -> StorageResult<Option<CacheEntry>> {
        self.inner.get(fingerprint)
    }
    fn put(&self, entry: &CacheEntry) -> StorageResult<PutOutcome> {
        self.inner.put(entry)
    }
    fn log(&self, record: &AuditRecord) -> StorageResult<()> {
        std::thread::sleep(self.log_delay);
        self.inner.log(record)
    }
    fn recent_logs(&self, limit: usize) -> StorageResult<Vec<AuditRecord>> {
        self.inner.recent_logs(limit)
    }
    fn backend_name(&self) -> &'static str {
        "slow-log"
    }
}

#[tokio::test]
async fn test_requests_rejected_while_warming_up() {
    let h = harness(
        MockDetector::new().with_warmup_delay(Duration::from_millis(200)),
        AppStateConfig::default(),
    );
    let warmup = h.state.start_warmup();

    let err = h.state.process(image(CAT)).await.unwrap_err();
    assert_eq!(err, ProcessError::NotReady(ReadinessState::WarmingUp));

    // Readiness is checked before the payload.
    let err = h.state.process(None).await.unwrap_err();
    assert_eq!(err, ProcessError::NotReady(ReadinessState::WarmingUp));
    assert_eq!(h.mock.calls(), 0);

    warmup.await.unwrap();
    assert!(h.state.process(image(CAT)).await.is_ok());
}

#[tokio::test]
async fn test_failed_warmup_is_terminal() {
    let h = harness(MockDetector::new().with_failing_warmup(), AppStateConfig::default());
    h.state.start_warmup().await.unwrap();

    assert_eq!(h.state.readiness(), ReadinessState::Failed);
    let err = h.state.process(image(CAT)).await.unwrap_err();
    assert_eq!(err, ProcessError::NotReady(ReadinessState::Failed));
    assert_eq!(h.mock.calls(), 0);
}

#[tokio::test]
async fn test_missing_or_empty_image_is_bad_input() {
    let h = ready(MockDetector::new()).await;

    assert!(matches!(
        h.state.process(None).await,
        Err(ProcessError::BadInput(_))
    ));
    assert!(matches!(
        h.state.process(Some(Bytes::new())).await,
        Err(ProcessError::BadInput(_))
    ));
    assert_eq!(h.mock.calls(), 0);
}

#[tokio::test]
async fn test_cat_then_cat_then_dog() {
    let h = ready(MockDetector::new()).await;

    let first = h.state.process(image(CAT)).await.unwrap();
    assert_eq!(first.source, ResultSource::Computed);
    assert_eq!(h.mock.calls(), 1);

    let second = h.state.process(image(CAT)).await.unwrap();
    assert_eq!(second.source, ResultSource::Cache);
    assert_eq!(*second.result, *first.result);
    assert_eq!(h.mock.calls(), 1);

    let dog = h.state.process(image(DOG)).await.unwrap();
    assert_eq!(dog.source, ResultSource::Computed);
    assert_ne!(dog.result.fingerprint, first.result.fingerprint);
    assert_ne!(dog.result.keypoints, first.result.keypoints);
    assert_eq!(h.mock.calls(), 2);

    let stats = h.state.stats();
    assert_eq!(stats.cache_hits, 1);
    assert_eq!(stats.cache_misses, 2);
    assert_eq!(stats.detector_invocations, 2);
    assert_eq!(stats.failures, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_identical_requests_run_detector_once() {
    let h = ready(MockDetector::new().with_delay(Duration::from_millis(200))).await;

    let requests: Vec<_> = (0..12)
        .map(|_| {
            let state = h.state.clone();
            tokio::spawn(async move { state.process(image(CAT)).await })
        })
        .collect();

    let outcomes: Vec<_> = futures::future::join_all(requests)
        .await
        .into_iter()
        .map(|joined| joined.unwrap().unwrap())
        .collect();

    assert_eq!(h.mock.calls(), 1);
    let computed = outcomes
        .iter()
        .filter(|o| o.source == ResultSource::Computed)
        .count();
    assert_eq!(computed, 1);
    for outcome in &outcomes {
        assert_eq!(*outcome.result, *outcomes[0].result);
    }
    assert_eq!(h.state.in_flight(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_failure_for_one_image_does_not_affect_another() {
    let h = ready(
        MockDetector::new()
            .with_delay(Duration::from_millis(100))
            .failing_on(DOG),
    )
    .await;

    let (dog, cat) = tokio::join!(h.state.process(image(DOG)), h.state.process(image(CAT)));

    assert!(matches!(dog, Err(ProcessError::DetectionFailure(_))));
    let cat = cat.unwrap();
    assert_eq!(cat.result.fingerprint, ImageFingerprint::of(CAT));
    assert_eq!(h.state.stats().failures, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_followers_share_leader_failure_and_retry_is_fresh() {
    let h = ready(
        MockDetector::new()
            .with_delay(Duration::from_millis(150))
            .failing_on(CAT),
    )
    .await;

    let results = futures::future::join_all((0..5).map(|_| h.state.process(image(CAT)))).await;
    assert_eq!(h.mock.calls(), 1);
    for result in results {
        assert!(matches!(result, Err(ProcessError::DetectionFailure(_))));
    }

    // Failures are not cached.
    let _ = h.state.process(image(CAT)).await;
    assert_eq!(h.mock.calls(), 2);
}

#[tokio::test]
async fn test_undecodable_image_is_bad_input_and_not_cached() {
    let h = ready(MockDetector::new().rejecting(DOG)).await;

    let err = h.state.process(image(DOG)).await.unwrap_err();
    assert!(matches!(err, ProcessError::BadInput(_)));
    assert!(h.store.is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_follower_times_out_without_disturbing_leader() {
    let h = harness(
        MockDetector::new().with_delay(Duration::from_millis(400)),
        AppStateConfig {
            follower_timeout: Duration::from_millis(50),
        },
    );
    h.state.start_warmup().await.unwrap();

    let leader_state = h.state.clone();
    let leader = tokio::spawn(async move { leader_state.process(image(CAT)).await });
    tokio::time::sleep(Duration::from_millis(50)).await;

    let err = h.state.process(image(CAT)).await.unwrap_err();
    assert_eq!(err, ProcessError::Timeout);

    let led = leader.await.unwrap().unwrap();
    assert_eq!(led.source, ResultSource::Computed);
    assert_eq!(h.mock.calls(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_cancelled_leader_still_populates_cache() {
    let h = ready(MockDetector::new().with_delay(Duration::from_millis(150))).await;

    let leader_state = h.state.clone();
    let leader = tokio::spawn(async move { leader_state.process(image(CAT)).await });
    tokio::time::sleep(Duration::from_millis(30)).await;
    leader.abort();

    tokio::time::sleep(Duration::from_millis(300)).await;
    let again = h.state.process(image(CAT)).await.unwrap();
    assert_eq!(again.source, ResultSource::Cache);
    assert_eq!(h.mock.calls(), 1);
}

#[tokio::test]
async fn test_store_failures_fail_open() {
    let mock = Arc::new(MockDetector::new());
    let state = AppState::new(
        Arc::new(BrokenStore),
        Arc::new(DetectorAdapter::new(mock.clone())),
        AppStateConfig::default(),
    );
    state.start_warmup().await.unwrap();

    let first = state.process(image(CAT)).await.unwrap();
    assert_eq!(first.source, ResultSource::Computed);

    // Nothing was persisted, so the detector runs again.
    let second = state.process(image(CAT)).await.unwrap();
    assert_eq!(second.source, ResultSource::Computed);
    assert_eq!(mock.calls(), 2);
}

#[tokio::test]
async fn test_audit_log_records_outcomes() {
    let h = ready(MockDetector::new().failing_on(DOG)).await;

    let _ = h.state.process(None).await;
    let _ = h.state.process(image(CAT)).await;
    let _ = h.state.process(image(CAT)).await;
    let _ = h.state.process(image(DOG)).await;
    h.state.flush_audit().await;

    let log = h.store.recent_logs(10).unwrap();
    let outcomes: Vec<_> = log.iter().map(|r| r.outcome).collect();
    assert_eq!(
        outcomes,
        vec![
            AuditOutcome::Rejected,
            AuditOutcome::Miss,
            AuditOutcome::Hit,
            AuditOutcome::Error,
        ]
    );
    assert!(log[0].fingerprint.is_none());
    assert_eq!(log[1].fingerprint, Some(ImageFingerprint::of(CAT)));
    assert!(log.iter().all(|r| r.endpoint == appstate::PROCESS_ENDPOINT));
}

#[tokio::test]
async fn test_results_survive_restart_with_durable_store() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("db");

    let computed = {
        let store = Arc::new(MdbxFeatureStore::open(&path).unwrap());
        let state = AppState::new(
            store,
            Arc::new(DetectorAdapter::new(Arc::new(MockDetector::new()))),
            AppStateConfig::default(),
        );
        state.start_warmup().await.unwrap();
        let computed = state.process(image(CAT)).await.unwrap();
        state.flush_audit().await;
        computed
    };

    let mock = Arc::new(MockDetector::new());
    let store = Arc::new(MdbxFeatureStore::open(&path).unwrap());
    let state = AppState::new(
        store,
        Arc::new(DetectorAdapter::new(mock.clone())),
        AppStateConfig::default(),
    );
    state.start_warmup().await.unwrap();

    let restored = state.process(image(CAT)).await.unwrap();
    assert_eq!(restored.source, ResultSource::Cache);
    assert_eq!(*restored.result, *computed.result);
    assert_eq!(mock.calls(), 0);
}

#[tokio::test]
async fn test_leader_rechecks_cache_before_detecting() {
    let fingerprint = ImageFingerprint::of(CAT);
    let features = DetectedFeatures {
        width: 4,
        height: 4,
        keypoints: 7,
        descriptors: [7, 64],
    };
    let stored = FeatureResult::new(fingerprint.clone(), features, Utc::now(), Duration::ZERO);

    let store = Arc::new(LateArrivalStore {
        inner: InMemoryFeatureStore::new(),
        looked_up: Mutex::new(HashSet::new()),
    });
    store.put(&CacheEntry::new(stored.clone())).unwrap();

    let mock = Arc::new(MockDetector::new());
    let state = AppState::new(
        store,
        Arc::new(DetectorAdapter::new(mock.clone())),
        AppStateConfig::default(),
    );
    state.start_warmup().await.unwrap();

    let outcome = state.process(image(CAT)).await.unwrap();
    assert_eq!(outcome.source, ResultSource::Cache);
    assert_eq!(*outcome.result, stored);
    assert_eq!(mock.calls(), 0);
    assert_eq!(state.in_flight(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_response_does_not_wait_for_request_log() {
    let log_delay = Duration::from_millis(400);
    let memory_log = Arc::new(SlowLogStore {
        inner: InMemoryFeatureStore::new(),
        log_delay,
    });
    let state = AppState::new(
        memory_log.clone(),
        Arc::new(DetectorAdapter::new(Arc::new(MockDetector::new()))),
        AppStateConfig::default(),
    );
    state.start_warmup().await.unwrap();

    let started = Instant::now();
    state.process(image(CAT)).await.unwrap();
    let hit = state.process(image(CAT)).await.unwrap();
    assert_eq!(hit.source, ResultSource::Cache);
    assert!(
        started.elapsed() < log_delay,
        "two requests took {:?}",
        started.elapsed()
    );

    state.flush_audit().await;
    let outcomes: Vec<_> = memory_log
        .recent_logs(10)
        .unwrap()
        .iter()
        .map(|r| r.outcome)
        .collect();
    assert_eq!(outcomes, vec![AuditOutcome::Miss, AuditOutcome::Hit]);
}
