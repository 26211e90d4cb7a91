//! Central application state.
//!
//! `AppState` owns the readiness gate, the content cache, the in-flight
//! coordinator and the detector adapter, and implements the request flow:
//!
//! ```text
//! image -> gate -> fingerprint -> cache ─hit─> respond
//!                                   │
//!                                  miss
//!                                   ▼
//!                        in-flight coordinator
//!                       leader │        │ follower
//!                              ▼        ▼
//!            cache re-check, detect   wait for leader
//!            cache put, resolve
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use tokio::task::JoinHandle;

use common::backend::AppStateProvider;
use common::{
    AuditOutcome, AuditRecord, FeatureResult, ImageFingerprint, ProcessError, ProcessOutcome,
    ProcessResult, ReadinessState, ResultSource, ServiceStats,
};
use feature_detector::DetectorAdapter;
use storage::FeatureStore;

use crate::audit::AuditLog;
use crate::cache::ContentCache;
use crate::inflight::{Claim, InFlightCoordinator, LeaderTicket, SharedOutcome};
use crate::readiness::{spawn_warmup, ReadinessGate};

/// Endpoint name written to the request log.
pub const PROCESS_ENDPOINT: &str = "/process-image";

/// Configuration for AppState initialization.
#[derive(Debug, Clone)]
pub struct AppStateConfig {
    /// How long a follower waits for another request's computation
    pub follower_timeout: Duration,
}

impl Default for AppStateConfig {
    fn default() -> Self {
        Self {
            follower_timeout: Duration::from_secs(120),
        }
    }
}

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    joined: AtomicU64,
    failures: AtomicU64,
}

/// Central application state.
///
/// Cheap to clone; every component is shared.
#[derive(Clone)]
pub struct AppState {
    gate: Arc<ReadinessGate>,
    cache: Arc<ContentCache>,
    inflight: Arc<InFlightCoordinator>,
    detector: Arc<DetectorAdapter>,
    audit: Arc<AuditLog>,
    counters: Arc<Counters>,
    config: AppStateConfig,
}

impl AppState {
    /// Must be called inside a Tokio runtime; the request log writer is
    /// spawned here.
    pub fn new(
        store: Arc<dyn FeatureStore>,
        detector: Arc<DetectorAdapter>,
        config: AppStateConfig,
    ) -> Self {
        tracing::info!(
            store = store.backend_name(),
            detector = detector.detector_name(),
            follower_timeout_secs = config.follower_timeout.as_secs(),
            "Initializing AppState"
        );
        Self {
            gate: Arc::new(ReadinessGate::new()),
            audit: Arc::new(AuditLog::spawn(&store)),
            cache: Arc::new(ContentCache::new(store)),
            inflight: Arc::new(InFlightCoordinator::new()),
            detector,
            counters: Arc::new(Counters::default()),
            config,
        }
    }

    pub fn gate(&self) -> &ReadinessGate {
        &self.gate
    }

    pub fn detector(&self) -> &DetectorAdapter {
        &self.detector
    }

    /// Fingerprints with a computation currently running
    pub fn in_flight(&self) -> usize {
        self.inflight.in_flight()
    }

    /// Wait for queued request log records to reach the store.
    pub async fn flush_audit(&self) {
        self.audit.flush().await;
    }

    /// Start the one-time detector warm-up in the background.
    pub fn start_warmup(&self) -> JoinHandle<()> {
        spawn_warmup(Arc::clone(&self.detector), Arc::clone(&self.gate))
    }

    /// Handle one image request end to end.
    pub async fn process(&self, image: Option<Bytes>) -> ProcessResult<ProcessOutcome> {
        let started = Instant::now();

        let status = self.gate.status();
        if !status.is_ready() {
            tracing::debug!(status = %status, "Rejecting image while not ready");
            self.log_request(None, AuditOutcome::Rejected, started);
            return Err(ProcessError::NotReady(status));
        }

        let image = match image {
            Some(bytes) if !bytes.is_empty() => bytes,
            _ => {
                self.log_request(None, AuditOutcome::Rejected, started);
                return Err(ProcessError::BadInput("No image file provided".to_string()));
            }
        };

        let fingerprint = ImageFingerprint::of(&image);

        if let Some(result) = self.cache.get(&fingerprint).await {
            tracing::debug!(fingerprint = %fingerprint, "Cache hit");
            return self
                .finish(fingerprint, Ok(result), ResultSource::Cache, started)
                .await;
        }

        let (outcome, source) = match self.inflight.claim(&fingerprint) {
            Claim::Leader(ticket) => self.lead(ticket, image).await,
            Claim::Follower(subscription) => {
                tracing::debug!(fingerprint = %fingerprint, "Joining in-flight computation");
                let outcome = subscription.wait(self.config.follower_timeout).await;
                (outcome, ResultSource::InFlight)
            }
        };

        self.finish(fingerprint, outcome, source, started).await
    }

    /// Run the leader's work on its own task so that a disconnecting client
    /// does not strand the followers or skip the cache write.
    async fn lead(&self, ticket: LeaderTicket, image: Bytes) -> (SharedOutcome, ResultSource) {
        let cache = Arc::clone(&self.cache);
        let detector = Arc::clone(&self.detector);

        let task = tokio::spawn(compute(cache, detector, ticket, image));
        match task.await {
            Ok(done) => done,
            Err(e) => (
                Err(ProcessError::DetectionFailure(format!("detection task failed: {}", e))),
                ResultSource::Computed,
            ),
        }
    }

    async fn finish(
        &self,
        fingerprint: ImageFingerprint,
        outcome: SharedOutcome,
        source: ResultSource,
        started: Instant,
    ) -> ProcessResult<ProcessOutcome> {
        match outcome {
            Ok(result) => {
                let (counter, audit) = match source {
                    ResultSource::Cache => (&self.counters.hits, AuditOutcome::Hit),
                    ResultSource::Computed => (&self.counters.misses, AuditOutcome::Miss),
                    ResultSource::InFlight => (&self.counters.joined, AuditOutcome::Joined),
                };
                counter.fetch_add(1, Ordering::Relaxed);
                self.log_request(Some(fingerprint), audit, started);
                Ok(ProcessOutcome { result, source })
            }
            Err(e) => {
                self.counters.failures.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(fingerprint = %fingerprint, error = %e, "Image processing failed");
                self.log_request(Some(fingerprint), AuditOutcome::Error, started);
                Err(e)
            }
        }
    }

    /// Queue a request log record; the response does not wait for it.
    fn log_request(
        &self,
        fingerprint: Option<ImageFingerprint>,
        outcome: AuditOutcome,
        started: Instant,
    ) {
        let record = AuditRecord::new(PROCESS_ENDPOINT, fingerprint, outcome, started.elapsed());
        self.audit.record(record);
    }
}

/// Leader body: re-check the cache, detect, store, then resolve.
async fn compute(
    cache: Arc<ContentCache>,
    detector: Arc<DetectorAdapter>,
    ticket: LeaderTicket,
    image: Bytes,
) -> (SharedOutcome, ResultSource) {
    let fingerprint = ticket.fingerprint().clone();

    // Another leader may have stored and retired between our miss and claim.
    if let Some(result) = cache.get(&fingerprint).await {
        ticket.resolve(Ok(Arc::clone(&result)));
        return (Ok(result), ResultSource::Cache);
    }

    let started = Instant::now();
    let outcome = match detector.detect(image).await {
        Ok(features) => {
            let result = Arc::new(FeatureResult::new(
                fingerprint.clone(),
                features,
                Utc::now(),
                started.elapsed(),
            ));
            tracing::info!(
                fingerprint = %fingerprint,
                keypoints = result.keypoints,
                duration_ms = result.duration_ms,
                "Features computed"
            );
            cache.put(&result).await;
            Ok(result)
        }
        Err(e) => Err(ProcessError::from(e)),
    };

    ticket.resolve(outcome.clone());
    (outcome, ResultSource::Computed)
}

#[async_trait]
impl AppStateProvider for AppState {
    fn readiness(&self) -> ReadinessState {
        self.gate.status()
    }

    async fn process_image(&self, image: Option<Bytes>) -> ProcessResult<ProcessOutcome> {
        self.process(image).await
    }

    fn stats(&self) -> ServiceStats {
        ServiceStats {
            status: self.gate.status(),
            cache_hits: self.counters.hits.load(Ordering::Relaxed),
            cache_misses: self.counters.misses.load(Ordering::Relaxed),
            joined: self.counters.joined.load(Ordering::Relaxed),
            failures: self.counters.failures.load(Ordering::Relaxed),
            detector_invocations: self.detector.invocations(),
        }
    }
}
