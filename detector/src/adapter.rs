//! Async facade over a blocking [`FeatureDetector`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use parking_lot::Mutex;

use common::DetectedFeatures;

use crate::error::{DetectorError, DetectorResult};
use crate::traits::FeatureDetector;

/// Sole owner of the detector instance.
///
/// Every call runs on tokio's blocking pool. Detectors that are not
/// `concurrent_safe` additionally share one lock, so the coordinator's
/// per-fingerprint serialization is backed by global serialization where
/// the detector needs it.
pub struct DetectorAdapter {
    detector: Arc<dyn FeatureDetector>,
    exclusive: Arc<Mutex<()>>,
    invocations: AtomicU64,
}

impl DetectorAdapter {
    pub fn new(detector: Arc<dyn FeatureDetector>) -> Self {
        tracing::debug!(
            detector = detector.name(),
            concurrent_safe = detector.concurrent_safe(),
            "Detector adapter created"
        );
        Self {
            detector,
            exclusive: Arc::new(Mutex::new(())),
            invocations: AtomicU64::new(0),
        }
    }

    pub fn detector_name(&self) -> &'static str {
        self.detector.name()
    }

    /// Number of `detect` calls issued so far.
    pub fn invocations(&self) -> u64 {
        self.invocations.load(Ordering::Acquire)
    }

    pub async fn warmup(&self) -> DetectorResult<()> {
        let started = Instant::now();
        self.run_blocking(|detector| detector.warmup()).await?;
        tracing::info!(
            detector = self.detector.name(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Detector warm-up complete"
        );
        Ok(())
    }

    pub async fn detect(&self, image: Bytes) -> DetectorResult<DetectedFeatures> {
        self.invocations.fetch_add(1, Ordering::AcqRel);
        self.run_blocking(move |detector| detector.detect(&image)).await
    }

    async fn run_blocking<T, F>(&self, call: F) -> DetectorResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&dyn FeatureDetector) -> DetectorResult<T> + Send + 'static,
    {
        let detector = Arc::clone(&self.detector);
        let exclusive = (!detector.concurrent_safe()).then(|| Arc::clone(&self.exclusive));

        tokio::task::spawn_blocking(move || {
            let _guard = exclusive.as_ref().map(|lock| lock.lock());
            call(detector.as_ref())
        })
        .await
        .map_err(|e| DetectorError::Aborted(e.to_string()))?
    }
}
