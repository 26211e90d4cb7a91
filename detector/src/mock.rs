//! Scripted detector for tests.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use common::DetectedFeatures;

use crate::error::{DetectorError, DetectorResult};
use crate::traits::FeatureDetector;

/// A detector whose behaviour is fixed up front.
///
/// Results are derived from the payload bytes, so distinct payloads give
/// distinct features and identical payloads give identical features.
pub struct MockDetector {
    delay: Duration,
    warmup_delay: Duration,
    fail_warmup: bool,
    concurrent_safe: bool,
    failing: HashSet<Vec<u8>>,
    undecodable: HashSet<Vec<u8>>,
    calls: AtomicUsize,
    active: AtomicUsize,
    peak: AtomicUsize,
}

impl Default for MockDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl MockDetector {
    pub fn new() -> Self {
        Self {
            delay: Duration::ZERO,
            warmup_delay: Duration::ZERO,
            fail_warmup: false,
            concurrent_safe: true,
            failing: HashSet::new(),
            undecodable: HashSet::new(),
            calls: AtomicUsize::new(0),
            active: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    /// Sleep this long inside every `detect`
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_warmup_delay(mut self, delay: Duration) -> Self {
        self.warmup_delay = delay;
        self
    }

    pub fn with_failing_warmup(mut self) -> Self {
        self.fail_warmup = true;
        self
    }

    /// `detect` fails with `DetectorError::Failed` for this payload
    pub fn failing_on(mut self, payload: impl Into<Vec<u8>>) -> Self {
        self.failing.insert(payload.into());
        self
    }

    /// `detect` fails with `DetectorError::InvalidImage` for this payload
    pub fn rejecting(mut self, payload: impl Into<Vec<u8>>) -> Self {
        self.undecodable.insert(payload.into());
        self
    }

    pub fn not_concurrent_safe(mut self) -> Self {
        self.concurrent_safe = false;
        self
    }

    /// Number of `detect` calls so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Highest number of `detect` calls observed running at once
    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    /// Features the mock reports for `payload`.
    pub fn features_for(payload: &[u8]) -> DetectedFeatures {
        let checksum = payload
            .iter()
            .fold(17u32, |acc, b| acc.wrapping_mul(31).wrapping_add(*b as u32));
        let keypoints = payload.len();
        DetectedFeatures {
            width: 100 + checksum % 1000,
            height: 100 + (checksum / 1000) % 1000,
            keypoints,
            descriptors: [keypoints, 128],
        }
    }
}

impl FeatureDetector for MockDetector {
    fn warmup(&self) -> DetectorResult<()> {
        std::thread::sleep(self.warmup_delay);
        if self.fail_warmup {
            return Err(DetectorError::Warmup("scripted warm-up failure".into()));
        }
        Ok(())
    }

    fn detect(&self, image: &[u8]) -> DetectorResult<DetectedFeatures> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now_active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now_active, Ordering::SeqCst);

        std::thread::sleep(self.delay);
        let result = if self.failing.contains(image) {
            Err(DetectorError::Failed("scripted detection failure".into()))
        } else if self.undecodable.contains(image) {
            Err(DetectorError::InvalidImage("scripted undecodable image".into()))
        } else {
            Ok(Self::features_for(image))
        };

        self.active.fetch_sub(1, Ordering::SeqCst);
        result
    }

    fn concurrent_safe(&self) -> bool {
        self.concurrent_safe
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}
