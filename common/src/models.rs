//! Data model for detection results, cache entries and the request audit log.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{ImageFingerprint, ReadinessState};

/// Raw output of a detector run, before it is tied to a fingerprint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectedFeatures {
    /// Decoded image width in pixels
    pub width: u32,
    /// Decoded image height in pixels
    pub height: u32,
    /// Number of keypoints found
    pub keypoints: usize,
    /// Shape of the descriptor matrix as `[rows, cols]`
    pub descriptors: [usize; 2],
}

/// Detector output for one image plus computation metadata.
///
/// Immutable once created. Shared as `Arc<FeatureResult>` between the cache
/// and every waiter of an in-flight computation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureResult {
    pub fingerprint: ImageFingerprint,
    pub width: u32,
    pub height: u32,
    pub keypoints: usize,
    pub descriptors: [usize; 2],
    /// When the detector finished
    pub computed_at: DateTime<Utc>,
    /// Wall time spent in the detector
    pub duration_ms: u64,
}

impl FeatureResult {
    pub fn new(
        fingerprint: ImageFingerprint,
        features: DetectedFeatures,
        computed_at: DateTime<Utc>,
        duration: Duration,
    ) -> Self {
        Self {
            fingerprint,
            width: features.width,
            height: features.height,
            keypoints: features.keypoints,
            descriptors: features.descriptors,
            computed_at,
            duration_ms: duration.as_millis() as u64,
        }
    }
}

/// Persisted `(fingerprint, result, created_at)` row.
///
/// Written once per fingerprint, never mutated, never deleted by the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub fingerprint: ImageFingerprint,
    pub result: FeatureResult,
    pub created_at: DateTime<Utc>,
}

impl CacheEntry {
    pub fn new(result: FeatureResult) -> Self {
        Self {
            fingerprint: result.fingerprint.clone(),
            result,
            created_at: Utc::now(),
        }
    }
}

/// Outcome recorded in the request audit log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditOutcome {
    /// Served from the content cache
    Hit,
    /// Computed by the detector
    Miss,
    /// Received the result of another request's in-flight computation
    Joined,
    /// Detection failed or timed out
    Error,
    /// Refused before fingerprinting (not ready, missing image)
    Rejected,
}

impl AuditOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hit => "hit",
            Self::Miss => "miss",
            Self::Joined => "joined",
            Self::Error => "error",
            Self::Rejected => "rejected",
        }
    }
}

/// One append-only request log record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<ImageFingerprint>,
    pub endpoint: String,
    pub outcome: AuditOutcome,
    pub duration_ms: u64,
}

impl AuditRecord {
    /// Create a record stamped with the current time
    pub fn new(
        endpoint: impl Into<String>,
        fingerprint: Option<ImageFingerprint>,
        outcome: AuditOutcome,
        duration: Duration,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            fingerprint,
            endpoint: endpoint.into(),
            outcome,
            duration_ms: duration.as_millis() as u64,
        }
    }
}

/// Where a successful response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultSource {
    /// Content cache hit
    Cache,
    /// This request led the detector run
    Computed,
    /// This request joined another request's detector run
    InFlight,
}

/// Successful result of `process_image`.
#[derive(Debug, Clone)]
pub struct ProcessOutcome {
    pub result: Arc<FeatureResult>,
    pub source: ResultSource,
}

/// Process-local counters exposed by `/stats`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceStats {
    pub status: ReadinessState,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub joined: u64,
    pub failures: u64,
    pub detector_invocations: u64,
}
