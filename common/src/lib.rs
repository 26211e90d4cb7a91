//! Common types shared across the feature cache crates.
//!
//! This crate provides the foundational types used by every other crate in
//! the workspace (storage, feature-detector, appstate, api, server).
//!
//! # Architecture
//!
//! The `common` crate sits at the bottom of the dependency hierarchy:
//! - Has NO dependencies on other workspace crates
//! - Defines the content fingerprint used as the sole cache key
//! - Defines the request-level error taxonomy and the backend trait that
//!   the HTTP layer talks to

pub mod backend;
pub mod errors;
pub mod models;
pub mod platform;

pub use backend::AppStateProvider;
pub use errors::{ProcessError, ProcessResult};
pub use models::{
    AuditOutcome, AuditRecord, CacheEntry, DetectedFeatures, FeatureResult, ProcessOutcome,
    ResultSource, ServiceStats,
};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Length of a hex-encoded SHA-256 digest.
const FINGERPRINT_HEX_LEN: usize = 64;

/// Content-derived identifier for an image.
///
/// Computed as the lowercase hex SHA-256 digest of the raw image bytes, so
/// byte-identical images always share a fingerprint and distinct images
/// collide only with negligible probability.
///
/// **Type Safety**: there is deliberately no `From<String>`; a fingerprint is
/// either computed from content or parsed from a well-formed digest.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageFingerprint(String);

impl ImageFingerprint {
    /// Fingerprint the complete image payload.
    pub fn of(bytes: &[u8]) -> Self {
        Self(format!("{:x}", Sha256::digest(bytes)))
    }

    /// Parse a previously computed fingerprint.
    ///
    /// Returns `None` unless the input is a 64 character lowercase hex digest.
    pub fn parse(hex: &str) -> Option<Self> {
        let well_formed = hex.len() == FINGERPRINT_HEX_LEN
            && hex.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'));
        well_formed.then(|| Self(hex.to_string()))
    }

    /// Get the inner hex string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ImageFingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Readiness of the detector, as observed by the request path.
///
/// Transitions are `WarmingUp -> Ready` and `WarmingUp -> Failed`; both
/// targets are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReadinessState {
    #[serde(rename = "warming up")]
    WarmingUp,
    #[serde(rename = "ready")]
    Ready,
    #[serde(rename = "failed")]
    Failed,
}

impl ReadinessState {
    /// Status string reported by `/check-status`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::WarmingUp => "warming up",
            Self::Ready => "ready",
            Self::Failed => "failed",
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready)
    }
}

impl std::fmt::Display for ReadinessState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
