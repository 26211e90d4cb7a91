//! Request-level error taxonomy.
//!
//! `ProcessError` is what `process_image` returns to a caller. It is `Clone`
//! because a single detector failure is delivered to the leader and every
//! follower waiting on the same in-flight computation.

use thiserror::Error;

use crate::ReadinessState;

/// Result type for request processing.
pub type ProcessResult<T> = Result<T, ProcessError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProcessError {
    /// The detector has not finished warming up (or warm-up failed)
    #[error("Service not ready: {0}")]
    NotReady(ReadinessState),

    /// Missing, empty or undecodable image payload
    #[error("Bad request: {0}")]
    BadInput(String),

    /// The detector failed for this image
    #[error("Detection failed: {0}")]
    DetectionFailure(String),

    /// Gave up waiting for another request's computation
    #[error("Timed out waiting for in-flight detection")]
    Timeout,
}

impl ProcessError {
    /// Stable machine-readable kind, used as the error code in HTTP bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotReady(_) => "not_ready",
            Self::BadInput(_) => "bad_request",
            Self::DetectionFailure(_) => "detection_failed",
            Self::Timeout => "timeout",
        }
    }
}
