//! Backend trait consumed by the HTTP layer.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────┐
//! │   API (axum routes)      │
//! └────────────┬─────────────┘
//!              │
//!              ▼
//! ┌──────────────────────────┐
//! │  AppStateProvider        │  <- SINGLE TRAIT
//! │  readiness()             │
//! │  process_image()         │
//! │  stats()                 │
//! └────────────┬─────────────┘
//!              │
//!              ▼
//! ┌──────────────────────────┐
//! │  gate / cache /          │
//! │  in-flight / detector    │
//! └──────────────────────────┘
//! ```
//!
//! Routes depend on this trait only, so they can be exercised against any
//! backend, including one wired to a scripted detector.

use async_trait::async_trait;
use bytes::Bytes;

use crate::errors::ProcessResult;
use crate::models::{ProcessOutcome, ServiceStats};
use crate::ReadinessState;

#[async_trait]
pub trait AppStateProvider: Send + Sync + 'static {
    /// Current readiness. Pure read, no side effects.
    fn readiness(&self) -> ReadinessState;

    /// Derive (or look up) the features of an image.
    ///
    /// `image` is `None` when the request carried no image field; the
    /// readiness check still runs first so that a not-ready service answers
    /// "unavailable" regardless of the payload.
    ///
    /// # Errors
    ///
    /// - `NotReady` while warm-up is pending or after it failed
    /// - `BadInput` for a missing, empty or undecodable image
    /// - `DetectionFailure` when the detector fails
    /// - `Timeout` when waiting on another request's computation took too long
    async fn process_image(&self, image: Option<Bytes>) -> ProcessResult<ProcessOutcome>;

    /// Snapshot of the service counters.
    fn stats(&self) -> ServiceStats;
}
