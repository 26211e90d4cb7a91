//! Feature detector collaborator.
//!
//! - [`FeatureDetector`]: blocking `warmup` / `detect` contract
//! - [`DetectorAdapter`]: async facade that owns the detector, offloads calls
//!   to blocking threads, serializes detectors that are not thread-safe and
//!   counts invocations
//! - [`KeypointDetector`]: built-in Harris corner detector
//! - `MockDetector` (feature `test-helpers`): scripted detector for tests

mod adapter;
mod error;
pub mod keypoint;
mod traits;

#[cfg(any(test, feature = "test-helpers"))]
mod mock;

pub use adapter::DetectorAdapter;
pub use error::{DetectorError, DetectorResult};
pub use keypoint::{DetectorConfig, KeypointDetector};
pub use traits::FeatureDetector;

#[cfg(any(test, feature = "test-helpers"))]
pub use mock::MockDetector;
