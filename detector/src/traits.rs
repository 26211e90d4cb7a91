use common::DetectedFeatures;

use crate::error::DetectorResult;

/// An image feature detector with a one-time warm-up.
///
/// Both operations are blocking and may be expensive. Callers on an async
/// runtime go through [`DetectorAdapter`](crate::DetectorAdapter), which moves
/// them onto blocking threads.
pub trait FeatureDetector: Send + Sync + 'static {
    /// Prepare the detector. Called once before any `detect`.
    fn warmup(&self) -> DetectorResult<()>;

    /// Detect features in an encoded image.
    fn detect(&self, image: &[u8]) -> DetectorResult<DetectedFeatures>;

    /// Whether `detect` may run on several threads at once.
    ///
    /// Returning `false` makes the adapter run at most one call at a time
    /// across all fingerprints.
    fn concurrent_safe(&self) -> bool {
        false
    }

    /// Name used in logs
    fn name(&self) -> &'static str;
}
