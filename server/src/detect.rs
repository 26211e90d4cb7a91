//! One-shot detection: warm up, run the detector on one file, return the features.

use std::path::Path;
use std::sync::Arc;

use bytes::Bytes;
use serde::Serialize;
use tracing::info;

use common::{DetectedFeatures, ImageFingerprint};
use feature_detector::{DetectorAdapter, DetectorConfig, KeypointDetector};

use crate::error::{ServerError, ServerResult};

/// Printed by `--mode detect`.
#[derive(Debug, Clone, Serialize)]
pub struct DetectReport {
    pub fingerprint: ImageFingerprint,
    #[serde(flatten)]
    pub features: DetectedFeatures,
}

pub async fn run_detect(path: &Path, config: DetectorConfig) -> ServerResult<DetectReport> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|source| ServerError::ImageRead {
            path: path.to_path_buf(),
            source,
        })?;

    let adapter = DetectorAdapter::new(Arc::new(KeypointDetector::new(config)));
    adapter.warmup().await?;

    let fingerprint = ImageFingerprint::of(&bytes);
    let features = adapter.detect(Bytes::from(bytes)).await?;
    info!(
        "Detected {} keypoints in {} ({}x{})",
        features.keypoints,
        path.display(),
        features.width,
        features.height
    );

    Ok(DetectReport {
        fingerprint,
        features,
    })
}
