//! End-to-end checks of the adapter driving the built-in detector

use std::io::Cursor;
use std::sync::Arc;

use bytes::Bytes;
use feature_detector::keypoint::checkerboard;
use feature_detector::{DetectorAdapter, DetectorError, KeypointDetector, MockDetector};
use image::{DynamicImage, ImageFormat};

fn checkerboard_png() -> Bytes {
    let mut buf = Vec::new();
    DynamicImage::ImageLuma8(checkerboard(64, 8))
        .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .expect("encode png");
    Bytes::from(buf)
}

#[tokio::test]
async fn test_keypoint_detector_through_adapter() {
    let adapter = DetectorAdapter::new(Arc::new(KeypointDetector::default()));
    adapter.warmup().await.expect("warm-up should succeed");

    let features = adapter.detect(checkerboard_png()).await.unwrap();
    assert!(features.keypoints > 0);
    assert_eq!(adapter.invocations(), 1);
    assert_eq!(adapter.detector_name(), "harris-keypoint");
}

#[tokio::test]
async fn test_corrupt_payload_is_reported_as_invalid_image() {
    let adapter = DetectorAdapter::new(Arc::new(KeypointDetector::default()));
    let err = adapter
        .detect(Bytes::from_static(b"\x89PNG\r\n\x1a\ntruncated"))
        .await
        .unwrap_err();
    assert!(matches!(err, DetectorError::InvalidImage(_)));
}

#[tokio::test]
async fn test_mock_results_follow_payload() {
    let adapter = DetectorAdapter::new(Arc::new(MockDetector::new()));
    let cat = adapter.detect(Bytes::from_static(b"cat.jpg")).await.unwrap();
    let cat_again = adapter.detect(Bytes::from_static(b"cat.jpg")).await.unwrap();
    let dog = adapter.detect(Bytes::from_static(b"dog.jpeg")).await.unwrap();

    assert_eq!(cat, cat_again);
    assert_ne!(cat, dog);
}
