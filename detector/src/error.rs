use common::ProcessError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum DetectorError {
    /// The payload could not be decoded as an image
    #[error("Invalid image: {0}")]
    InvalidImage(String),

    #[error("Warm-up failed: {0}")]
    Warmup(String),

    #[error("Detection failed: {0}")]
    Failed(String),

    /// The blocking worker panicked or was cancelled
    #[error("Detector task aborted: {0}")]
    Aborted(String),
}

pub type DetectorResult<T> = std::result::Result<T, DetectorError>;

impl From<DetectorError> for ProcessError {
    fn from(err: DetectorError) -> Self {
        match err {
            DetectorError::InvalidImage(msg) => ProcessError::BadInput(msg),
            other => ProcessError::DetectionFailure(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_image_is_bad_input() {
        let err: ProcessError = DetectorError::InvalidImage("truncated png".into()).into();
        assert_eq!(err, ProcessError::BadInput("truncated png".into()));
    }

    #[test]
    fn test_other_errors_are_detection_failures() {
        let err: ProcessError = DetectorError::Aborted("panicked".into()).into();
        assert!(matches!(err, ProcessError::DetectionFailure(ref m) if m.contains("panicked")));
    }
}
