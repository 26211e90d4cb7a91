//! Error types for the API.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;

use common::ProcessError;

/// Result type for API operations.
pub type ApiResult<T> = Result<T, ApiError>;

/// API error types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// Bad request (400) - missing, empty or undecodable image
    BadRequest(String),

    /// Payload too large (413) - upload exceeds the body limit
    PayloadTooLarge(String),

    /// Service unavailable (503) - detector not warmed up
    ServiceUnavailable(String),

    /// Internal server error (500) - detector failure
    InternalError(String),

    /// Gateway timeout (504) - gave up waiting on a shared computation
    Timeout(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            Self::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
        }
    }

    /// Machine-readable code placed in the response body.
    pub fn code(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "bad_request",
            Self::PayloadTooLarge(_) => "payload_too_large",
            Self::ServiceUnavailable(_) => "not_ready",
            Self::InternalError(_) => "detection_failed",
            Self::Timeout(_) => "timeout",
        }
    }

    fn message(&self) -> &str {
        match self {
            Self::BadRequest(msg)
            | Self::PayloadTooLarge(msg)
            | Self::ServiceUnavailable(msg)
            | Self::InternalError(msg)
            | Self::Timeout(msg) => msg,
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.status(), self.code(), self.message())
    }
}

impl std::error::Error for ApiError {}

/// Error response body: `{"error": {"code": ..., "message": ...}}`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// One of `bad_request`, `payload_too_large`, `not_ready`,
    /// `detection_failed`, `timeout`
    pub code: String,
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            error: ErrorDetail {
                code: self.code().to_string(),
                message: self.message().to_string(),
            },
        };
        (self.status(), Json(body)).into_response()
    }
}

impl ApiError {
    /// Upload read failures: over the body limit is 413, anything else 400.
    pub fn from_upload(status: StatusCode, message: String) -> Self {
        if status == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::PayloadTooLarge(message)
        } else {
            ApiError::BadRequest(message)
        }
    }
}

/// Primary mapping from the request path to HTTP.
impl From<ProcessError> for ApiError {
    fn from(err: ProcessError) -> Self {
        match err {
            ProcessError::NotReady(state) => ApiError::ServiceUnavailable(format!(
                "Service is {}. Check GET /check-status and retry once it reports ready",
                state
            )),
            ProcessError::BadInput(msg) => ApiError::BadRequest(msg),
            ProcessError::DetectionFailure(msg) => ApiError::InternalError(msg),
            ProcessError::Timeout => ApiError::Timeout(
                "Timed out waiting for an identical image already being processed".to_string(),
            ),
        }
    }
}
