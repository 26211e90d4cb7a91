//! Image upload endpoint.
//!
//! Accepts `multipart/form-data` with the image in the `image` field. Other
//! fields are ignored.

use std::sync::Arc;

use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    http::StatusCode,
    Json,
};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use common::backend::AppStateProvider;
use common::{ProcessOutcome, ResultSource};

use crate::error::{ApiError, ApiResult, ErrorResponse};

/// Multipart field carrying the image.
pub const IMAGE_FIELD: &str = "image";

/// Features detected in the uploaded image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ProcessImageResponse {
    /// Hex SHA-256 of the uploaded bytes
    pub fingerprint: String,
    pub width: u32,
    pub height: u32,
    /// Number of keypoints found
    pub keypoints: usize,
    /// Descriptor matrix shape `[rows, cols]`
    #[schema(value_type = Vec<u64>)]
    pub descriptors: [usize; 2],
    pub computed_at: DateTime<Utc>,
    /// Time the detector spent on the original computation
    pub duration_ms: u64,
    /// `cache`, `computed` or `in_flight`
    #[schema(value_type = String)]
    pub source: ResultSource,
}

impl From<ProcessOutcome> for ProcessImageResponse {
    fn from(outcome: ProcessOutcome) -> Self {
        let result = outcome.result;
        Self {
            fingerprint: result.fingerprint.to_string(),
            width: result.width,
            height: result.height,
            keypoints: result.keypoints,
            descriptors: result.descriptors,
            computed_at: result.computed_at,
            duration_ms: result.duration_ms,
            source: outcome.source,
        }
    }
}

/// Detect features in an uploaded image.
///
/// Identical images are computed once; concurrent uploads of the same image
/// share a single detector run.
#[utoipa::path(
    post,
    path = "/process-image",
    request_body(content_type = "multipart/form-data", description = "Image file in the `image` field"),
    responses(
        (status = 200, description = "Features detected", body = ProcessImageResponse),
        (status = 400, description = "Missing, empty or undecodable image", body = ErrorResponse),
        (status = 413, description = "Upload exceeds the body limit", body = ErrorResponse),
        (status = 500, description = "Detector failed", body = ErrorResponse),
        (status = 503, description = "Detector not warmed up", body = ErrorResponse),
        (status = 504, description = "Timed out waiting for an identical upload", body = ErrorResponse),
    ),
    tag = "Detection"
)]
pub async fn process_image(
    State(state): State<Arc<dyn AppStateProvider>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Json<ProcessImageResponse>> {
    let request_id = uuid::Uuid::new_v4();

    let image = match read_image_field(multipart).await {
        Ok(image) => image,
        // A not-ready service answers 503 whatever the payload looks like.
        Err((status, reason)) if state.readiness().is_ready() => {
            tracing::info!(request_id = %request_id, status = %status, reason = %reason, "Unreadable upload");
            return Err(ApiError::from_upload(status, reason));
        }
        Err(_) => None,
    };

    tracing::info!(
        request_id = %request_id,
        bytes = image.as_ref().map(Bytes::len).unwrap_or(0),
        "Process image request"
    );

    match state.process_image(image).await {
        Ok(outcome) => {
            tracing::info!(
                request_id = %request_id,
                fingerprint = %outcome.result.fingerprint,
                source = ?outcome.source,
                "Process image complete"
            );
            Ok(Json(outcome.into()))
        }
        Err(e) => {
            tracing::warn!(request_id = %request_id, error = %e, "Process image failed");
            Err(e.into())
        }
    }
}

/// Pull the `image` field out of the form, or `None` if there is none.
///
/// Errors carry the status axum assigned, so a body over the limit stays
/// distinguishable from a garbled form.
async fn read_image_field(
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Option<Bytes>, (StatusCode, String)> {
    let mut multipart = multipart.map_err(|e| (e.status(), e.body_text()))?;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| (e.status(), format!("multipart parse error: {}", e.body_text())))?
    {
        if field.name() == Some(IMAGE_FIELD) {
            let data = field
                .bytes()
                .await
                .map_err(|e| (e.status(), format!("failed to read image field: {}", e.body_text())))?;
            return Ok(Some(data));
        }
    }

    Ok(None)
}
