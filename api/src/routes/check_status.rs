//! Readiness endpoint.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use common::backend::AppStateProvider;

/// Readiness response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct StatusResponse {
    /// `ready`, `warming up` or `failed`
    pub status: String,
}

/// Report whether the detector has finished warming up.
///
/// Pure read: no audit record, no state change.
#[utoipa::path(
    get,
    path = "/check-status",
    responses(
        (status = 200, description = "Detector warmed up", body = StatusResponse),
        (status = 503, description = "Warming up, or warm-up failed", body = StatusResponse),
    ),
    tag = "Status"
)]
pub async fn check_status(
    State(state): State<Arc<dyn AppStateProvider>>,
) -> (StatusCode, Json<StatusResponse>) {
    let readiness = state.readiness();
    let status = if readiness.is_ready() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(StatusResponse {
            status: readiness.as_str().to_string(),
        }),
    )
}
