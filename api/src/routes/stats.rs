//! Service statistics endpoint.

use std::sync::Arc;

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use common::backend::AppStateProvider;
use common::ServiceStats;

/// Process-local counters since startup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct StatsResponse {
    /// Readiness, as reported by `/check-status`
    pub status: String,
    /// Requests served from the content cache
    pub cache_hits: u64,
    /// Requests that ran the detector
    pub cache_misses: u64,
    /// Requests that received another request's in-flight result
    pub joined: u64,
    /// Requests that ended in a detection failure or timeout
    pub failures: u64,
    /// Detector calls issued
    pub detector_invocations: u64,
}

impl From<ServiceStats> for StatsResponse {
    fn from(stats: ServiceStats) -> Self {
        Self {
            status: stats.status.as_str().to_string(),
            cache_hits: stats.cache_hits,
            cache_misses: stats.cache_misses,
            joined: stats.joined,
            failures: stats.failures,
            detector_invocations: stats.detector_invocations,
        }
    }
}

/// Cache and detector counters
#[utoipa::path(
    get,
    path = "/stats",
    responses(
        (status = 200, description = "Current counters", body = StatsResponse),
    ),
    tag = "Status"
)]
pub async fn get_stats(State(state): State<Arc<dyn AppStateProvider>>) -> Json<StatsResponse> {
    Json(state.stats().into())
}
