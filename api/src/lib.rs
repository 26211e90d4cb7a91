//! FeatureCache API Crate
//!
//! HTTP surface of the feature cache service using Axum.
//!
//! # Routes
//!
//! - `GET /check-status`: readiness (`200 ready`, `503 warming up | failed`)
//! - `POST /process-image`: multipart upload, field `image`
//! - `GET /stats`: cache and detector counters
//! - `GET /swagger-ui/`, `GET /api-doc/openapi.json` when enabled
//!
//! Handlers depend only on [`AppStateProvider`], so the router can be driven
//! by any backend.
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use featurecache_api::{run_server, ApiConfig, AppStateProvider};
//!
//! async fn serve(state: Arc<dyn AppStateProvider>) -> anyhow::Result<()> {
//!     run_server(state, ApiConfig::default(), std::future::pending()).await
//! }
//! ```

#![deny(unsafe_code)]

mod config;
mod error;
mod middleware;
mod router;
pub mod routes;

// Re-export public API
pub use common::backend::AppStateProvider;
pub use config::ApiConfig;
pub use error::{ApiError, ApiResult, ErrorDetail, ErrorResponse};
pub use router::build_router;

use std::future::Future;
use std::sync::Arc;

/// Run the HTTP API server until `shutdown` resolves.
///
/// # Errors
///
/// Returns an error if the address cannot be bound or the server fails.
pub async fn run_server<F>(
    state: Arc<dyn AppStateProvider>,
    config: ApiConfig,
    shutdown: F,
) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    let local = listener.local_addr()?;

    tracing::info!("FeatureCache API listening on http://{}", local);
    if config.enable_swagger {
        tracing::info!("Swagger UI:    http://{}/swagger-ui/", local);
        tracing::info!("OpenAPI Spec:  http://{}/api-doc/openapi.json", local);
    }

    let app = build_router(state, &config);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    tracing::info!("HTTP server stopped");
    Ok(())
}
