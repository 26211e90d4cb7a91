//! Router configuration and setup.

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::{
    compression::CompressionLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use common::backend::AppStateProvider;

use crate::{config::ApiConfig, middleware, routes};

/// Build the complete router: routes, optional docs, then middleware.
///
/// Layers are applied before `.with_state()` so the state type stays
/// concrete (`Arc<dyn AppStateProvider>`).
pub fn build_router(state: Arc<dyn AppStateProvider>, config: &ApiConfig) -> Router {
    let mut router = Router::new()
        .route("/check-status", get(routes::check_status::check_status))
        .route("/process-image", post(routes::process_image::process_image))
        .route("/stats", get(routes::stats::get_stats));

    if config.enable_swagger {
        router = router
            .merge(SwaggerUi::new("/swagger-ui").url("/api-doc/openapi.json", routes::ApiDoc::openapi()));
    }

    // Order matters: outer to inner
    router
        .layer(DefaultBodyLimit::max(config.max_body_size))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().include_headers(false))
                .on_response(DefaultOnResponse::new().include_headers(false)),
        )
        .layer(CompressionLayer::new())
        .layer(middleware::cors_layer(config))
        .with_state(state)
}
