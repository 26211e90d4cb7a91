//! API route handlers.

pub mod check_status;
pub mod process_image;
pub mod stats;

use utoipa::OpenApi;

/// OpenAPI documentation for all routes.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "FeatureCache API",
        version = "0.1.0",
        description = "Image feature detection with content caching and request coalescing",
        license(name = "MIT"),
    ),
    servers(
        (url = "http://localhost:5000", description = "Local development"),
    ),
    paths(
        check_status::check_status,
        process_image::process_image,
        stats::get_stats,
    ),
    components(schemas(
        check_status::StatusResponse,
        process_image::ProcessImageResponse,
        stats::StatsResponse,
        crate::error::ErrorResponse,
        crate::error::ErrorDetail,
    )),
    tags(
        (name = "Status", description = "Readiness and counters"),
        (name = "Detection", description = "Feature detection"),
    )
)]
pub struct ApiDoc;
