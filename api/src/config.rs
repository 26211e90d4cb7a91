//! API configuration.

use serde::{Deserialize, Serialize};

/// Configuration for the HTTP API server.
///
/// # Example
///
/// ```rust
/// use featurecache_api::ApiConfig;
///
/// let config = ApiConfig {
///     port: 5000,
///     enable_swagger: false,
///     ..Default::default()
/// };
/// assert_eq!(config.host, "0.0.0.0");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Interface to bind to.
    ///
    /// Default: `0.0.0.0`
    pub host: String,

    /// Port to bind the HTTP server to.
    ///
    /// Default: 5000
    pub port: u16,

    /// Enable Cross-Origin Resource Sharing (CORS).
    ///
    /// Default: true
    pub enable_cors: bool,

    /// Allowed origins for CORS requests.
    ///
    /// Use `["*"]` to allow all origins.
    ///
    /// Default: `["*"]`
    pub cors_origins: Vec<String>,

    /// Largest accepted request body in bytes, multipart framing included.
    ///
    /// Default: 20 MiB
    pub max_body_size: usize,

    /// Serve Swagger UI at `/swagger-ui/` and the document at
    /// `/api-doc/openapi.json`.
    ///
    /// Default: true
    pub enable_swagger: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            enable_cors: true,
            cors_origins: vec!["*".to_string()],
            max_body_size: 20 * 1024 * 1024,
            enable_swagger: true,
        }
    }
}

impl ApiConfig {
    /// `host:port` as given in the configuration
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
