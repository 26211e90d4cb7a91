//! Configuration system for the feature cache server.
//!
//! Supports:
//! - CLI arguments and environment variables (highest priority)
//! - TOML config file
//! - Defaults (lowest priority)

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use appstate::AppStateConfig;
use feature_detector::DetectorConfig;
use featurecache_api::ApiConfig;
use storage::StoreConfig;

use crate::logging::LogFormat;

/// Command-line arguments for the feature cache server.
#[derive(Parser, Debug, Clone)]
#[command(name = "featurecache-server")]
#[command(about = "Image feature detection service with content caching")]
#[command(version)]
pub struct CliArgs {
    /// Serve HTTP, or run the detector once on `--image`
    #[arg(long, short = 'm', default_value = "serve", env = "FEATURECACHE_MODE")]
    pub mode: ServerMode,

    /// Configuration file path (ignored if missing)
    #[arg(long, short = 'c', default_value = "featurecache.toml", env = "FEATURECACHE_CONFIG")]
    pub config: PathBuf,

    /// Interface to bind
    #[arg(long, env = "FEATURECACHE_HOST")]
    pub host: Option<String>,

    /// HTTP port
    #[arg(long, short = 'p', env = "FEATURECACHE_PORT")]
    pub port: Option<u16>,

    /// Database directory (defaults to platform-specific AppData location)
    #[arg(long, env = "FEATURECACHE_DB_PATH")]
    pub db_path: Option<PathBuf>,

    /// Keep the cache in memory only
    #[arg(long, env = "FEATURECACHE_IN_MEMORY")]
    pub in_memory: bool,

    /// Image to process in `detect` mode
    #[arg(long, short = 'i')]
    pub image: Option<PathBuf>,

    /// Log level or `EnvFilter` directives
    #[arg(long, env = "FEATURECACHE_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Log output format
    #[arg(long, env = "FEATURECACHE_LOG_FORMAT")]
    pub log_format: Option<LogFormat>,
}

/// Server operation mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerMode {
    /// HTTP API
    Serve,
    /// Warm up, detect features in one image, print them and exit
    Detect,
}

/// Full server configuration (merged from all sources).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub http: HttpConfig,
    pub database: DatabaseConfig,
    pub detector: DetectorConfig,
    pub coordinator: CoordinatorConfig,
    pub log_level: String,
    pub log_format: LogFormat,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http: HttpConfig::default(),
            database: DatabaseConfig::default(),
            detector: DetectorConfig::default(),
            coordinator: CoordinatorConfig::default(),
            log_level: "info".to_string(),
            log_format: LogFormat::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub host: String,
    pub port: u16,
    pub cors_origins: Vec<String>,
    pub max_body_size: usize,
    pub enable_swagger: bool,
}

impl Default for HttpConfig {
    fn default() -> Self {
        let api = ApiConfig::default();
        Self {
            host: api.host,
            port: api.port,
            cors_origins: api.cors_origins,
            max_body_size: api.max_body_size,
            enable_swagger: api.enable_swagger,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// `None` selects the platform data directory
    pub path: Option<PathBuf>,
    pub in_memory: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinatorConfig {
    /// How long a request waits on an identical in-flight request
    pub follower_timeout_secs: u64,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            follower_timeout_secs: 120,
        }
    }
}

impl ServerConfig {
    /// Load configuration from CLI args and optional config file.
    ///
    /// Priority: CLI args / environment > config file > defaults
    pub fn load(args: &CliArgs) -> Result<Self> {
        let mut config = if args.config.exists() {
            Self::from_file(&args.config)
                .with_context(|| format!("Failed to load config from {:?}", args.config))?
        } else {
            Self::default()
        };

        if let Some(ref host) = args.host {
            config.http.host = host.clone();
        }
        if let Some(port) = args.port {
            config.http.port = port;
        }
        if let Some(ref db_path) = args.db_path {
            config.database.path = Some(db_path.clone());
        }
        if args.in_memory {
            config.database.in_memory = true;
        }
        if let Some(ref level) = args.log_level {
            config.log_level = level.clone();
        }
        if let Some(format) = args.log_format {
            config.log_format = format;
        }
        Ok(config)
    }

    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        let config: ServerConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;

        Ok(config)
    }

    pub fn api_config(&self) -> ApiConfig {
        ApiConfig {
            host: self.http.host.clone(),
            port: self.http.port,
            enable_cors: !self.http.cors_origins.is_empty(),
            cors_origins: self.http.cors_origins.clone(),
            max_body_size: self.http.max_body_size,
            enable_swagger: self.http.enable_swagger,
        }
    }

    pub fn store_config(&self) -> StoreConfig {
        let base = match self.database.path {
            Some(ref path) => StoreConfig::new(path),
            None => StoreConfig::default(),
        };
        base.with_in_memory(self.database.in_memory)
    }

    pub fn appstate_config(&self) -> AppStateConfig {
        AppStateConfig {
            follower_timeout: Duration::from_secs(self.coordinator.follower_timeout_secs),
        }
    }
}
