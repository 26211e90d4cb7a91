//! FeatureCache server entry point.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use common::AppStateProvider;
use featurecache_server::{
    build_app_state, logging, run_detect, shutdown_signal, CliArgs, ServerConfig, ServerError,
    ServerMode,
};

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();
    let config = ServerConfig::load(&args)?;
    logging::init(&config.log_level, config.log_format);

    info!("Starting FeatureCache Server v{}", env!("CARGO_PKG_VERSION"));
    info!("Mode: {:?}", args.mode);

    match args.mode {
        ServerMode::Serve => {
            let state = build_app_state(&config);
            // Requests are answered (503) while the detector warms up
            let _warmup = state.start_warmup();

            let state = Arc::new(state) as Arc<dyn AppStateProvider>;
            featurecache_api::run_server(state, config.api_config(), shutdown_signal())
                .await
                .context("HTTP server failed")?;
        }
        ServerMode::Detect => {
            let image = args.image.as_deref().ok_or(ServerError::MissingImage)?;
            let report = run_detect(image, config.detector.clone()).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    info!("Server shutdown complete");
    Ok(())
}
