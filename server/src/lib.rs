//! FeatureCache server binary support.
//!
//! The binary parses configuration, installs logging, wires the store and
//! detector into an `appstate::AppState` and hands it to the HTTP layer.
//! Request semantics live in `appstate`, not here.

pub mod config;
pub mod detect;
pub mod error;
pub mod logging;
pub mod shutdown;

use std::sync::Arc;

use tracing::info;

use appstate::AppState;
use feature_detector::{DetectorAdapter, KeypointDetector};
use storage::open_store;

pub use config::{CliArgs, ServerConfig, ServerMode};
pub use detect::{run_detect, DetectReport};
pub use error::{ServerError, ServerResult};
pub use logging::LogFormat;
pub use shutdown::shutdown_signal;

/// Open the configured store and build the request handler around the
/// built-in keypoint detector. Warm-up is not started.
pub fn build_app_state(config: &ServerConfig) -> AppState {
    let store = open_store(&config.store_config());
    info!("Cache backend: {}", store.backend_name());

    let detector = KeypointDetector::new(config.detector.clone());
    let adapter = Arc::new(DetectorAdapter::new(Arc::new(detector)));

    AppState::new(store, adapter, config.appstate_config())
}
