use std::path::PathBuf;
use std::sync::Arc;

use crate::mdbx::MdbxFeatureStore;
use crate::memory::InMemoryFeatureStore;
use crate::traits::FeatureStore;

/// Configuration for the feature store
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Directory holding the libmdbx environment
    pub path: PathBuf,

    /// Skip the durable store entirely (tests, throwaway runs)
    pub in_memory: bool,
}

impl StoreConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            in_memory: false,
        }
    }

    /// Configuration for a process-local store
    pub fn in_memory() -> Self {
        Self {
            in_memory: true,
            ..Self::default()
        }
    }

    pub fn with_in_memory(mut self, enabled: bool) -> Self {
        self.in_memory = enabled;
        self
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: common::platform::get_default_db_path(),
            in_memory: false,
        }
    }
}

/// Open the configured store.
///
/// Never fails: if the durable store cannot be opened the service keeps
/// running on an in-memory store, which only costs cache persistence.
pub fn open_store(config: &StoreConfig) -> Arc<dyn FeatureStore> {
    if config.in_memory {
        tracing::info!("Using in-memory feature store");
        return Arc::new(InMemoryFeatureStore::new());
    }

    match MdbxFeatureStore::open(&config.path) {
        Ok(store) => Arc::new(store),
        Err(e) => {
            tracing::warn!(
                path = %config.path.display(),
                error = %e,
                "Failed to open durable feature store, falling back to in-memory store"
            );
            Arc::new(InMemoryFeatureStore::new())
        }
    }
}
