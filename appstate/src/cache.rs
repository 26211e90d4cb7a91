//! Content cache over the durable store.
//!
//! Store failures never fail a request: a failed read is a miss, a failed
//! write is logged and the computed result is still returned.

use std::sync::Arc;

use common::{CacheEntry, FeatureResult, ImageFingerprint};
use storage::{FeatureStore, PutOutcome, StorageError};

pub struct ContentCache {
    store: Arc<dyn FeatureStore>,
}

impl ContentCache {
    pub fn new(store: Arc<dyn FeatureStore>) -> Self {
        Self { store }
    }

    pub fn backend_name(&self) -> &'static str {
        self.store.backend_name()
    }

    pub async fn get(&self, fingerprint: &ImageFingerprint) -> Option<Arc<FeatureResult>> {
        let store = Arc::clone(&self.store);
        let key = fingerprint.clone();
        let lookup = run_blocking(move || store.get(&key)).await;

        match lookup {
            Ok(entry) => entry.map(|e| Arc::new(e.result)),
            Err(e) => {
                tracing::warn!(fingerprint = %fingerprint, error = %e, "Cache read failed, treating as miss");
                None
            }
        }
    }

    /// Persist a result. Best-effort; the first write for a fingerprint wins.
    pub async fn put(&self, result: &FeatureResult) {
        let store = Arc::clone(&self.store);
        let entry = CacheEntry::new(result.clone());
        let fingerprint = result.fingerprint.clone();

        match run_blocking(move || store.put(&entry)).await {
            Ok(PutOutcome::Inserted) => {
                tracing::debug!(fingerprint = %fingerprint, "Cached result");
            }
            Ok(PutOutcome::AlreadyPresent) => {
                tracing::debug!(fingerprint = %fingerprint, "Result already cached");
            }
            Err(e) => {
                tracing::warn!(fingerprint = %fingerprint, error = %e, "Cache write failed, result not persisted");
            }
        }
    }
}

async fn run_blocking<T, F>(op: F) -> Result<T, StorageError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, StorageError> + Send + 'static,
{
    tokio::task::spawn_blocking(op)
        .await
        .map_err(|e| StorageError::Unavailable(e.to_string()))?
}
