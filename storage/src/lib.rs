//! Persistence for the feature cache.
//!
//! This crate provides the durable key-value store behind the content cache
//! and the append-only request log, using the `libmdbx` embedded database.
//!
//! # Architecture
//!
//! - `FeatureStore` is the single trait the rest of the service depends on
//! - `MdbxFeatureStore` persists results and the request log in two tables
//! - `InMemoryFeatureStore` is used when no durable store is configured or
//!   the durable store cannot be opened
//!
//! # Concurrency Safety
//!
//! Both stores are `Send + Sync` and are shared as `Arc<dyn FeatureStore>`.
//! Each operation runs in its own transaction, so single-key get/put is
//! consistent without external locking. Operations are blocking; async
//! callers should run them on a blocking thread.

mod config;
mod error;
mod mdbx;
mod memory;
pub mod traits;

pub use config::{open_store, StoreConfig};
pub use error::{StorageError, StorageResult};
pub use mdbx::MdbxFeatureStore;
pub use memory::{InMemoryFeatureStore, DEFAULT_LOG_CAPACITY};
pub use traits::{FeatureStore, PutOutcome};

// Re-export commonly used types for convenience
pub use common::{AuditOutcome, AuditRecord, CacheEntry, FeatureResult, ImageFingerprint};
