//! Store abstraction for swappable persistence backends.

use common::{AuditRecord, CacheEntry, ImageFingerprint};

use crate::error::StorageResult;

/// Result of writing a cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PutOutcome {
    /// First entry for this fingerprint
    Inserted,
    /// An entry already existed and was left untouched
    AlreadyPresent,
}

/// Key-value store for computed results plus an append-only request log.
///
/// Implementations must be safe to share across threads. All methods are
/// blocking.
pub trait FeatureStore: Send + Sync + 'static {
    /// Look up the entry for a fingerprint. A miss is `Ok(None)`, not an error.
    fn get(&self, fingerprint: &ImageFingerprint) -> StorageResult<Option<CacheEntry>>;

    /// Store an entry. Idempotent: the first entry for a fingerprint wins and
    /// later writes for the same fingerprint are no-ops.
    fn put(&self, entry: &CacheEntry) -> StorageResult<PutOutcome>;

    /// Append a record to the request log.
    fn log(&self, record: &AuditRecord) -> StorageResult<()>;

    /// Most recent `limit` log records, oldest first.
    fn recent_logs(&self, limit: usize) -> StorageResult<Vec<AuditRecord>>;

    /// Short backend name for diagnostics
    fn backend_name(&self) -> &'static str;
}
