use std::collections::VecDeque;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::Mutex;

use common::{AuditRecord, CacheEntry, ImageFingerprint};

use crate::error::StorageResult;
use crate::traits::{FeatureStore, PutOutcome};

/// Request log records kept by default; older ones are dropped.
pub const DEFAULT_LOG_CAPACITY: usize = 10_000;

/// Process-local stand-in for the durable store.
///
/// Nothing survives a restart. The request log is a ring of the most recent
/// records.
pub struct InMemoryFeatureStore {
    entries: DashMap<ImageFingerprint, CacheEntry>,
    log: Mutex<VecDeque<AuditRecord>>,
    log_capacity: usize,
}

impl Default for InMemoryFeatureStore {
    fn default() -> Self {
        Self::with_log_capacity(DEFAULT_LOG_CAPACITY)
    }
}

impl InMemoryFeatureStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_log_capacity(log_capacity: usize) -> Self {
        Self {
            entries: DashMap::new(),
            log: Mutex::new(VecDeque::new()),
            log_capacity,
        }
    }

    /// Number of cached entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FeatureStore for InMemoryFeatureStore {
    fn get(&self, fingerprint: &ImageFingerprint) -> StorageResult<Option<CacheEntry>> {
        Ok(self.entries.get(fingerprint).map(|entry| entry.value().clone()))
    }

    fn put(&self, entry: &CacheEntry) -> StorageResult<PutOutcome> {
        match self.entries.entry(entry.fingerprint.clone()) {
            Entry::Occupied(_) => Ok(PutOutcome::AlreadyPresent),
            Entry::Vacant(slot) => {
                slot.insert(entry.clone());
                Ok(PutOutcome::Inserted)
            }
        }
    }

    fn log(&self, record: &AuditRecord) -> StorageResult<()> {
        if self.log_capacity == 0 {
            return Ok(());
        }
        let mut log = self.log.lock();
        while log.len() >= self.log_capacity {
            log.pop_front();
        }
        log.push_back(record.clone());
        Ok(())
    }

    fn recent_logs(&self, limit: usize) -> StorageResult<Vec<AuditRecord>> {
        let log = self.log.lock();
        let start = log.len().saturating_sub(limit);
        Ok(log.iter().skip(start).cloned().collect())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
