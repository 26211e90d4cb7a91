//! libmdbx-backed store.
//!
//! Layout:
//! - `image_results`: fingerprint (hex bytes) -> JSON `CacheEntry`
//! - `request_log`: `[timestamp_millis BE | sequence BE]` -> JSON `AuditRecord`
//!
//! Log keys sort chronologically, so the newest records sit at the end of
//! the table and `recent_logs` only reads the tail.

use std::borrow::Cow;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use libmdbx::{Database, DatabaseOptions, NoWriteMap, TableFlags, WriteFlags};

use common::{AuditRecord, CacheEntry, ImageFingerprint};

use crate::error::StorageResult;
use crate::traits::{FeatureStore, PutOutcome};

const RESULTS_TABLE: &str = "image_results";
const LOG_TABLE: &str = "request_log";
const MAX_TABLES: u64 = 4;

pub struct MdbxFeatureStore {
    db: Database<NoWriteMap>,
    path: PathBuf,
    log_seq: AtomicU64,
}

impl MdbxFeatureStore {
    /// Open (or create) the store in the directory at `path`.
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let path = path.as_ref();
        common::platform::ensure_db_directory(path)?;

        let mut options = DatabaseOptions::default();
        options.max_tables = Some(MAX_TABLES);
        let db = Database::<NoWriteMap>::open_with_options(path, options)?;

        {
            let txn = db.begin_rw_txn()?;
            txn.create_table(Some(RESULTS_TABLE), TableFlags::empty())?;
            txn.create_table(Some(LOG_TABLE), TableFlags::empty())?;
            txn.commit()?;
        }

        tracing::info!(path = %path.display(), "libmdbx feature store opened");

        Ok(Self {
            db,
            path: path.to_path_buf(),
            log_seq: AtomicU64::new(0),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn log_key(&self, record: &AuditRecord) -> [u8; 16] {
        let millis = record.timestamp.timestamp_millis().max(0) as u64;
        let seq = self.log_seq.fetch_add(1, Ordering::Relaxed);

        let mut key = [0u8; 16];
        key[..8].copy_from_slice(&millis.to_be_bytes());
        key[8..].copy_from_slice(&seq.to_be_bytes());
        key
    }
}

impl FeatureStore for MdbxFeatureStore {
    fn get(&self, fingerprint: &ImageFingerprint) -> StorageResult<Option<CacheEntry>> {
        let txn = self.db.begin_ro_txn()?;
        let table = txn.open_table(Some(RESULTS_TABLE))?;

        let entry = match txn.get::<Cow<'_, [u8]>>(&table, fingerprint.as_str().as_bytes())? {
            Some(bytes) => Some(serde_json::from_slice::<CacheEntry>(&bytes)?),
            None => None,
        };
        Ok(entry)
    }

    fn put(&self, entry: &CacheEntry) -> StorageResult<PutOutcome> {
        let key = entry.fingerprint.as_str().as_bytes();
        let bytes = serde_json::to_vec(entry)?;

        let txn = self.db.begin_rw_txn()?;
        let table = txn.open_table(Some(RESULTS_TABLE))?;

        // Check and write inside one write transaction so racing writers
        // cannot both observe a miss.
        if txn.get::<Cow<'_, [u8]>>(&table, key)?.is_some() {
            return Ok(PutOutcome::AlreadyPresent);
        }

        txn.put(&table, key, bytes.as_slice(), WriteFlags::empty())?;
        txn.commit()?;
        Ok(PutOutcome::Inserted)
    }

    fn log(&self, record: &AuditRecord) -> StorageResult<()> {
        let key = self.log_key(record);
        let bytes = serde_json::to_vec(record)?;

        let txn = self.db.begin_rw_txn()?;
        let table = txn.open_table(Some(LOG_TABLE))?;
        txn.put(&table, key, bytes.as_slice(), WriteFlags::empty())?;
        txn.commit()?;
        Ok(())
    }

    fn recent_logs(&self, limit: usize) -> StorageResult<Vec<AuditRecord>> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let txn = self.db.begin_ro_txn()?;
        let table = txn.open_table(Some(LOG_TABLE))?;
        let mut cursor = txn.cursor(&table)?;

        // Newest first from the end of the table, then restore key order.
        let mut newest_first = Vec::with_capacity(limit);
        let mut item = cursor.last::<Cow<'_, [u8]>, Cow<'_, [u8]>>()?;
        while let Some((key, value)) = item {
            match serde_json::from_slice::<AuditRecord>(&value) {
                Ok(record) => newest_first.push(record),
                Err(e) => {
                    tracing::warn!(key = ?key.as_ref(), error = %e, "Skipping unreadable request log record");
                }
            }
            if newest_first.len() == limit {
                break;
            }
            item = cursor.prev::<Cow<'_, [u8]>, Cow<'_, [u8]>>()?;
        }

        newest_first.reverse();
        Ok(newest_first)
    }

    fn backend_name(&self) -> &'static str {
        "libmdbx"
    }
}
