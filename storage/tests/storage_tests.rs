//! Tests for the libmdbx feature store against a real on-disk environment

use std::time::Duration;

use chrono::Utc;
use common::{AuditOutcome, AuditRecord, CacheEntry, DetectedFeatures, FeatureResult, ImageFingerprint};
use storage::{FeatureStore, MdbxFeatureStore, PutOutcome};
use tempfile::TempDir;

fn entry_for(payload: &[u8], keypoints: usize) -> CacheEntry {
    let features = DetectedFeatures {
        width: 640,
        height: 480,
        keypoints,
        descriptors: [keypoints, 64],
    };
    CacheEntry::new(FeatureResult::new(
        ImageFingerprint::of(payload),
        features,
        Utc::now(),
        Duration::from_millis(42),
    ))
}

#[test]
fn test_put_then_get() {
    println!("\n🧪 Testing put/get on libmdbx store...");

    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let store = MdbxFeatureStore::open(temp_dir.path().join("db")).expect("Failed to open store");

    let entry = entry_for(b"cat.jpg", 120);
    assert_eq!(store.put(&entry).unwrap(), PutOutcome::Inserted);

    let fetched = store
        .get(&entry.fingerprint)
        .expect("Failed to read entry")
        .expect("Entry should exist");
    assert_eq!(fetched, entry);

    let other = ImageFingerprint::of(b"dog.jpg");
    assert!(store.get(&other).unwrap().is_none());

    println!("✅ put/get works");
}

#[test]
fn test_entries_survive_reopen() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let path = temp_dir.path().join("db");
    let entry = entry_for(b"persist me", 7);

    {
        let store = MdbxFeatureStore::open(&path).expect("Failed to open store");
        store.put(&entry).unwrap();
    }

    let reopened = MdbxFeatureStore::open(&path).expect("Failed to reopen store");
    let fetched = reopened.get(&entry.fingerprint).unwrap();
    assert_eq!(fetched, Some(entry));
}

#[test]
fn test_duplicate_put_keeps_first_entry() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let store = MdbxFeatureStore::open(temp_dir.path().join("db")).unwrap();

    let first = entry_for(b"same bytes", 10);
    let second = entry_for(b"same bytes", 500);
    assert_eq!(first.fingerprint, second.fingerprint);

    assert_eq!(store.put(&first).unwrap(), PutOutcome::Inserted);
    assert_eq!(store.put(&second).unwrap(), PutOutcome::AlreadyPresent);

    let fetched = store.get(&first.fingerprint).unwrap().unwrap();
    assert_eq!(fetched.result.keypoints, 10);
}

#[test]
fn test_request_log_in_append_order() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let store = MdbxFeatureStore::open(temp_dir.path().join("db")).unwrap();

    let fp = ImageFingerprint::of(b"logged");
    let outcomes = [
        AuditOutcome::Rejected,
        AuditOutcome::Miss,
        AuditOutcome::Hit,
        AuditOutcome::Joined,
        AuditOutcome::Error,
    ];
    for outcome in outcomes {
        let fingerprint = (outcome != AuditOutcome::Rejected).then(|| fp.clone());
        store
            .log(&AuditRecord::new("/process-image", fingerprint, outcome, Duration::ZERO))
            .expect("Failed to append log record");
    }

    let all = store.recent_logs(100).unwrap();
    let seen: Vec<_> = all.iter().map(|r| r.outcome).collect();
    assert_eq!(seen, outcomes);
    assert!(all[0].fingerprint.is_none());
    assert_eq!(all[1].fingerprint.as_ref(), Some(&fp));

    let tail = store.recent_logs(2).unwrap();
    assert_eq!(tail.len(), 2);
    assert_eq!(tail[0].outcome, AuditOutcome::Joined);
    assert_eq!(tail[1].outcome, AuditOutcome::Error);

    assert!(store.recent_logs(0).unwrap().is_empty());
}

#[test]
fn test_open_creates_missing_directories() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let nested = temp_dir.path().join("a").join("b").join("db");

    let store = MdbxFeatureStore::open(&nested).expect("Failed to open nested store");
    assert!(nested.exists());
    assert_eq!(store.path(), nested.as_path());
    assert_eq!(store.backend_name(), "libmdbx");
}
