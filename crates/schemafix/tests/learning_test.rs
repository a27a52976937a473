//! Integration tests for the fix learning store on disk.

use std::sync::Arc;
use std::thread;

use tempfile::TempDir;

use schemafix::{FileStore, IssueKind, IssueSignature, KeyValueStore, LearningStore};

fn open_store(dir: &TempDir) -> LearningStore {
    let backend: Arc<dyn KeyValueStore> = Arc::new(FileStore::open(dir.path()).unwrap());
    LearningStore::open(backend).unwrap()
}

// =============================================================================
// Persistence Tests
// =============================================================================

#[test]
fn test_promoted_fix_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let signature = IssueSignature::new("currency", IssueKind::OutOfRange, " Rs ");

    {
        let store = open_store(&dir);
        store.promote(&signature, "INR", Some("sess_1")).unwrap();
    }

    let store = open_store(&dir);
    let fix = store
        .lookup(&IssueSignature::new("currency", IssueKind::OutOfRange, "rs"))
        .expect("learned fix should be reloaded");
    assert_eq!(fix.resolution, "INR");
    assert_eq!(fix.occurrences, 1);
    assert_eq!(fix.promoted_by.as_deref(), Some("sess_1"));
}

#[test]
fn test_last_promotion_wins() {
    let dir = TempDir::new().unwrap();
    let signature = IssueSignature::new("order_date", IssueKind::UnparseableDate, "yesterday");

    let store = open_store(&dir);
    store.promote(&signature, "2024-03-13", None).unwrap();
    store.promote(&signature, "2024-03-12", None).unwrap();

    let reopened = open_store(&dir);
    let fix = reopened.lookup(&signature).unwrap();
    assert_eq!(fix.resolution, "2024-03-12");
    assert_eq!(fix.occurrences, 2);
    assert!(fix.last_promoted >= fix.first_promoted);
}

// =============================================================================
// Concurrency Tests
// =============================================================================

#[test]
fn test_concurrent_promotes_to_distinct_signatures() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);

    thread::scope(|scope| {
        for i in 0..16 {
            let store = &store;
            scope.spawn(move || {
                let signature =
                    IssueSignature::new("currency", IssueKind::OutOfRange, &format!("code {}", i));
                store.promote(&signature, format!("C{}", i), None).unwrap();
            });
        }
    });

    assert_eq!(store.len(), 16);
    let reopened = open_store(&dir);
    assert_eq!(reopened.len(), 16);
    for i in 0..16 {
        let signature =
            IssueSignature::new("currency", IssueKind::OutOfRange, &format!("code {}", i));
        assert_eq!(reopened.lookup(&signature).unwrap().resolution, format!("C{}", i));
    }
}

#[test]
fn test_concurrent_promotes_to_one_signature_serialize() {
    const WRITERS: u64 = 12;

    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);
    let signature = IssueSignature::new("currency", IssueKind::OutOfRange, "Rs");

    thread::scope(|scope| {
        for i in 0..WRITERS {
            let store = &store;
            let signature = &signature;
            scope.spawn(move || {
                store.promote(signature, format!("V{}", i), None).unwrap();
            });
        }
    });

    let fix = store.lookup(&signature).unwrap();
    assert_eq!(store.len(), 1);
    assert_eq!(fix.occurrences, WRITERS);

    // the file holds whichever write landed last in memory
    let reopened = open_store(&dir).lookup(&signature).unwrap();
    assert_eq!(reopened.resolution, fix.resolution);
    assert_eq!(reopened.occurrences, WRITERS);
}
