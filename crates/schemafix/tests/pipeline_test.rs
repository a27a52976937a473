//! End-to-end tests for the session pipeline.

use std::io::Write;
use std::sync::Arc;
use std::thread;

use tempfile::{NamedTempFile, TempDir};

use schemafix::{
    DataTable, FileStore, FixDecision, FixSource, FixStatus, FixSuggestion, IssueKind,
    IssueSignature, KeyValueStore, MockCapability, Pipeline, SchemaRegistry, SchemafixError, Stage,
};

/// Helper to create a temporary file with given content.
fn create_test_file(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("Failed to create temp file");
    file.write_all(content.as_bytes())
        .expect("Failed to write to temp file");
    file
}

const ORDERS: &str = "order_id,order_date,customer_id,currency,notes\n\
ORD-1,2024-03-14,CUST-1,Rs,asha rao\n\
ORD-2,yesterday,CUST-2,usd,\n\
ORD-3,03/15/2024,CUST-3,rs,vikram\n";

fn registry() -> Arc<SchemaRegistry> {
    Arc::new(SchemaRegistry::builtin().unwrap())
}

fn mock() -> Arc<MockCapability> {
    Arc::new(MockCapability::new().with_fix("order_date", "yesterday", "2024-03-13", 0.6))
}

fn pipeline_with(capability: &Arc<MockCapability>) -> Pipeline {
    Pipeline::new(registry()).with_suggestion_capability(capability.clone())
}

fn find<'a>(suggestions: &'a [FixSuggestion], column: &str) -> &'a FixSuggestion {
    suggestions
        .iter()
        .find(|s| s.canonical_column == column)
        .unwrap_or_else(|| panic!("no suggestion for {}", column))
}

fn cell(table: &DataTable, row: usize, column: &str) -> String {
    table
        .get(row, table.column_index(column).unwrap())
        .unwrap()
        .to_string()
}

/// Upload, map, clean and suggest; returns the session id and its suggestions.
fn run_to_suggested(pipeline: &Pipeline, content: &str) -> (String, Vec<FixSuggestion>) {
    let file = create_test_file(content);
    let id = pipeline.upload_file(file.path()).unwrap();
    pipeline.map(&id).unwrap();
    pipeline.clean(&id).unwrap();
    let suggestions = pipeline.suggest(&id).unwrap();
    (id, suggestions)
}

// =============================================================================
// Full Run
// =============================================================================

#[test]
fn test_full_run_from_file() {
    let capability = mock();
    let pipeline = pipeline_with(&capability);
    let (id, suggestions) = run_to_suggested(&pipeline, ORDERS);

    assert_eq!(pipeline.stage(&id).unwrap(), Stage::Suggested);
    // one per open issue: the date and both currency cells
    assert_eq!(suggestions.len(), 3);

    let date = find(&suggestions, "order_date");
    assert_eq!(date.suggested_value.as_deref(), Some("2024-03-13"));
    assert_eq!(date.source, FixSource::Generated);
    assert!((date.confidence - 0.6).abs() < 1e-9);

    let currency = find(&suggestions, "currency");
    assert_eq!(currency.suggested_value, None);

    let decided = pipeline
        .apply_fix(&id, &date.issue_signature, FixDecision::accept())
        .unwrap();
    assert_eq!(decided, 1);
    assert_eq!(pipeline.stage(&id).unwrap(), Stage::Suggested);

    let decided = pipeline
        .apply_fix(
            &id,
            &currency.issue_signature,
            FixDecision::Promote {
                value: Some("inr".to_string()),
            },
        )
        .unwrap();
    assert_eq!(decided, 2);
    assert_eq!(pipeline.stage(&id).unwrap(), Stage::Cleaned);

    let table = pipeline.finalize(&id).unwrap();
    assert_eq!(cell(&table, 1, "order_date"), "2024-03-13");
    assert_eq!(cell(&table, 2, "order_date"), "2024-03-15");
    assert_eq!(cell(&table, 0, "currency"), "INR");
    assert_eq!(cell(&table, 1, "currency"), "USD");
    assert_eq!(cell(&table, 2, "currency"), "INR");
    assert_eq!(pipeline.result(&id).unwrap(), table);

    let summary = pipeline.summary(&id).unwrap();
    assert_eq!(summary.stage, Stage::Finalized);
    assert_eq!(summary.open_issues, 0);
    assert_eq!(summary.applied_fixes, 3);
    assert!(summary.missing_required.is_empty());

    // finalized is terminal
    assert!(matches!(
        pipeline.suggest(&id),
        Err(SchemafixError::StateConflict { .. })
    ));
}

#[test]
fn test_promoted_fix_reused_by_next_session() {
    let capability = mock();
    let pipeline = pipeline_with(&capability);

    let (first, suggestions) = run_to_suggested(&pipeline, ORDERS);
    let currency = find(&suggestions, "currency").clone();
    pipeline
        .apply_fix(
            &first,
            &currency.issue_signature,
            FixDecision::Promote {
                value: Some("INR".to_string()),
            },
        )
        .unwrap();

    let calls_before = capability.suggest_calls();
    let (second, suggestions) = run_to_suggested(
        &pipeline,
        "order_id,order_date,customer_id,currency\nORD-9,2024-01-02,CUST-9,  RS \n",
    );

    assert_eq!(suggestions.len(), 1);
    let learned = &suggestions[0];
    assert_eq!(learned.source, FixSource::Learned);
    assert_eq!(learned.suggested_value.as_deref(), Some("INR"));
    assert!(learned.confidence >= 0.9);
    assert_eq!(capability.suggest_calls(), calls_before);

    pipeline
        .apply_fix(&second, &learned.issue_signature, FixDecision::accept())
        .unwrap();
    let table = pipeline.finalize(&second).unwrap();
    assert_eq!(cell(&table, 0, "currency"), "INR");
}

#[test]
fn test_learning_persists_across_pipelines() {
    let dir = TempDir::new().unwrap();
    let store: Arc<dyn KeyValueStore> = Arc::new(FileStore::open(dir.path()).unwrap());
    let signature = IssueSignature::new("currency", IssueKind::OutOfRange, "Rs");

    {
        let pipeline = Pipeline::new(registry()).with_store(store.clone()).unwrap();
        let (id, suggestions) = run_to_suggested(&pipeline, ORDERS);
        assert_eq!(find(&suggestions, "currency").issue_signature, signature);
        pipeline
            .apply_fix(
                &id,
                &signature,
                FixDecision::Promote {
                    value: Some("INR".to_string()),
                },
            )
            .unwrap();
    }

    let pipeline = Pipeline::new(registry()).with_store(store).unwrap();
    let fix = pipeline.learning_store().lookup(&signature).unwrap();
    assert_eq!(fix.resolution, "INR");
}

#[test]
fn test_archived_session_leaves_live_set_then_expires() {
    let dir = TempDir::new().unwrap();
    let open = || -> Arc<dyn KeyValueStore> { Arc::new(FileStore::open(dir.path()).unwrap()) };

    let id = {
        let pipeline = Pipeline::new(registry()).with_store(open()).unwrap();
        let (id, _) = run_to_suggested(&pipeline, ORDERS);
        pipeline.finalize(&id).unwrap();
        pipeline.checkpoint(&id).unwrap();
        id
    };

    // a later process archives the finalized checkpoint
    let pipeline = Pipeline::new(registry()).with_store(open()).unwrap();
    assert_eq!(pipeline.checkpoints().unwrap(), vec![id.clone()]);
    assert_eq!(pipeline.archive(&id).unwrap().stage, Stage::Finalized);
    assert!(pipeline.checkpoints().unwrap().is_empty());
    assert_eq!(pipeline.archived().unwrap(), vec![id.clone()]);

    assert!(pipeline.expire(chrono::Duration::hours(1)).unwrap().is_empty());
    assert_eq!(pipeline.expire(chrono::Duration::zero()).unwrap(), vec![id]);
    assert!(pipeline.archived().unwrap().is_empty());
}

// =============================================================================
// Re-entry
// =============================================================================

#[test]
fn test_mapping_edit_keeps_applied_fixes() {
    let capability = mock();
    let pipeline = pipeline_with(&capability);
    let (id, suggestions) = run_to_suggested(&pipeline, ORDERS);

    let date = find(&suggestions, "order_date").clone();
    pipeline
        .apply_fix(&id, &date.issue_signature, FixDecision::accept())
        .unwrap();

    let edit = pipeline
        .edit_mapping(&id, "notes", Some("customer_name"))
        .unwrap();
    assert_eq!(edit.affected, vec!["customer_name".to_string()]);

    let session = pipeline.session(&id).unwrap();
    let cleaned = session.cleaned.as_ref().unwrap();
    assert_eq!(cell(cleaned, 1, "order_date"), "2024-03-13");
    assert_eq!(cell(cleaned, 0, "customer_name"), "Asha Rao");
    assert!(cleaned.column_index("notes").is_none());

    // the currency suggestions were untouched by the edit
    assert_eq!(session.pending_suggestions().count(), 2);
    assert_eq!(session.stage, Stage::Suggested);
}

#[test]
fn test_rejected_issue_can_be_suggested_again() {
    let capability = mock();
    let pipeline = pipeline_with(&capability);
    let (id, suggestions) = run_to_suggested(&pipeline, ORDERS);

    for suggestion in [find(&suggestions, "order_date"), find(&suggestions, "currency")] {
        pipeline
            .apply_fix(&id, &suggestion.issue_signature, FixDecision::Reject)
            .unwrap();
    }
    assert_eq!(pipeline.stage(&id).unwrap(), Stage::Cleaned);

    let session = pipeline.session(&id).unwrap();
    assert_eq!(session.issues.len(), 3);
    assert!(session
        .suggestions
        .iter()
        .all(|s| s.status == FixStatus::Rejected));

    let again = pipeline.suggest(&id).unwrap();
    assert_eq!(again.len(), 3);
    assert!(again.iter().all(|s| s.is_pending()));
}

#[test]
fn test_out_of_order_calls_conflict() {
    let pipeline = Pipeline::new(registry());
    let file = create_test_file(ORDERS);
    let id = pipeline.upload_file(file.path()).unwrap();

    for result in [
        pipeline.clean(&id).map(|_| ()),
        pipeline.suggest(&id).map(|_| ()),
        pipeline.finalize(&id).map(|_| ()),
        pipeline.result(&id).map(|_| ()),
    ] {
        match result {
            Err(SchemafixError::StateConflict { current, .. }) => {
                assert_eq!(current, Stage::Uploaded)
            }
            other => panic!("expected a state conflict, got {:?}", other),
        }
    }
    assert_eq!(pipeline.stage(&id).unwrap(), Stage::Uploaded);
}

// =============================================================================
// Concurrency
// =============================================================================

#[test]
fn test_parallel_sessions() {
    let capability = mock();
    let pipeline = pipeline_with(&capability);

    let ids: Vec<String> = thread::scope(|scope| {
        let workers: Vec<_> = (0..8)
            .map(|_| {
                let pipeline = &pipeline;
                scope.spawn(move || {
                    let (id, suggestions) = run_to_suggested(pipeline, ORDERS);
                    let date = find(&suggestions, "order_date");
                    pipeline
                        .apply_fix(&id, &date.issue_signature, FixDecision::accept())
                        .unwrap();
                    id
                })
            })
            .collect();
        workers.into_iter().map(|w| w.join().unwrap()).collect()
    });

    let mut unique = ids.clone();
    unique.sort();
    unique.dedup();
    assert_eq!(unique.len(), 8);
    assert_eq!(pipeline.sessions().len(), 8);

    for id in &ids {
        let session = pipeline.session(id).unwrap();
        assert_eq!(session.stage, Stage::Suggested);
        assert_eq!(
            cell(session.cleaned.as_ref().unwrap(), 1, "order_date"),
            "2024-03-13"
        );
    }
}
