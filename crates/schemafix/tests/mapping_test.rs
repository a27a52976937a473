//! Integration tests for the column mapper.

use std::io::Write;
use std::sync::Arc;

use tempfile::NamedTempFile;

use schemafix::mapping::SourceColumn;
use schemafix::{
    CanonicalColumn, ColumnMapper, ExpectedFormat, MappingType, MockCapability, Parser,
    SchemaRegistry, SchemafixError,
};

/// Helper to create a temporary file with given content.
fn create_test_file(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("Failed to create temp file");
    file.write_all(content.as_bytes())
        .expect("Failed to write to temp file");
    file
}

fn customer_registry() -> Arc<SchemaRegistry> {
    Arc::new(
        SchemaRegistry::new(vec![
            CanonicalColumn::new("customer_id", ExpectedFormat::FreeText),
            CanonicalColumn::new("customer_name", ExpectedFormat::FreeText),
            CanonicalColumn::new("email", ExpectedFormat::Email),
        ])
        .unwrap(),
    )
}

// =============================================================================
// Strategy Tests
// =============================================================================

#[test]
fn test_fuzzy_scenario_maps_every_column() {
    let mapper = ColumnMapper::new(customer_registry());
    let sources: Vec<SourceColumn> = ["Cust ID", "Name", "email_addr"]
        .iter()
        .map(|n| SourceColumn::new(*n))
        .collect();

    let report = mapper.map(&sources);

    for (source, target) in [
        ("Cust ID", "customer_id"),
        ("Name", "customer_name"),
        ("email_addr", "email"),
    ] {
        let mapping = report.for_source(source).unwrap();
        assert_eq!(mapping.canonical_column.as_deref(), Some(target), "{}", source);
        assert_eq!(mapping.mapping_type, MappingType::Fuzzy);
        assert!(mapping.confidence >= 0.6 && mapping.confidence < 1.0);
    }
    assert!(report.missing.is_empty());
    assert!(report.ambiguous.is_empty());
}

#[test]
fn test_exact_headers_from_file() {
    let content = "Order ID,order_date,Cust ID,E-mail,remarks\n\
                   ORD-1,2024-03-14,CUST-1,a@b.com,first\n";
    let file = create_test_file(content);
    let (table, _) = Parser::new().parse_file(file.path()).unwrap();

    let registry = Arc::new(SchemaRegistry::builtin().unwrap());
    let report = ColumnMapper::new(registry.clone()).map_table(&table);

    for (source, target) in [
        ("Order ID", "order_id"),
        ("order_date", "order_date"),
        ("Cust ID", "customer_id"),
        ("E-mail", "email"),
    ] {
        let mapping = report.for_source(source).unwrap();
        assert_eq!(mapping.canonical_column.as_deref(), Some(target));
        assert_eq!(mapping.mapping_type, MappingType::Exact);
        assert_eq!(mapping.confidence, 1.0);
    }
    assert!(report.missing_required(&registry).is_empty());
}

#[test]
fn test_mapping_is_deterministic() {
    let mapper = ColumnMapper::new(Arc::new(SchemaRegistry::builtin().unwrap()));
    let sources: Vec<SourceColumn> = ["Qty", "Cust Name", "Ship Addr", "Total", "GST Rate", "Town"]
        .iter()
        .map(|n| SourceColumn::new(*n))
        .collect();

    let first = mapper.map(&sources);
    for _ in 0..5 {
        assert_eq!(mapper.map(&sources), first);
    }
}

#[test]
fn test_canonical_column_mapped_at_most_once() {
    let mapper = ColumnMapper::new(customer_registry());
    let sources: Vec<SourceColumn> = ["email", "Email", "e mail", "customer email"]
        .iter()
        .map(|n| SourceColumn::new(*n))
        .collect();

    let report = mapper.map(&sources);
    let targets: Vec<&str> = report
        .mapped()
        .filter_map(|m| m.canonical_column.as_deref())
        .filter(|c| *c == "email")
        .collect();
    assert_eq!(targets.len(), 1);
    assert_eq!(report.for_canonical("email").unwrap().source_column, "email");
}

// =============================================================================
// Semantic and Manual Tests
// =============================================================================

#[test]
fn test_semantic_only_for_unresolved_columns() {
    let matcher = Arc::new(MockCapability::new().with_match("Kontakt", "email", 0.8));
    let mapper = ColumnMapper::new(customer_registry()).with_semantic_matcher(matcher.clone());
    let sources = vec![
        SourceColumn::new("customer_id"),
        SourceColumn::new("Kontakt").with_samples(vec!["a@b.com".to_string()]),
    ];

    let report = mapper.map(&sources);

    let kontakt = report.for_source("Kontakt").unwrap();
    assert_eq!(kontakt.canonical_column.as_deref(), Some("email"));
    assert_eq!(kontakt.mapping_type, MappingType::Semantic);
    assert_eq!(matcher.match_calls(), 1);
}

#[test]
fn test_manual_assignment_displaces_previous_holder() {
    let registry = customer_registry();
    let mapper = ColumnMapper::new(registry.clone());
    let mut report = mapper.map(&[SourceColumn::new("email"), SourceColumn::new("backup")]);

    let edit = report.assign_manual(&registry, "backup", Some("email")).unwrap();

    assert_eq!(edit.affected, vec!["email".to_string()]);
    let backup = report.for_source("backup").unwrap();
    assert_eq!(backup.mapping_type, MappingType::Manual);
    assert_eq!(backup.confidence, 1.0);
    assert!(!report.for_source("email").unwrap().is_mapped());
    assert_eq!(report.extra(), vec!["email"]);
}

#[test]
fn test_manual_assignment_rejects_unknown_target() {
    let registry = customer_registry();
    let mut report = ColumnMapper::new(registry.clone()).map(&[SourceColumn::new("x")]);

    let err = report.assign_manual(&registry, "x", Some("nope")).unwrap_err();
    assert!(matches!(err, SchemafixError::UnknownColumn(_)));
}
