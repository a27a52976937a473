//! Example: Run a file through the whole pipeline with a scripted capability.
//!
//! Usage:
//!   cargo run --example clean_orders -- <file_path>

use std::env;
use std::path::Path;
use std::sync::Arc;

use schemafix::{FixDecision, MockCapability, Pipeline, SchemaRegistry};

fn main() -> schemafix::Result<()> {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: cargo run --example clean_orders -- <file_path>");
        std::process::exit(1);
    }

    let path = Path::new(&args[1]);
    if !path.exists() {
        eprintln!("Error: File not found: {}", path.display());
        std::process::exit(1);
    }

    let capability = Arc::new(MockCapability::new().with_fix("order_date", "yesterday", "2024-03-13", 0.6));
    let pipeline = Pipeline::new(Arc::new(SchemaRegistry::builtin()?))
        .with_suggestion_capability(capability);

    let separator = "=".repeat(80);
    println!("{}", separator);
    println!("schemafix: {}", path.display());
    println!("{}", separator);
    println!();

    let id = pipeline.upload_file(path)?;

    let mapping = pipeline.map(&id)?;
    println!("## Mapping");
    for m in &mapping.mappings {
        println!(
            "  {:24} -> {:20} {:8} {:.2}",
            m.source_column,
            m.canonical_column.as_deref().unwrap_or("-"),
            m.mapping_type.label(),
            m.confidence
        );
    }
    println!();

    let report = pipeline.clean(&id)?;
    println!("## Cleaning");
    println!("  Cells changed: {}", report.cells_changed);
    for (kind, count) in &report.issues_by_kind {
        println!("  {:28} {}", kind.label(), count);
    }
    println!();

    let suggestions = pipeline.suggest(&id)?;
    println!("## Suggestions ({})", suggestions.len());
    for s in &suggestions {
        println!(
            "  {} row {:<4} {:16} {:?} -> {:?} ({:.2}, {})",
            s.id,
            s.row_index + 1,
            s.canonical_column,
            s.raw_value,
            s.suggested_value,
            s.confidence,
            s.source
        );
    }
    println!();

    // Accept every suggestion that carries a value
    let mut seen = Vec::new();
    for s in suggestions.iter().filter(|s| s.suggested_value.is_some()) {
        if !seen.contains(&s.issue_signature) {
            pipeline.apply_fix(&id, &s.issue_signature, FixDecision::accept())?;
            seen.push(s.issue_signature.clone());
        }
    }

    let summary = pipeline.summary(&id)?;
    println!("## Summary");
    println!("  Stage: {}", summary.stage);
    println!("  Open issues: {}", summary.open_issues);
    println!("  Applied fixes: {}", summary.applied_fixes);
    println!("  Data quality: {:.0}%", summary.data_quality_score * 100.0);
    println!("  {}", summary.recommendation);

    Ok(())
}
