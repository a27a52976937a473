//! Fuzz target for the cleaning rule sets.
//!
//! Every format must accept any UTF-8 input without panicking, and cleaning
//! its own output must not change it.

#![no_main]

use std::sync::Arc;

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use schemafix::{RuleEngine, SchemaRegistry};

#[derive(Debug, Arbitrary)]
struct Input {
    column: u8,
    raw: String,
}

fuzz_target!(|input: Input| {
    if input.raw.len() > 10_000 {
        return;
    }

    let Ok(registry) = SchemaRegistry::builtin() else {
        return;
    };
    let registry = Arc::new(registry);
    let engine = RuleEngine::new(registry.clone());
    let Some(column) = registry.columns().nth(input.column as usize % registry.len()) else {
        return;
    };

    let settle = |raw: &str| match engine.clean_cell(column, raw) {
        Ok(value) => value,
        Err(failure) => failure.partial,
    };

    let once = settle(&input.raw);
    let twice = settle(&once);
    assert_eq!(once, twice, "{} not idempotent on {:?}", column.name, input.raw);
});
