//! Fuzz target for the delimited-text parser.
//!
//! The parser must never panic on malformed input, whatever delimiter it
//! sniffs, and a parsed table must map without panicking.

#![no_main]

use std::io::Write;
use std::sync::Arc;

use libfuzzer_sys::fuzz_target;
use schemafix::{ColumnMapper, Parser, SchemaRegistry};

fuzz_target!(|data: &[u8]| {
    // Only process reasonable-sized inputs to avoid OOM
    if data.len() > 100_000 {
        return;
    }

    let parser = Parser::new();
    if let Ok(table) = parser.parse_bytes(data) {
        if let Ok(registry) = SchemaRegistry::builtin() {
            let _ = ColumnMapper::new(Arc::new(registry)).map_table(&table);
        }
    }

    if let Ok(mut temp_file) = tempfile::NamedTempFile::new() {
        if temp_file.write_all(data).is_ok() {
            let _ = parser.parse_file(temp_file.path());
        }
    }
});
