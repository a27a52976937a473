//! Column mapper benchmarks.
//!
//! Measures mapping cost as the number of source columns grows, for clean
//! headers and for headers that fall through to fuzzy scoring.

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use schemafix::mapping::{name_similarity, SourceColumn};
use schemafix::{ColumnMapper, SchemaRegistry};

const MESSY_HEADERS: &[&str] = &[
    "Order No.",
    "Ordr Date",
    "Cust ID",
    "Client Nm",
    "E-mail Addr",
    "Contact Ph",
    "Bill Addr",
    "Zip",
    "Qty",
    "Unit Cost",
    "Curr",
    "GST Rate",
    "Grand Total",
    "Remarks",
];

/// Source columns built from the canonical names or from messy variants.
fn sources(registry: &SchemaRegistry, count: usize, messy: bool) -> Vec<SourceColumn> {
    (0..count)
        .map(|i| {
            let name = if messy {
                format!("{} {}", MESSY_HEADERS[i % MESSY_HEADERS.len()], i / MESSY_HEADERS.len())
            } else {
                let names: Vec<&str> = registry.names().collect();
                names[i % names.len()].to_string()
            };
            SourceColumn::new(name)
        })
        .collect()
}

fn bench_map_exact(c: &mut Criterion) {
    let registry = Arc::new(SchemaRegistry::builtin().unwrap());
    let mapper = ColumnMapper::new(registry.clone());
    let mut group = c.benchmark_group("map_exact");

    for cols in [5, 23].iter() {
        let input = sources(&registry, *cols, false);
        group.bench_with_input(BenchmarkId::new("cols", cols), &input, |b, input| {
            b.iter(|| black_box(mapper.map(input)))
        });
    }

    group.finish();
}

fn bench_map_fuzzy(c: &mut Criterion) {
    let registry = Arc::new(SchemaRegistry::builtin().unwrap());
    let mapper = ColumnMapper::new(registry.clone());
    let mut group = c.benchmark_group("map_fuzzy");

    for cols in [5, 14, 50].iter() {
        let input = sources(&registry, *cols, true);
        group.bench_with_input(BenchmarkId::new("cols", cols), &input, |b, input| {
            b.iter(|| black_box(mapper.map(input)))
        });
    }

    group.finish();
}

fn bench_name_similarity(c: &mut Criterion) {
    c.bench_function("name_similarity", |b| {
        b.iter(|| {
            black_box(name_similarity(
                black_box("Cust_Email Addr"),
                black_box("customer email address"),
            ))
        })
    });
}

criterion_group!(benches, bench_map_exact, bench_map_fuzzy, bench_name_similarity);
criterion_main!(benches);
