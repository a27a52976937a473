//! Cleaning engine benchmarks.
//!
//! Measures full-table cleaning across row counts with a mix of clean and
//! messy cells in every format of the built-in schema.

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use schemafix::{ColumnMapper, DataTable, RuleEngine, SchemaRegistry};

const HEADERS: &[&str] = &[
    "order_id",
    "order_date",
    "customer_id",
    "email",
    "phone",
    "unit_price",
    "currency",
    "tax_pct",
    "quantity",
];

/// Generate rows where every third row carries a value needing repair.
fn generate_orders(rows: usize) -> DataTable {
    let data = (0..rows)
        .map(|row| {
            let messy = row % 3 == 0;
            vec![
                format!("ord-{}", row),
                if messy {
                    format!("{:02}/{:02}/2024", (row % 12) + 1, (row % 28) + 1)
                } else {
                    format!("2024-{:02}-{:02}", (row % 12) + 1, (row % 28) + 1)
                },
                format!("CUST-{}", row % 500),
                if messy {
                    format!(" User{}@Example.COM ", row)
                } else {
                    format!("user{}@example.com", row)
                },
                format!("98765 {:05}", row % 100_000),
                if messy {
                    format!("Rs. {},{:03}.50", row % 90 + 1, row % 1000)
                } else {
                    format!("{}.00", row % 5000)
                },
                if messy { "inr" } else { "USD" }.to_string(),
                if messy { "18%" } else { "0.05" }.to_string(),
                if row % 50 == 0 { "n/a".to_string() } else { (row % 9 + 1).to_string() },
            ]
        })
        .collect();

    DataTable::new(HEADERS.iter().map(|h| h.to_string()).collect(), data, b',')
}

fn bench_clean_table(c: &mut Criterion) {
    let registry = Arc::new(SchemaRegistry::builtin().unwrap());
    let engine = RuleEngine::new(registry.clone());
    let mapper = ColumnMapper::new(registry);
    let mut group = c.benchmark_group("clean_table");

    for rows in [100, 1_000, 10_000].iter() {
        let table = generate_orders(*rows);
        let mapping = mapper.map_table(&table);

        group.throughput(Throughput::Elements(table.cell_count() as u64));
        group.bench_with_input(BenchmarkId::new("rows", rows), &table, |b, table| {
            b.iter(|| black_box(engine.clean(table, &mapping).unwrap()))
        });
    }

    group.finish();
}

fn bench_clean_cell(c: &mut Criterion) {
    let registry = Arc::new(SchemaRegistry::builtin().unwrap());
    let engine = RuleEngine::new(registry.clone());
    let mut group = c.benchmark_group("clean_cell");

    for (column, raw) in [
        ("order_date", "14-Mar-2024"),
        ("unit_price", "Rs. 1,00,000"),
        ("phone", "+91 (987) 654-3210"),
        ("tax_id", "29abcde1234f1z5"),
    ] {
        let canonical = registry.get(column).unwrap().clone();
        group.bench_function(column, |b| {
            b.iter(|| black_box(engine.clean_cell(&canonical, black_box(raw))))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_clean_table, bench_clean_cell);
criterion_main!(benches);
