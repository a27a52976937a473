//! Rule engine: applies each mapped column's rule set to the uploaded table.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace};

use super::issue::{IssueKind, ValidationIssue};
use super::rules::{clean_value, CellOutcome, RuleContext};
use crate::config::CleaningConfig;
use crate::error::{Result, SchemafixError};
use crate::input::DataTable;
use crate::mapping::MappingReport;
use crate::schema::{CanonicalColumn, SchemaRegistry};

/// Null and uniqueness counts for one column.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ColumnMetrics {
    pub null_count: usize,
    pub unique_count: usize,
}

/// Table-level data quality metrics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QualityMetrics {
    pub total_rows: usize,
    pub total_cells: usize,
    pub null_cells: usize,
    /// Null cells as a percentage of all cells.
    pub null_percentage: f64,
    pub duplicate_rows: usize,
    pub columns: IndexMap<String, ColumnMetrics>,
}

impl QualityMetrics {
    /// Measure a table.
    pub fn of(table: &DataTable) -> Self {
        let mut columns = IndexMap::new();
        let mut null_cells = 0;

        for (i, header) in table.headers.iter().enumerate() {
            let mut unique = HashSet::new();
            let mut nulls = 0;
            for value in table.column_values(i) {
                if DataTable::is_null_value(value) {
                    nulls += 1;
                } else {
                    unique.insert(value);
                }
            }
            null_cells += nulls;
            columns.insert(
                header.clone(),
                ColumnMetrics {
                    null_count: nulls,
                    unique_count: unique.len(),
                },
            );
        }

        let total_cells = table.cell_count();
        let null_percentage = if total_cells == 0 {
            0.0
        } else {
            null_cells as f64 / total_cells as f64 * 100.0
        };

        Self {
            total_rows: table.row_count(),
            total_cells,
            null_cells,
            null_percentage,
            duplicate_rows: table.duplicate_row_count(),
            columns,
        }
    }
}

/// Summary of one cleaning pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CleanReport {
    /// Metrics of the uploaded table.
    pub before: QualityMetrics,
    /// Metrics of the cleaned table.
    pub after: QualityMetrics,
    /// Canonical columns whose rule sets ran.
    pub columns_cleaned: usize,
    /// Cells whose value changed.
    pub cells_changed: usize,
    /// Issue counts by kind.
    pub issues_by_kind: IndexMap<IssueKind, usize>,
}

/// Output of [`RuleEngine::clean`].
#[derive(Debug, Clone, PartialEq)]
pub struct CleanResult {
    /// Canonical columns (schema order) followed by kept extra columns.
    pub table: DataTable,
    /// Issues for the columns that were cleaned in this pass.
    pub issues: Vec<ValidationIssue>,
    /// Canonical columns cleaned in this pass.
    pub cleaned_columns: Vec<String>,
    pub report: CleanReport,
}

/// Where an output column's values come from.
enum OutputColumn<'a> {
    Canonical {
        column: &'a CanonicalColumn,
        source_index: usize,
    },
    Extra {
        name: String,
        source_index: usize,
    },
}

/// Applies rule sets to mapped columns. Never fails on a single cell.
pub struct RuleEngine {
    registry: Arc<SchemaRegistry>,
    config: CleaningConfig,
}

impl RuleEngine {
    /// Create an engine with default cleaning policies.
    pub fn new(registry: Arc<SchemaRegistry>) -> Self {
        Self {
            registry,
            config: CleaningConfig::default(),
        }
    }

    /// Use custom cleaning policies.
    pub fn with_config(mut self, config: CleaningConfig) -> Self {
        self.config = config;
        self
    }

    /// Get the registry.
    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    /// Clean every mapped column.
    pub fn clean(&self, source: &DataTable, mapping: &MappingReport) -> Result<CleanResult> {
        self.reclean(source, mapping, None, &[], &AtomicBool::new(false))
    }

    /// Clean with a cancellation flag checked between columns.
    pub fn clean_cancellable(
        &self,
        source: &DataTable,
        mapping: &MappingReport,
        cancel: &AtomicBool,
    ) -> Result<CleanResult> {
        self.reclean(source, mapping, None, &[], cancel)
    }

    /// Rebuild the cleaned table after a mapping change.
    ///
    /// Canonical columns listed in `affected`, and any not present in
    /// `previous`, are cleaned from the source. Every other column is copied
    /// from `previous` so applied fixes survive. Issues are returned only for
    /// the re-cleaned columns.
    pub fn reclean(
        &self,
        source: &DataTable,
        mapping: &MappingReport,
        previous: Option<&DataTable>,
        affected: &[String],
        cancel: &AtomicBool,
    ) -> Result<CleanResult> {
        let layout = self.layout(source, mapping)?;
        let row_count = source.row_count();

        let mut headers = Vec::with_capacity(layout.len());
        let mut columns: Vec<Vec<String>> = Vec::with_capacity(layout.len());
        let mut issues = Vec::new();
        let mut cleaned_columns = Vec::new();
        let mut cells_changed = 0;

        for output in &layout {
            if cancel.load(Ordering::SeqCst) {
                return Err(SchemafixError::Cancelled(String::new()));
            }

            match output {
                OutputColumn::Canonical {
                    column,
                    source_index,
                } => {
                    let reusable = previous
                        .filter(|_| !affected.contains(&column.name))
                        .and_then(|prev| prev.column_by_name(&column.name));

                    headers.push(column.name.clone());
                    if let Some(values) = reusable {
                        columns.push(values.into_iter().map(str::to_string).collect());
                        continue;
                    }

                    let (values, column_issues, changed) =
                        self.clean_column(source, column, *source_index);
                    debug!(
                        column = %column.name,
                        format = column.expected_format.label(),
                        issues = column_issues.len(),
                        changed,
                        "cleaned column"
                    );
                    cells_changed += changed;
                    issues.extend(column_issues);
                    cleaned_columns.push(column.name.clone());
                    columns.push(values);
                }
                OutputColumn::Extra { name, source_index } => {
                    headers.push(name.clone());
                    columns.push(
                        source
                            .column_values(*source_index)
                            .map(str::to_string)
                            .collect(),
                    );
                }
            }
        }

        let rows: Vec<Vec<String>> = (0..row_count)
            .map(|r| columns.iter().map(|col| col[r].clone()).collect())
            .collect();
        let table = DataTable::new(headers, rows, source.delimiter);

        let mut issues_by_kind = IndexMap::new();
        for issue in &issues {
            *issues_by_kind.entry(issue.issue_kind).or_insert(0) += 1;
        }
        issues_by_kind.sort_keys();

        let report = CleanReport {
            before: QualityMetrics::of(source),
            after: QualityMetrics::of(&table),
            columns_cleaned: cleaned_columns.len(),
            cells_changed,
            issues_by_kind,
        };

        info!(
            columns = report.columns_cleaned,
            cells_changed,
            issues = issues.len(),
            "cleaning complete"
        );

        Ok(CleanResult {
            table,
            issues,
            cleaned_columns,
            report,
        })
    }

    /// Run a canonical column's rule set on one value.
    pub fn clean_cell(&self, column: &CanonicalColumn, raw: &str) -> CellOutcome {
        let ctx = RuleContext {
            column,
            pattern: self.registry.pattern(&column.name),
            config: &self.config,
        };
        clean_value(&ctx, raw)
    }

    /// Clean one value, failing with [`SchemafixError::CellTransformFailure`].
    pub fn validate_value(&self, canonical: &str, row: usize, raw: &str) -> Result<String> {
        let column = self
            .registry
            .get(canonical)
            .ok_or_else(|| SchemafixError::UnknownColumn(canonical.to_string()))?;

        self.clean_cell(column, raw)
            .map_err(|failure| SchemafixError::CellTransformFailure {
                row,
                column: canonical.to_string(),
                kind: failure.kind,
            })
    }

    fn clean_column(
        &self,
        source: &DataTable,
        column: &CanonicalColumn,
        source_index: usize,
    ) -> (Vec<String>, Vec<ValidationIssue>, usize) {
        let mut values = Vec::with_capacity(source.row_count());
        let mut issues = Vec::new();
        let mut changed = 0;

        for (row, raw) in source.column_values(source_index).enumerate() {
            let value = match self.clean_cell(column, raw) {
                Ok(clean) => clean,
                Err(failure) => {
                    trace!(row, column = %column.name, value = raw, kind = %failure.kind, "cell failed");
                    issues.push(ValidationIssue::new(
                        row,
                        &column.name,
                        failure.kind,
                        raw,
                        &failure.partial,
                    ));
                    failure.partial
                }
            };
            if value != raw {
                changed += 1;
            }
            values.push(value);
        }

        (values, issues, changed)
    }

    fn layout<'a>(
        &'a self,
        source: &DataTable,
        mapping: &MappingReport,
    ) -> Result<Vec<OutputColumn<'a>>> {
        let mut layout = Vec::new();

        for column in self.registry.columns() {
            let Some(entry) = mapping.for_canonical(&column.name) else {
                continue;
            };
            let source_index = source
                .column_index(&entry.source_column)
                .ok_or_else(|| SchemafixError::UnknownColumn(entry.source_column.clone()))?;
            layout.push(OutputColumn::Canonical {
                column,
                source_index,
            });
        }

        for name in mapping.extra() {
            let source_index = source
                .column_index(name)
                .ok_or_else(|| SchemafixError::UnknownColumn(name.to_string()))?;
            layout.push(OutputColumn::Extra {
                name: name.to_string(),
                source_index,
            });
        }

        Ok(layout)
    }
}
