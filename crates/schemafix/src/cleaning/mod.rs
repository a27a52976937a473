//! Deterministic cleaning rule engine.
//!
//! Each canonical column's [`ExpectedFormat`](crate::schema::ExpectedFormat)
//! selects a fixed sequence of idempotent [`RuleStep`]s. Cells that fail keep
//! their best partial value and become [`ValidationIssue`]s; the engine never
//! aborts on a bad cell.

mod engine;
mod issue;
mod rules;

pub use engine::{CleanReport, CleanResult, ColumnMetrics, QualityMetrics, RuleEngine};
pub use issue::{IssueKind, ValidationIssue};
pub use rules::{
    clean_value, format_number, CellFailure, CellOutcome, RuleContext, RuleStep, ISO_DATE,
};
