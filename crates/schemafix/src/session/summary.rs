//! Session summaries.

use std::collections::HashSet;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::session::Session;
use super::stage::Stage;
use crate::cleaning::IssueKind;
use crate::input::DataTable;
use crate::suggestion::{FixSource, FixStatus};

/// Counts describing where a session stands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingSummary {
    pub session_id: String,
    pub stage: Stage,
    pub total_rows: usize,
    pub total_columns: usize,
    /// Source columns with a canonical target.
    pub mapped_columns: usize,
    /// Canonical columns with no source.
    pub unmapped_columns: usize,
    /// Source columns with no target, kept in the output.
    pub extra_columns: usize,
    pub ambiguous_columns: usize,
    /// Required canonical columns with no source; finalize fails while non-empty.
    pub missing_required: Vec<String>,
    /// Canonical columns whose rule sets ran.
    pub rules_applied: usize,
    pub cells_changed: usize,
    pub open_issues: usize,
    pub issues_by_kind: IndexMap<IssueKind, usize>,
    pub suggestions_by_status: IndexMap<FixStatus, usize>,
    pub suggestions_by_source: IndexMap<FixSource, usize>,
    /// Suggestions whose value was written into the table.
    pub applied_fixes: usize,
    /// Share of output cells that are filled and free of open issues (0.0-1.0).
    pub data_quality_score: f64,
    /// Human-readable next step.
    pub recommendation: String,
}

impl ProcessingSummary {
    /// Summarize a session.
    pub fn of(session: &Session, missing_required: Vec<String>) -> Self {
        let mapping = session.mapping.as_ref();

        let mut issues_by_kind = IndexMap::new();
        for issue in &session.issues {
            *issues_by_kind.entry(issue.issue_kind).or_insert(0) += 1;
        }
        issues_by_kind.sort_keys();

        let mut suggestions_by_status = IndexMap::new();
        let mut suggestions_by_source = IndexMap::new();
        for suggestion in &session.suggestions {
            *suggestions_by_status.entry(suggestion.status).or_insert(0) += 1;
            *suggestions_by_source.entry(suggestion.source).or_insert(0) += 1;
        }
        suggestions_by_status.sort_keys();
        suggestions_by_source.sort_keys();

        let applied_fixes = session
            .suggestions
            .iter()
            .filter(|s| s.status.is_applied())
            .count();

        let table = session.cleaned.as_ref().unwrap_or(&session.source);
        let data_quality_score = quality_score(table, session);

        let mut summary = Self {
            session_id: session.id.clone(),
            stage: session.stage,
            total_rows: session.source.row_count(),
            total_columns: session.source.column_count(),
            mapped_columns: mapping.map_or(0, |m| m.mapped().count()),
            unmapped_columns: mapping.map_or(0, |m| m.missing.len()),
            extra_columns: mapping.map_or(0, |m| m.extra().len()),
            ambiguous_columns: mapping.map_or(0, |m| m.ambiguous.len()),
            missing_required,
            rules_applied: session.clean_report.as_ref().map_or(0, |r| r.columns_cleaned),
            cells_changed: session.clean_report.as_ref().map_or(0, |r| r.cells_changed),
            open_issues: session.issues.len(),
            issues_by_kind,
            suggestions_by_status,
            suggestions_by_source,
            applied_fixes,
            data_quality_score,
            recommendation: String::new(),
        };
        summary.recommendation = summary.recommend();
        summary
    }

    fn recommend(&self) -> String {
        match self.stage {
            Stage::Uploaded => "Map the columns onto the schema.".to_string(),
            Stage::Mapped if self.ambiguous_columns > 0 => format!(
                "Resolve {} ambiguous column(s) before cleaning.",
                self.ambiguous_columns
            ),
            Stage::Mapped => "Clean the mapped columns.".to_string(),
            Stage::Finalized => "Finalized; the cleaned table is ready.".to_string(),
            _ if !self.missing_required.is_empty() => format!(
                "Assign the required column(s) {} before finalizing.",
                self.missing_required.join(", ")
            ),
            Stage::Suggested if self.suggestions_by_status.contains_key(&FixStatus::Pending) => {
                "Review the pending suggestions.".to_string()
            }
            _ if self.open_issues > 0 => format!(
                "{} open issue(s); request suggestions or finalize as is.",
                self.open_issues
            ),
            _ => "No open issues; ready to finalize.".to_string(),
        }
    }
}

fn quality_score(table: &DataTable, session: &Session) -> f64 {
    let total = table.cell_count();
    if total == 0 {
        return 1.0;
    }

    let flagged: HashSet<(usize, Option<usize>)> = session
        .issues
        .iter()
        .map(|i| (i.row_index, table.column_index(&i.canonical_column)))
        .collect();

    let mut bad = flagged.len();
    for (row_index, row) in table.rows.iter().enumerate() {
        for (col, value) in row.iter().enumerate() {
            if DataTable::is_null_value(value) && !flagged.contains(&(row_index, Some(col))) {
                bad += 1;
            }
        }
    }

    (1.0 - bad as f64 / total as f64).clamp(0.0, 1.0)
}
