//! Validation issues recorded for cells the rules could not normalize.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Why a cell failed its column's rule set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IssueKind {
    UnparseableDate,
    InvalidCurrency,
    InvalidPhone,
    InvalidPercentage,
    InvalidIdentifierPattern,
    /// Number outside the column bounds, or value outside a categorical set.
    OutOfRange,
    EmptyRequired,
    InvalidEmail,
    /// Non-numeric value in a numeric column.
    InvalidNumber,
}

impl IssueKind {
    /// Get a human-readable label (also the serialized form).
    pub fn label(&self) -> &'static str {
        match self {
            IssueKind::UnparseableDate => "unparseable-date",
            IssueKind::InvalidCurrency => "invalid-currency",
            IssueKind::InvalidPhone => "invalid-phone",
            IssueKind::InvalidPercentage => "invalid-percentage",
            IssueKind::InvalidIdentifierPattern => "invalid-identifier-pattern",
            IssueKind::OutOfRange => "out-of-range",
            IssueKind::EmptyRequired => "empty-required",
            IssueKind::InvalidEmail => "invalid-email",
            IssueKind::InvalidNumber => "invalid-number",
        }
    }
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A cell that failed its column's rules. Cleared once a fix is applied.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ValidationIssue {
    /// Zero-based data row.
    pub row_index: usize,
    /// Canonical column the cell belongs to.
    pub canonical_column: String,
    /// Failure category.
    pub issue_kind: IssueKind,
    /// The cell as uploaded.
    pub raw_value: String,
    /// Best partial transformation left in the cleaned table.
    pub partial_value: String,
}

impl ValidationIssue {
    /// Create a new issue.
    pub fn new(
        row_index: usize,
        canonical_column: impl Into<String>,
        issue_kind: IssueKind,
        raw_value: impl Into<String>,
        partial_value: impl Into<String>,
    ) -> Self {
        Self {
            row_index,
            canonical_column: canonical_column.into(),
            issue_kind,
            raw_value: raw_value.into(),
            partial_value: partial_value.into(),
        }
    }

    /// Whether this issue is about the given cell.
    pub fn is_at(&self, row_index: usize, canonical_column: &str) -> bool {
        self.row_index == row_index && self.canonical_column == canonical_column
    }
}
