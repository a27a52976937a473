//! Fix suggestion types.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cleaning::ValidationIssue;
use crate::error::{Result, SchemafixError};
use crate::learning::IssueSignature;

/// Where a suggested value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FixSource {
    /// Served from the learning store.
    Learned,
    /// Produced by a deterministic repair or the suggestion capability.
    Generated,
}

impl FixSource {
    /// Get a human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            FixSource::Learned => "learned",
            FixSource::Generated => "generated",
        }
    }
}

impl fmt::Display for FixSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Review state of a suggestion. Leaves `Pending` exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FixStatus {
    Pending,
    Applied,
    Rejected,
    /// Applied and written to the learning store.
    Promoted,
}

impl FixStatus {
    /// Get a human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            FixStatus::Pending => "pending",
            FixStatus::Applied => "applied",
            FixStatus::Rejected => "rejected",
            FixStatus::Promoted => "promoted",
        }
    }

    /// Whether the suggested value ended up in the table.
    pub fn is_applied(&self) -> bool {
        matches!(self, FixStatus::Applied | FixStatus::Promoted)
    }
}

impl fmt::Display for FixStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A proposed value for one open validation issue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixSuggestion {
    /// Identifier, unique within a session.
    pub id: String,

    pub issue_signature: IssueSignature,

    /// Row of the issue this suggestion was made for.
    pub row_index: usize,

    pub canonical_column: String,

    pub raw_value: String,

    /// Proposed replacement; `None` when no proposal could be made.
    pub suggested_value: Option<String>,

    /// Confidence in this suggestion (0.0-1.0).
    pub confidence: f64,

    pub source: FixSource,

    pub status: FixStatus,

    /// Human-readable rationale for the suggestion.
    pub rationale: String,

    /// Value written by the decision, when applied.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub applied_value: Option<String>,

    /// When this suggestion was generated.
    pub suggested_at: DateTime<Utc>,
}

impl FixSuggestion {
    /// Create a pending suggestion for an issue.
    pub fn new(issue: &ValidationIssue, source: FixSource) -> Self {
        Self {
            id: String::new(),
            issue_signature: IssueSignature::from_issue(issue),
            row_index: issue.row_index,
            canonical_column: issue.canonical_column.clone(),
            raw_value: issue.raw_value.clone(),
            suggested_value: None,
            confidence: 0.0,
            source,
            status: FixStatus::Pending,
            rationale: String::new(),
            applied_value: None,
            suggested_at: Utc::now(),
        }
    }

    /// Set the id.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Set the proposed value.
    pub fn with_value(mut self, value: Option<String>) -> Self {
        self.suggested_value = value;
        self
    }

    /// Set confidence, clamped to [0, 1].
    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence.clamp(0.0, 1.0);
        self
    }

    /// Set the rationale.
    pub fn with_rationale(mut self, rationale: impl Into<String>) -> Self {
        self.rationale = rationale.into();
        self
    }

    /// Whether the suggestion still awaits a decision.
    pub fn is_pending(&self) -> bool {
        self.status == FixStatus::Pending
    }

    /// Record a human decision.
    ///
    /// `value` is what gets written for applied/promoted decisions.
    pub fn resolve(&mut self, status: FixStatus, value: Option<String>) -> Result<()> {
        if !self.is_pending() {
            return Err(SchemafixError::Config(format!(
                "Suggestion '{}' was already {}",
                self.id, self.status
            )));
        }
        if status == FixStatus::Pending {
            return Err(SchemafixError::Config(
                "A decision cannot leave a suggestion pending".to_string(),
            ));
        }
        self.status = status;
        self.applied_value = if status.is_applied() { value } else { None };
        Ok(())
    }
}

/// Format the n-th suggestion id (1-based).
pub fn suggestion_id(n: usize) -> String {
    format!("sug_{:03}", n)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cleaning::IssueKind;

    fn issue() -> ValidationIssue {
        ValidationIssue::new(4, "currency", IssueKind::OutOfRange, "Rs", "RS")
    }

    #[test]
    fn test_create_suggestion() {
        let sug = FixSuggestion::new(&issue(), FixSource::Learned)
            .with_id(suggestion_id(1))
            .with_value(Some("INR".to_string()))
            .with_confidence(1.4);

        assert_eq!(sug.id, "sug_001");
        assert_eq!(sug.row_index, 4);
        assert_eq!(sug.confidence, 1.0);
        assert!(sug.is_pending());
        assert_eq!(sug.issue_signature.pattern, "rs");
    }

    #[test]
    fn test_resolve_once() {
        let mut sug = FixSuggestion::new(&issue(), FixSource::Generated);
        sug.resolve(FixStatus::Promoted, Some("INR".to_string())).unwrap();
        assert_eq!(sug.status, FixStatus::Promoted);
        assert_eq!(sug.applied_value.as_deref(), Some("INR"));

        assert!(sug.resolve(FixStatus::Rejected, None).is_err());
        assert_eq!(sug.status, FixStatus::Promoted);
    }

    #[test]
    fn test_reject_keeps_no_value() {
        let mut sug = FixSuggestion::new(&issue(), FixSource::Generated);
        sug.resolve(FixStatus::Rejected, Some("INR".to_string())).unwrap();
        assert!(sug.applied_value.is_none());
        assert!(!sug.status.is_applied());
    }

    #[test]
    fn test_labels() {
        assert_eq!(FixSource::Learned.label(), "learned");
        assert_eq!(FixStatus::Promoted.to_string(), "promoted");
    }
}
