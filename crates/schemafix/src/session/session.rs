//! Per-upload session state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::stage::Stage;
use crate::cleaning::{CleanReport, ValidationIssue};
use crate::error::{Result, SchemafixError};
use crate::input::DataTable;
use crate::learning::IssueSignature;
use crate::mapping::MappingReport;
use crate::suggestion::{suggestion_id, FixStatus, FixSuggestion};

/// A human decision on the pending suggestions for one issue signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum FixDecision {
    /// Write the value into the cleaned table.
    Accept { value: Option<String> },
    /// Leave the issues open.
    Reject,
    /// Accept and remember the value for future uploads.
    Promote { value: Option<String> },
}

impl FixDecision {
    /// Accept the suggested value as is.
    pub fn accept() -> Self {
        FixDecision::Accept { value: None }
    }

    /// Promote the suggested value as is.
    pub fn promote() -> Self {
        FixDecision::Promote { value: None }
    }

    /// Status the decided suggestions move to.
    pub fn status(&self) -> FixStatus {
        match self {
            FixDecision::Accept { .. } => FixStatus::Applied,
            FixDecision::Reject => FixStatus::Rejected,
            FixDecision::Promote { .. } => FixStatus::Promoted,
        }
    }

    /// Value overriding the suggested one.
    pub fn override_value(&self) -> Option<&str> {
        match self {
            FixDecision::Accept { value } | FixDecision::Promote { value } => value.as_deref(),
            FixDecision::Reject => None,
        }
    }
}

/// Everything produced for one upload. Owned by a single worker at a time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub stage: Stage,
    /// Name of the uploaded file.
    pub source_name: String,
    /// The table as uploaded. Never modified.
    pub source: DataTable,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mapping: Option<MappingReport>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cleaned: Option<DataTable>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clean_report: Option<CleanReport>,
    /// Issues still open.
    #[serde(default)]
    pub issues: Vec<ValidationIssue>,
    /// Every suggestion made in this session, decided ones included.
    #[serde(default)]
    pub suggestions: Vec<FixSuggestion>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    /// Create a session for an uploaded table.
    pub fn new(id: impl Into<String>, source_name: impl Into<String>, source: DataTable) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            stage: Stage::Uploaded,
            source_name: source_name.into(),
            source,
            mapping: None,
            cleaned: None,
            clean_report: None,
            issues: Vec::new(),
            suggestions: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Fail with [`SchemafixError::StateConflict`] unless the stage is allowed.
    pub fn require(&self, operation: &'static str, allowed: &[Stage]) -> Result<()> {
        if allowed.contains(&self.stage) {
            Ok(())
        } else {
            Err(SchemafixError::StateConflict {
                operation,
                current: self.stage,
                allowed: allowed.to_vec(),
            })
        }
    }

    /// Move to a new stage.
    pub(crate) fn advance(&mut self, stage: Stage) {
        self.stage = stage;
        self.updated_at = Utc::now();
    }

    /// Mapping report, present from `Mapped` on.
    pub fn mapping(&self) -> Result<&MappingReport> {
        self.mapping
            .as_ref()
            .ok_or_else(|| SchemafixError::Persistence(format!("Session {} has no mapping", self.id)))
    }

    /// Cleaned table, present from `Cleaned` on.
    pub fn cleaned(&self) -> Result<&DataTable> {
        self.cleaned.as_ref().ok_or_else(|| {
            SchemafixError::Persistence(format!("Session {} has no cleaned table", self.id))
        })
    }

    /// Suggestions awaiting a decision.
    pub fn pending_suggestions(&self) -> impl Iterator<Item = &FixSuggestion> {
        self.suggestions.iter().filter(|s| s.is_pending())
    }

    /// Whether any suggestion awaits a decision.
    pub fn has_pending(&self) -> bool {
        self.pending_suggestions().next().is_some()
    }

    /// Open issues with no pending suggestion.
    pub fn unsuggested_issues(&self) -> Vec<ValidationIssue> {
        self.issues
            .iter()
            .filter(|issue| {
                !self.pending_suggestions().any(|s| {
                    s.row_index == issue.row_index
                        && s.canonical_column == issue.canonical_column
                        && s.issue_signature.matches(issue)
                })
            })
            .cloned()
            .collect()
    }

    /// Append suggestions, renumbering them after the existing ones.
    pub(crate) fn push_suggestions(&mut self, suggestions: Vec<FixSuggestion>) {
        for suggestion in suggestions {
            let id = suggestion_id(self.suggestions.len() + 1);
            self.suggestions.push(suggestion.with_id(id));
        }
    }

    /// Indices of pending suggestions with a signature.
    pub(crate) fn pending_for(&self, signature: &IssueSignature) -> Vec<usize> {
        self.suggestions
            .iter()
            .enumerate()
            .filter(|(_, s)| s.is_pending() && &s.issue_signature == signature)
            .map(|(i, _)| i)
            .collect()
    }

    /// Drop pending suggestions and open issues for re-cleaned columns.
    pub(crate) fn forget_columns(&mut self, columns: &[String]) {
        self.issues.retain(|i| !columns.contains(&i.canonical_column));
        self.suggestions
            .retain(|s| !(s.is_pending() && columns.contains(&s.canonical_column)));
    }
}
