//! Issue signatures: the stable key learned fixes are indexed on.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::cleaning::{IssueKind, ValidationIssue};

/// `(canonical column, issue kind, normalized raw value)`.
///
/// A pure function of the issue: no row numbers, session ids or timestamps, so
/// the same bad value in the same column maps to the same signature in every
/// upload.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct IssueSignature {
    pub canonical_column: String,
    pub issue_kind: IssueKind,
    pub pattern: String,
}

impl IssueSignature {
    /// Create a signature, normalizing the raw value.
    pub fn new(canonical_column: impl Into<String>, issue_kind: IssueKind, raw_value: &str) -> Self {
        Self {
            canonical_column: canonical_column.into(),
            issue_kind,
            pattern: normalize_pattern(raw_value),
        }
    }

    /// Signature of a validation issue.
    pub fn from_issue(issue: &ValidationIssue) -> Self {
        Self::new(&issue.canonical_column, issue.issue_kind, &issue.raw_value)
    }

    /// Whether an issue has this signature.
    pub fn matches(&self, issue: &ValidationIssue) -> bool {
        self.canonical_column == issue.canonical_column
            && self.issue_kind == issue.issue_kind
            && self.pattern == normalize_pattern(&issue.raw_value)
    }

    /// SHA-256 hex digest, used as the storage key.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.canonical_column.as_bytes());
        hasher.update([0x1f]);
        hasher.update(self.issue_kind.label().as_bytes());
        hasher.update([0x1f]);
        hasher.update(self.pattern.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    /// First 12 hex digits of the fingerprint, for display.
    pub fn short_id(&self) -> String {
        self.fingerprint()[..12].to_string()
    }
}

impl fmt::Display for IssueSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/\"{}\"",
            self.canonical_column, self.issue_kind, self.pattern
        )
    }
}

/// Trim, collapse whitespace, lower-case.
pub fn normalize_pattern(raw: &str) -> String {
    raw.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}
