//! Session stages.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Where a session is in the pipeline.
///
/// `Uploaded → Mapped → Cleaned → Suggested → Finalized`. Manual mapping edits
/// and fix decisions re-enter earlier stages; `Finalized` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Uploaded,
    Mapped,
    Cleaned,
    Suggested,
    Finalized,
}

impl Stage {
    /// Get a human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            Stage::Uploaded => "uploaded",
            Stage::Mapped => "mapped",
            Stage::Cleaned => "cleaned",
            Stage::Suggested => "suggested",
            Stage::Finalized => "finalized",
        }
    }

    /// Whether no further transition is possible.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Stage::Finalized)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
