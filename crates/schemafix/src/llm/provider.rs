//! Capability traits and their answer types.

use serde::{Deserialize, Serialize};

use crate::cleaning::IssueKind;
use crate::error::Result;
use crate::schema::CanonicalColumn;

/// Answer of a semantic matcher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SemanticMatch {
    /// Chosen canonical column, `None` when nothing fits.
    pub candidate: Option<String>,

    /// Confidence in the choice (0.0-1.0).
    pub confidence: f64,
}

impl SemanticMatch {
    /// A "no match" answer.
    pub fn none() -> Self {
        Self {
            candidate: None,
            confidence: 0.0,
        }
    }
}

/// Answer of a suggestion capability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapabilityFix {
    /// Proposed replacement, `None` when the capability has no proposal.
    pub suggested_value: Option<String>,

    /// Confidence in the proposal (0.0-1.0).
    pub confidence: f64,

    /// Short explanation for the reviewer.
    #[serde(default)]
    pub rationale: String,
}

/// Configuration for LLM-backed capabilities.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// Model to use (e.g., "llama3.2").
    pub model: String,

    /// Maximum tokens in response.
    pub max_tokens: usize,

    /// Temperature for generation (0.0-1.0).
    pub temperature: f64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: "llama3.2".to_string(),
            max_tokens: 256,
            temperature: 0.1,
        }
    }
}

/// Maps a source column the deterministic strategies could not place.
///
/// Implementations must be thread-safe (Send + Sync); calls run on a worker
/// thread under a timeout.
pub trait SemanticMatcher: Send + Sync {
    /// Pick the best canonical column for a source column.
    ///
    /// # Arguments
    /// * `column_name` - The raw source header
    /// * `samples` - Non-empty sample values from the column
    /// * `candidates` - Canonical columns still without a source
    fn match_column(
        &self,
        column_name: &str,
        samples: &[String],
        candidates: &[CanonicalColumn],
    ) -> Result<SemanticMatch>;

    /// Name of this capability (for logging).
    fn name(&self) -> &str;
}

/// Proposes a value for a cell the rule engine could not normalize.
pub trait SuggestionCapability: Send + Sync {
    /// Suggest a replacement for one raw value.
    ///
    /// # Arguments
    /// * `column` - Metadata of the canonical column
    /// * `kind` - Why the value failed cleaning
    /// * `raw_value` - The uploaded value
    fn suggest_fix(
        &self,
        column: &CanonicalColumn,
        kind: IssueKind,
        raw_value: &str,
    ) -> Result<CapabilityFix>;

    /// Name of this capability (for logging).
    fn name(&self) -> &str;
}
