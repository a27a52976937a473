//! Canonical column definition.

use serde::{Deserialize, Serialize};

use super::types::{CasePolicy, ExpectedFormat};

/// One column of the fixed target schema.
///
/// Columns are immutable once a [`SchemaRegistry`](super::SchemaRegistry) has been
/// built from them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalColumn {
    /// Unique column name.
    pub name: String,
    /// Human-readable description.
    #[serde(default)]
    pub description: String,
    /// Example of a clean value.
    #[serde(default)]
    pub example: String,
    /// Expected value format.
    pub expected_format: ExpectedFormat,
    /// Whether a session can finalize without this column.
    #[serde(default)]
    pub required: bool,
    /// Alternative source names that count as exact matches.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub synonyms: Vec<String>,
    /// Regular pattern for identifier columns.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    /// Closed value set for categorical columns.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub allowed_values: Vec<String>,
    /// Inclusive lower bound for numeric values.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    /// Inclusive upper bound for numeric values.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    /// Case normalization for text-like formats.
    #[serde(default)]
    pub case: CasePolicy,
}

impl CanonicalColumn {
    /// Create a column with the given name and format.
    pub fn new(name: impl Into<String>, expected_format: ExpectedFormat) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            example: String::new(),
            expected_format,
            required: false,
            synonyms: Vec::new(),
            pattern: None,
            allowed_values: Vec::new(),
            min: None,
            max: None,
            case: CasePolicy::Preserve,
        }
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the example value.
    pub fn with_example(mut self, example: impl Into<String>) -> Self {
        self.example = example.into();
        self
    }

    /// Mark the column as required.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Add synonyms.
    pub fn with_synonyms(mut self, synonyms: &[&str]) -> Self {
        self.synonyms.extend(synonyms.iter().map(|s| s.to_string()));
        self
    }

    /// Set the identifier pattern.
    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }

    /// Set the allowed categorical values.
    pub fn with_allowed_values(mut self, values: &[&str]) -> Self {
        self.allowed_values = values.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Set an inclusive numeric range. Either bound may be open.
    pub fn with_range(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.min = min;
        self.max = max;
        self
    }

    /// Set the case policy.
    pub fn with_case(mut self, case: CasePolicy) -> Self {
        self.case = case;
        self
    }

    /// Check a number against the column's bounds.
    pub fn in_range(&self, value: f64) -> bool {
        self.min.is_none_or(|min| value >= min) && self.max.is_none_or(|max| value <= max)
    }
}
