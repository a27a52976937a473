//! Error types for the schemafix library.

use std::path::PathBuf;
use thiserror::Error;

use crate::cleaning::IssueKind;
use crate::session::Stage;

/// Main error type for schemafix operations.
#[derive(Debug, Error)]
pub enum SchemafixError {
    /// Error reading or accessing a file.
    #[error("IO error for '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Error from the CSV library.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Empty file or no data to process.
    #[error("Empty data: {0}")]
    EmptyData(String),

    /// Configuration or schema definition error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Regex compilation error.
    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    /// Key-value persistence failure.
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Two or more canonical columns scored within the ambiguity margin.
    #[error("Column '{column}' is ambiguous between: {}", candidates.join(", "))]
    MappingAmbiguous {
        column: String,
        candidates: Vec<String>,
    },

    /// Required canonical columns have no source mapping.
    #[error("Required columns are unmapped: {}", columns.join(", "))]
    UnmappedRequiredColumn { columns: Vec<String> },

    /// A single cell could not be normalized by its rule set.
    #[error("Row {row}, column '{column}': {kind}")]
    CellTransformFailure {
        row: usize,
        column: String,
        kind: IssueKind,
    },

    /// An external capability was unreachable, timed out, or errored.
    #[error("Capability '{capability}' unavailable: {reason}")]
    CapabilityUnavailable { capability: String, reason: String },

    /// An orchestrator transition was requested out of order.
    #[error("Cannot {operation} while session is {current}; allowed from: {}", format_stages(allowed))]
    StateConflict {
        operation: &'static str,
        current: Stage,
        allowed: Vec<Stage>,
    },

    /// A learning store write for one signature could not be serialized.
    #[error("Learning store write conflict for signature {signature}")]
    LearningStoreWriteConflict { signature: String },

    /// No session with this id exists.
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    /// No pending suggestion matches the request.
    #[error("Suggestion not found: {0}")]
    SuggestionNotFound(String),

    /// Column name is not known to the schema or the source table.
    #[error("Unknown column: {0}")]
    UnknownColumn(String),

    /// The session was cancelled while a stage was running.
    #[error("Session {0} was cancelled")]
    Cancelled(String),
}

fn format_stages(stages: &[Stage]) -> String {
    stages
        .iter()
        .map(|s| s.label())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Result type alias for schemafix operations.
pub type Result<T> = std::result::Result<T, SchemafixError>;
