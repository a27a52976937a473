//! Schemafix: map arbitrary tabular files onto a canonical schema, clean them
//! deterministically, and learn from the fixes humans accept.
//!
//! A [`Pipeline`] runs one session per upload through a fixed sequence of
//! stages:
//!
//! - **Map**: exact, fuzzy, semantic and manual column matching with confidence
//! - **Clean**: idempotent per-format rules; bad cells become issues, never errors
//! - **Suggest**: learned fixes first, then deterministic repairs, then an
//!   optional capability under a timeout
//! - **Decide**: accept, reject or promote; promotion feeds the learning store
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use schemafix::{FixDecision, Pipeline, SchemaRegistry};
//!
//! let pipeline = Pipeline::new(Arc::new(SchemaRegistry::builtin().unwrap()));
//! let id = pipeline.upload_file("orders.csv").unwrap();
//! pipeline.map(&id).unwrap();
//! pipeline.clean(&id).unwrap();
//!
//! for suggestion in pipeline.suggest(&id).unwrap() {
//!     if suggestion.confidence >= 0.9 {
//!         let _ = pipeline.apply_fix(&id, &suggestion.issue_signature, FixDecision::accept());
//!     }
//! }
//!
//! let cleaned = pipeline.finalize(&id).unwrap();
//! println!("Rows: {}", cleaned.row_count());
//! ```

pub mod cleaning;
pub mod config;
pub mod error;
pub mod input;
pub mod learning;
pub mod llm;
pub mod mapping;
pub mod schema;
pub mod session;
pub mod store;
pub mod suggestion;

pub use cleaning::{CleanReport, IssueKind, RuleEngine, ValidationIssue};
pub use config::{CleaningConfig, MapperConfig, PipelineConfig, SuggesterConfig};
pub use error::{Result, SchemafixError};
pub use input::{DataTable, Parser, SourceMetadata};
pub use learning::{IssueSignature, LearnedFix, LearningStore};
pub use llm::{MockCapability, OllamaCapability, SemanticMatcher, SuggestionCapability};
pub use mapping::{ColumnMapper, ColumnMapping, MappingReport, MappingType};
pub use schema::{CanonicalColumn, ExpectedFormat, SchemaRegistry};
pub use session::{FixDecision, Pipeline, ProcessingSummary, Session, Stage};
pub use store::{FileStore, KeyValueStore, MemoryStore};
pub use suggestion::{FixSource, FixStatus, FixSuggester, FixSuggestion};
