//! Canonical schema registry.
//!
//! The registry is the fixed target every uploaded table is mapped onto. It is
//! loaded once (from CSV, JSON, or the built-in definition) and never mutated.

mod builtin;
mod column;
mod registry;
mod types;

pub use builtin::default_columns;
pub use column::CanonicalColumn;
pub use registry::{normalize_name, SchemaRegistry};
pub use types::{CasePolicy, ExpectedFormat};
