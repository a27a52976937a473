//! Column mapping onto the canonical schema.
//!
//! Strategies run in fixed priority order and short-circuit per source column:
//!
//! 1. **Exact** – normalized name or synonym equality (confidence 1.0)
//! 2. **Fuzzy** – name similarity above a threshold, unambiguously best
//! 3. **Semantic** – the pluggable [`SemanticMatcher`](crate::llm::SemanticMatcher)
//! 4. **Manual** – left unmapped for a human to assign

mod mapper;
mod similarity;
mod types;

pub use mapper::ColumnMapper;
pub use similarity::{char_score, name_similarity, token_score, CHAR_ONLY_MIN};
pub use types::{
    AmbiguousMatch, ColumnMapping, MappingEdit, MappingReport, MappingType, SourceColumn,
};
