//! Pluggable capabilities for the semantic mapping and fix suggestion steps.
//!
//! The pipeline works fully without them. When configured, every call goes
//! through [`call_with_timeout`], and a failure or timeout degrades to a
//! low-confidence miss instead of aborting the run.
//!
//! # Implementations
//!
//! - **Mock** - scripted answers and call counters, for tests
//! - **Ollama** - local models, no API key needed (requires Ollama installed)
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use schemafix::{ColumnMapper, OllamaCapability, SchemaRegistry};
//!
//! let registry = Arc::new(SchemaRegistry::builtin().unwrap());
//! let mapper = ColumnMapper::new(registry)
//!     .with_semantic_matcher(Arc::new(OllamaCapability::new().unwrap()));
//! ```

mod mock;
mod ollama;
mod prompts;
mod provider;
mod timeout;

pub use mock::MockCapability;
pub use ollama::OllamaCapability;
pub use provider::{
    CapabilityFix, LlmConfig, SemanticMatch, SemanticMatcher, SuggestionCapability,
};
pub use timeout::call_with_timeout;
