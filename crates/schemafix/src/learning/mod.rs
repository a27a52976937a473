//! Fix learning: signatures and the shared store of promoted resolutions.

mod signature;
mod store;

pub use signature::{normalize_pattern, IssueSignature};
pub use store::{LearnedFix, LearningStore, LEARNED_NAMESPACE};
