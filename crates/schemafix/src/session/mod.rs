//! Per-upload sessions and the stage-gated orchestrator.

mod pipeline;
mod session;
mod stage;
mod summary;

pub use pipeline::{Pipeline, ARCHIVE_NAMESPACE, SESSION_NAMESPACE};
pub use session::{FixDecision, Session};
pub use stage::Stage;
pub use summary::ProcessingSummary;
