//! Fix suggestions for issues the rule engine left open.

mod repair;
mod suggester;
mod suggestion;

pub use repair::{repair, Repair};
pub use suggester::FixSuggester;
pub use suggestion::{suggestion_id, FixSource, FixStatus, FixSuggestion};
