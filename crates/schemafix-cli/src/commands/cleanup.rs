//! Cleanup command - archive finalized sessions and expire idle ones.

use chrono::Duration;
use colored::Colorize;
use tracing::warn;

use super::{CommandResult, Context};
use crate::cli::LlmChoice;

pub fn run(ctx: &Context, max_age_hours: i64) -> CommandResult {
    let max_age = Duration::try_hours(max_age_hours)
        .filter(|age| *age >= Duration::zero())
        .ok_or("--max-age-hours must be a non-negative number of hours")?;
    let pipeline = ctx.pipeline(&LlmChoice::None, None)?;

    let mut archived = 0;
    for id in pipeline.checkpoints()? {
        match pipeline.archive(&id) {
            Ok(_) => archived += 1,
            Err(schemafix::SchemafixError::StateConflict { .. }) => {}
            Err(e) => warn!(session = %id, error = %e, "could not archive session"),
        }
    }

    let expired = pipeline.expire(max_age)?;

    println!("{} {} finalized session(s)", "Archived".green().bold(), archived);
    println!(
        "{} {} session(s) idle for {}h or more",
        "Deleted".yellow().bold(),
        expired.len(),
        max_age_hours
    );
    for id in &expired {
        println!("  {}", id.dimmed());
    }
    Ok(())
}
