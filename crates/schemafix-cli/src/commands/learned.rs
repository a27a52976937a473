//! Learned command - list the fix learning store.

use colored::Colorize;

use super::{CommandResult, Context};
use crate::cli::LlmChoice;

pub fn run(ctx: &Context, json_output: bool) -> CommandResult {
    let pipeline = ctx.pipeline(&LlmChoice::None, None)?;
    let entries = pipeline.learning_store().entries();

    if json_output {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    if entries.is_empty() {
        println!("No learned fixes yet. Promote one with {}", "schemafix fix SESSION SIG promote".cyan());
        return Ok(());
    }

    println!("{} ({})", "Learned fixes".cyan().bold(), entries.len());
    println!();
    for fix in &entries {
        println!(
            "  {}  {:40} -> {}  {}x, last {}",
            fix.signature.short_id().dimmed(),
            fix.signature.to_string(),
            fix.resolution.green(),
            fix.occurrences,
            fix.last_promoted.format("%Y-%m-%d %H:%M")
        );
    }
    Ok(())
}
