//! Map-edit command - manual mapping edits on a checkpointed session.

use colored::Colorize;

use super::{CommandResult, Context};

pub fn run(ctx: &Context, session: String, source: String, canonical: Option<String>) -> CommandResult {
    let pipeline = ctx.resume(&session)?;
    let edit = pipeline.edit_mapping(&session, &source, canonical.as_deref())?;
    pipeline.checkpoint(&session)?;

    match &canonical {
        Some(target) => println!(
            "{} {} -> {}",
            "Mapped".green().bold(),
            source.white(),
            target.green()
        ),
        None => println!("{} {}", "Unassigned".yellow().bold(), source.white()),
    }
    if !edit.affected.is_empty() {
        println!("Re-evaluated: {}", edit.affected.join(", "));
    }

    let snapshot = pipeline.session(&session)?;
    println!(
        "Session is {} with {} open issues",
        snapshot.stage.to_string().yellow(),
        snapshot.issues.len()
    );
    Ok(())
}
