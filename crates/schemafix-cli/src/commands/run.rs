//! Run command - drive a session from upload to suggestions.
//!
//! Each stage is checkpointed as it completes, so a run interrupted with
//! Ctrl-C picks up where it stopped with `--resume`.

use std::path::PathBuf;
use std::sync::Arc;

use colored::Colorize;
use schemafix::{Pipeline, SchemafixError, Stage};
use tracing::warn;

use super::{shown, status, CommandResult, Context};
use crate::cli::LlmChoice;

pub fn run(
    ctx: &Context,
    file: Option<PathBuf>,
    resume: Option<String>,
    llm: LlmChoice,
    model: Option<String>,
) -> CommandResult {
    let pipeline = Arc::new(ctx.pipeline(&llm, model.as_deref())?);

    let id = match (resume, file) {
        (Some(id), _) => {
            let stage = pipeline.resume(&id)?;
            println!(
                "{} {} at {}",
                "Resuming".cyan().bold(),
                id.white(),
                stage.to_string().yellow()
            );
            id
        }
        (None, Some(file)) => {
            if !file.exists() {
                return Err(format!("File not found: {}", shown(&file)).into());
            }
            println!(
                "{} {}",
                "Uploading".cyan().bold(),
                shown(&file).white()
            );
            let id = pipeline.upload_file(&file)?;
            pipeline.checkpoint(&id)?;
            id
        }
        (None, None) => return Err("Either FILE or --resume is required".into()),
    };

    let handler_pipeline = Arc::clone(&pipeline);
    let handler_id = id.clone();
    ctrlc::set_handler(move || {
        if let Err(e) = handler_pipeline.cancel(&handler_id) {
            warn!(error = %e, "could not cancel session");
        }
    })?;

    match advance(&pipeline, &id) {
        Ok(()) => {}
        Err(SchemafixError::Cancelled(_)) => {
            let stage = pipeline.stage(&id)?;
            println!();
            println!(
                "{} at {}. Continue with {}",
                "Cancelled".red().bold(),
                stage.to_string().yellow(),
                format!("schemafix run --resume {}", id).cyan().bold()
            );
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    }

    println!();
    status::print_session(&pipeline, &id)?;
    Ok(())
}

/// Run the remaining stages up to `Suggested`, checkpointing after each one.
fn advance(pipeline: &Pipeline, id: &str) -> schemafix::Result<()> {
    loop {
        match pipeline.stage(id)? {
            Stage::Uploaded => {
                let report = pipeline.map(id)?;
                println!(
                    "  {} {} mapped, {} unmapped, {} ambiguous",
                    "map".green(),
                    report.mapped().count(),
                    report.missing.len(),
                    report.ambiguous.len()
                );
            }
            Stage::Mapped => {
                let report = pipeline.clean(id)?;
                println!(
                    "  {} {} columns, {} cells changed, {} issues",
                    "clean".green(),
                    report.columns_cleaned,
                    report.cells_changed,
                    report.issues_by_kind.values().sum::<usize>()
                );
            }
            Stage::Cleaned => {
                let suggestions = pipeline.suggest(id)?;
                println!(
                    "  {} {} suggestions",
                    "suggest".green(),
                    suggestions.len()
                );
            }
            Stage::Suggested | Stage::Finalized => return Ok(()),
        }
        pipeline.checkpoint(id)?;
    }
}
