//! Finalize command - close a session and export the cleaned table.

use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

use colored::Colorize;

use super::{shown, CommandResult, Context};

pub fn run(ctx: &Context, session: String, output: PathBuf) -> CommandResult {
    let pipeline = ctx.resume(&session)?;
    let table = pipeline.finalize(&session)?;
    pipeline.checkpoint(&session)?;

    let file = File::create(&output)
        .map_err(|e| format!("Cannot create {}: {}", shown(&output), e))?;
    table.write_to(BufWriter::new(file))?;

    let summary = pipeline.summary(&session)?;
    println!(
        "{} {} rows x {} columns to {}",
        "Wrote".green().bold(),
        table.row_count(),
        table.column_count(),
        shown(&output).white()
    );
    if summary.open_issues > 0 {
        println!(
            "{} {} issues were left open",
            "Note:".yellow().bold(),
            summary.open_issues
        );
    }
    println!("Data quality score: {:.0}%", summary.data_quality_score * 100.0);

    pipeline.archive(&session)?;
    println!("Session {} archived", session.dimmed());
    Ok(())
}
