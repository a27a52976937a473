//! Status command - show session progress and open suggestions.

use colored::Colorize;
use schemafix::{FixStatus, Pipeline, Stage};

use super::{CommandResult, Context};
use crate::cli::LlmChoice;

pub fn run(ctx: &Context, session: Option<String>, json_output: bool) -> CommandResult {
    let Some(id) = session else {
        return list(ctx, json_output);
    };

    let pipeline = ctx.resume(&id)?;

    if json_output {
        let snapshot = pipeline.session(&id)?;
        let pending: Vec<_> = snapshot.pending_suggestions().collect();
        let status = serde_json::json!({
            "summary": pipeline.summary(&id)?,
            "pending_suggestions": pending,
        });
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    print_session(&pipeline, &id)
}

fn list(ctx: &Context, json_output: bool) -> CommandResult {
    let pipeline = ctx.pipeline(&LlmChoice::None, None)?;
    let ids = pipeline.checkpoints()?;

    let mut rows = Vec::with_capacity(ids.len());
    for id in &ids {
        pipeline.resume(id)?;
        let session = pipeline.session(id)?;
        rows.push((session.id, session.stage, session.source_name, session.updated_at));
    }

    if json_output {
        let list: Vec<_> = rows
            .iter()
            .map(|(id, stage, source, updated)| {
                serde_json::json!({
                    "session_id": id,
                    "stage": stage,
                    "source": source,
                    "updated_at": updated,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&list)?);
        return Ok(());
    }

    if rows.is_empty() {
        println!("No sessions. Start one with {}", "schemafix run FILE".cyan());
        return Ok(());
    }

    for (id, stage, source, updated) in rows {
        println!(
            "  {}  {:10} {:30} {}",
            id.white().bold(),
            stage.to_string().yellow(),
            source,
            updated.format("%Y-%m-%d %H:%M").to_string().dimmed()
        );
    }
    Ok(())
}

/// Human-readable status of one loaded session.
pub fn print_session(pipeline: &Pipeline, id: &str) -> CommandResult {
    let summary = pipeline.summary(id)?;
    let session = pipeline.session(id)?;

    println!(
        "{} {} ({})",
        "Session".cyan().bold(),
        id.white().bold(),
        session.source_name
    );
    println!("Stage: {}", summary.stage.to_string().yellow());
    println!();

    println!("{}", "Columns:".yellow().bold());
    println!("  Rows:      {}", summary.total_rows);
    println!("  Mapped:    {}", summary.mapped_columns.to_string().green());
    println!("  Unmapped:  {}", summary.unmapped_columns);
    println!("  Extra:     {}", summary.extra_columns);
    if summary.ambiguous_columns > 0 {
        println!("  Ambiguous: {}", summary.ambiguous_columns.to_string().yellow());
    }
    if !summary.missing_required.is_empty() {
        println!(
            "  Missing required: {}",
            summary.missing_required.join(", ").red()
        );
    }
    println!();

    if !summary.issues_by_kind.is_empty() {
        println!("{} {}", "Open issues:".yellow().bold(), summary.open_issues);
        for (kind, count) in &summary.issues_by_kind {
            println!("  {:28} {}", kind.label(), count);
        }
        println!();
    }

    if !summary.suggestions_by_status.is_empty() {
        println!("{}", "Suggestions:".yellow().bold());
        for (status, count) in &summary.suggestions_by_status {
            let count = count.to_string();
            let count = match status {
                FixStatus::Pending => count.white(),
                FixStatus::Applied | FixStatus::Promoted => count.green(),
                FixStatus::Rejected => count.red(),
            };
            println!("  {:10} {}", status.label(), count);
        }
        println!();
    }

    let pending: Vec<_> = session.pending_suggestions().collect();
    if !pending.is_empty() {
        println!("{}", "Pending:".yellow().bold());
        for suggestion in pending {
            let value = suggestion
                .suggested_value
                .as_deref()
                .map(|v| v.green().to_string())
                .unwrap_or_else(|| "(no value)".dimmed().to_string());
            println!(
                "  {} {} row {:<5} {:18} {:?} -> {} ({:.2}, {})",
                suggestion.id.white().bold(),
                suggestion.issue_signature.short_id().dimmed(),
                suggestion.row_index + 1,
                suggestion.canonical_column,
                suggestion.raw_value,
                value,
                suggestion.confidence,
                suggestion.source
            );
            if session.stage == Stage::Suggested && !suggestion.rationale.is_empty() {
                println!("      {}", suggestion.rationale.dimmed());
            }
        }
        println!();
    }

    let score = summary.data_quality_score * 100.0;
    let score_text = format!("{:.0}", score);
    let score_color = if score >= 80.0 {
        score_text.green()
    } else if score >= 50.0 {
        score_text.yellow()
    } else {
        score_text.red()
    };
    println!("Data quality score: {}%", score_color);
    println!("{}", summary.recommendation);
    Ok(())
}
