//! Map command - show how the columns of a file would map.

use std::path::PathBuf;
use std::sync::Arc;

use colored::Colorize;
use schemafix::{ColumnMapper, MappingType, OllamaCapability, Parser};

use super::{shown, CommandResult, Context};
use crate::cli::LlmChoice;

pub fn run(
    ctx: &Context,
    file: PathBuf,
    llm: LlmChoice,
    model: Option<String>,
    json_output: bool,
) -> CommandResult {
    if !file.exists() {
        return Err(format!("File not found: {}", shown(&file)).into());
    }

    let registry = ctx.registry()?;
    let config = ctx.pipeline_config()?;
    let (table, _) = Parser::new().parse_file(&file)?;

    let mut mapper = ColumnMapper::new(registry.clone()).with_config(config.mapper);
    if let LlmChoice::Ollama = llm {
        let ollama = match model {
            Some(model) => OllamaCapability::with_model(model)?,
            None => OllamaCapability::new()?,
        };
        mapper = mapper.with_semantic_matcher(Arc::new(ollama));
    }

    let report = mapper.map_table(&table);

    if json_output {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!(
        "{} {}",
        "Mapping".cyan().bold(),
        shown(&file).white()
    );
    println!();

    for mapping in &report.mappings {
        let target = match &mapping.canonical_column {
            Some(canonical) => canonical.green().to_string(),
            None => "(unmapped)".yellow().to_string(),
        };
        let kind = match mapping.mapping_type {
            MappingType::Exact => mapping.mapping_type.label().green(),
            MappingType::Fuzzy | MappingType::Semantic => mapping.mapping_type.label().yellow(),
            MappingType::Manual => mapping.mapping_type.label().red(),
        };
        println!(
            "  {:24} -> {:24} {:8} {:.2}  {}",
            mapping.source_column,
            target,
            kind,
            mapping.confidence,
            mapping.explanation.dimmed()
        );
    }

    if !report.ambiguous.is_empty() {
        println!();
        println!("{}", "Ambiguous:".yellow().bold());
        for entry in &report.ambiguous {
            let candidates: Vec<String> = entry
                .candidates
                .iter()
                .map(|(name, score)| format!("{} ({:.2})", name, score))
                .collect();
            println!("  {:24} {}", entry.source_column, candidates.join(", "));
        }
    }

    let missing = report.missing_required(&registry);
    if !missing.is_empty() {
        println!();
        println!(
            "{} {}",
            "Missing required:".red().bold(),
            missing.join(", ")
        );
    }

    Ok(())
}
