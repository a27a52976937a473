//! Schema command - print the canonical schema.

use colored::Colorize;

use super::{CommandResult, Context};

pub fn run(ctx: &Context) -> CommandResult {
    let registry = ctx.registry()?;

    println!(
        "{} ({} columns)",
        "Canonical schema".cyan().bold(),
        registry.len()
    );
    println!();

    for column in registry.columns() {
        let marker = if column.required {
            "*".red().bold().to_string()
        } else {
            " ".to_string()
        };
        println!(
            "{} {:20} {:18} {}",
            marker,
            column.name.white().bold(),
            column.expected_format.label(),
            column.description.dimmed()
        );
        if !column.example.is_empty() {
            println!("    {:20} {}", "example", column.example);
        }
        if !column.synonyms.is_empty() {
            println!("    {:20} {}", "synonyms", column.synonyms.join(", "));
        }
        if let Some(pattern) = &column.pattern {
            println!("    {:20} {}", "pattern", pattern);
        }
        if !column.allowed_values.is_empty() {
            println!("    {:20} {}", "allowed", column.allowed_values.join(", "));
        }
    }

    println!();
    println!("{} required", "*".red().bold());
    Ok(())
}
