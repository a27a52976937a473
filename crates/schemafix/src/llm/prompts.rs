//! Prompt templates for LLM-backed capabilities.

use crate::cleaning::IssueKind;
use crate::schema::CanonicalColumn;

/// System prompt shared by all requests.
pub fn system_prompt() -> &'static str {
    "You are a data-cleaning assistant for tabular business records. \
     You map spreadsheet columns onto a fixed schema and propose corrected values \
     for cells that failed validation. Answer only with the JSON object requested. \
     Never invent data that cannot be derived from the input."
}

/// Build a prompt asking which canonical column a source column holds.
pub fn semantic_match_prompt(
    column_name: &str,
    samples: &[String],
    candidates: &[CanonicalColumn],
) -> String {
    let sample_str = if samples.is_empty() {
        "No samples available".to_string()
    } else {
        samples
            .iter()
            .map(|s| format!("  - \"{}\"", s))
            .collect::<Vec<_>>()
            .join("\n")
    };

    let candidate_str = candidates
        .iter()
        .map(|c| {
            format!(
                "  - {} ({}): {} Example: \"{}\"",
                c.name, c.expected_format, c.description, c.example
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"Decide which schema column this spreadsheet column contains.

## Source Column
- Header: {}

## Sample Values
{}

## Candidate Schema Columns
{}

## Task
Pick the single candidate that holds the same information, or null if none does.

Respond with a JSON object:
{{
  "candidate": "column_name" or null,
  "confidence": 0.0-1.0
}}"#,
        column_name, sample_str, candidate_str
    )
}

/// Build a prompt asking for a corrected cell value.
pub fn fix_prompt(column: &CanonicalColumn, kind: IssueKind, raw_value: &str) -> String {
    let mut rules = Vec::new();
    if let Some(pattern) = &column.pattern {
        rules.push(format!("must match the pattern {}", pattern));
    }
    if !column.allowed_values.is_empty() {
        rules.push(format!("must be one of: {}", column.allowed_values.join(", ")));
    }
    if column.min.is_some() || column.max.is_some() {
        rules.push(format!(
            "must lie between {} and {}",
            column.min.map_or("-inf".to_string(), |v| v.to_string()),
            column.max.map_or("+inf".to_string(), |v| v.to_string())
        ));
    }
    let rules_str = if rules.is_empty() {
        "None".to_string()
    } else {
        rules.join("; ")
    };

    format!(
        r#"A value failed validation. Propose a corrected value.

## Column
- Name: {}
- Description: {}
- Expected format: {}
- Example: "{}"
- Rules: {}

## Problem
- Issue: {}
- Raw value: "{}"

## Task
If the intended value can be recovered, give it in the column's expected format.
If it cannot, use null.

Respond with a JSON object:
{{
  "suggested_value": "corrected value" or null,
  "confidence": 0.0-1.0,
  "rationale": "One sentence explaining the correction"
}}"#,
        column.name,
        column.description,
        column.expected_format,
        column.example,
        rules_str,
        kind,
        raw_value
    )
}
