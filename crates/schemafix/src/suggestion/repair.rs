//! Deterministic repairs tried before any external capability.
//!
//! Each repair rewrites the raw value into a candidate that the column's own
//! rule set must then accept. A candidate the rules reject is never offered.

use once_cell::sync::Lazy;
use rapidfuzz::distance::levenshtein;
use regex::Regex;

use crate::cleaning::{IssueKind, RuleEngine};
use crate::schema::CanonicalColumn;

// =============================================================================
// LAZY STATIC PATTERNS
// =============================================================================

static EMAIL_AT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\s*(?:\(at\)|\[at\]|\s+at\s+)\s*").unwrap());

static EMAIL_DOT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\s*(?:\(dot\)|\[dot\]|\s+dot\s+)\s*").unwrap());

static ORDINAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\b(\d{1,2})(?:st|nd|rd|th)\b").unwrap());

static PERCENT_WORD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\s*(?:per\s*cent|percent|pct)\.?\s*$").unwrap());

/// A repaired value and why it was chosen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Repair {
    pub value: String,
    pub rationale: String,
}

/// Try the deterministic repairs for an issue kind.
pub fn repair(
    engine: &RuleEngine,
    column: &CanonicalColumn,
    kind: IssueKind,
    raw: &str,
) -> Option<Repair> {
    let candidates: Vec<(String, &str)> = match kind {
        IssueKind::InvalidEmail => email_candidates(raw),
        IssueKind::InvalidPhone => phone_candidates(raw),
        IssueKind::UnparseableDate => date_candidates(raw),
        IssueKind::InvalidCurrency | IssueKind::InvalidNumber => number_candidates(raw),
        IssueKind::InvalidPercentage => percentage_candidates(raw),
        IssueKind::InvalidIdentifierPattern => identifier_candidates(raw),
        IssueKind::OutOfRange => nearest_allowed(column, raw)
            .map(|v| vec![(v, "closest allowed value")])
            .unwrap_or_default(),
        IssueKind::EmptyRequired => Vec::new(),
    };

    candidates.into_iter().find_map(|(candidate, why)| {
        engine.clean_cell(column, &candidate).ok().map(|value| Repair {
            rationale: format!("Deterministic repair: {}", why),
            value,
        })
    })
}

fn email_candidates(raw: &str) -> Vec<(String, &'static str)> {
    let spelled = EMAIL_DOT
        .replace_all(&EMAIL_AT.replace_all(raw.trim(), "@"), ".")
        .to_string();
    let compact: String = spelled
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| if c == ',' { '.' } else { c })
        .collect();
    let trimmed = compact
        .trim_matches(|c: char| matches!(c, '.' | ';' | ':' | '<' | '>' | '"' | '\''))
        .replace("@@", "@")
        .replace("..", ".");

    vec![
        (spelled, "spelled-out separators"),
        (trimmed, "stray spaces and punctuation removed"),
    ]
}

fn phone_candidates(raw: &str) -> Vec<(String, &'static str)> {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    let mut candidates = Vec::new();
    if let Some(rest) = digits.strip_prefix("00") {
        candidates.push((rest.to_string(), "international 00 prefix dropped"));
    }
    if let Some(rest) = digits.strip_prefix('0') {
        candidates.push((rest.to_string(), "leading zero dropped"));
    }
    candidates
}

fn date_candidates(raw: &str) -> Vec<(String, &'static str)> {
    let no_ordinal = ORDINAL.replace_all(raw.trim(), "$1").to_string();
    let separators: String = no_ordinal
        .chars()
        .map(|c| if matches!(c, '.' | '_' | '\\') { '/' } else { c })
        .collect();
    let no_comma = separators.replace(',', "");

    vec![
        (no_ordinal, "ordinal suffix removed"),
        (separators, "separators normalized"),
        (no_comma, "separators normalized"),
    ]
}

fn number_candidates(raw: &str) -> Vec<(String, &'static str)> {
    let trimmed = raw.trim();
    let mut candidates = Vec::new();

    // 1.234,56 -> 1234.56
    if let (Some(dot), Some(comma)) = (trimmed.rfind('.'), trimmed.rfind(',')) {
        if comma > dot {
            candidates.push((
                trimmed.replace('.', "").replace(',', "."),
                "decimal comma converted",
            ));
        }
    }
    if trimmed.matches(',').count() == 1 && !trimmed.contains('.') {
        if let Some((_, decimals)) = trimmed.split_once(',') {
            if !decimals.is_empty() && decimals.len() <= 2 {
                candidates.push((trimmed.replace(',', "."), "decimal comma converted"));
            }
        }
    }

    let numeric: String = trimmed
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, '.' | '-'))
        .collect();
    if numeric.chars().any(|c| c.is_ascii_digit()) {
        candidates.push((numeric, "non-numeric characters removed"));
    }
    candidates
}

fn percentage_candidates(raw: &str) -> Vec<(String, &'static str)> {
    let trimmed = raw.trim();
    let mut candidates = Vec::new();
    if PERCENT_WORD.is_match(trimmed) {
        candidates.push((
            format!("{}%", PERCENT_WORD.replace(trimmed, "")),
            "percent spelled out",
        ));
    }
    if trimmed.contains(',') && !trimmed.contains('.') {
        candidates.push((trimmed.replace(',', "."), "decimal comma converted"));
    }
    candidates
}

fn identifier_candidates(raw: &str) -> Vec<(String, &'static str)> {
    let upper = raw.trim().to_uppercase();
    let alnum: String = upper.chars().filter(|c| c.is_ascii_alphanumeric()).collect();
    let no_spaces: String = upper.chars().filter(|c| !c.is_whitespace()).collect();

    vec![
        (no_spaces, "whitespace removed"),
        (alnum, "separators removed"),
    ]
}

/// Allowed value within two edits of the raw value, when exactly one is closest.
fn nearest_allowed(column: &CanonicalColumn, raw: &str) -> Option<String> {
    let needle = raw.trim().to_lowercase();
    if needle.is_empty() {
        return None;
    }

    let mut scored: Vec<(usize, &String)> = column
        .allowed_values
        .iter()
        .map(|allowed| {
            let distance = levenshtein::distance(needle.chars(), allowed.to_lowercase().chars());
            (distance, allowed)
        })
        .filter(|(distance, _)| *distance <= 2 && *distance < needle.chars().count())
        .collect();
    scored.sort_by_key(|(distance, _)| *distance);

    match scored.as_slice() {
        [(best, value), (second, _), ..] if best < second => Some((*value).clone()),
        [(_, value)] => Some((*value).clone()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::schema::SchemaRegistry;

    fn engine() -> RuleEngine {
        RuleEngine::new(Arc::new(SchemaRegistry::builtin().unwrap()))
    }

    fn fix(column: &str, kind: IssueKind, raw: &str) -> Option<String> {
        let engine = engine();
        let column = engine.registry().get(column).unwrap().clone();
        repair(&engine, &column, kind, raw).map(|r| r.value)
    }

    #[test]
    fn test_email_repairs() {
        assert_eq!(
            fix("email", IssueKind::InvalidEmail, "asha at example dot com").as_deref(),
            Some("asha@example.com")
        );
        assert_eq!(
            fix("email", IssueKind::InvalidEmail, "asha@example,com").as_deref(),
            Some("asha@example.com")
        );
        assert_eq!(fix("email", IssueKind::InvalidEmail, "no address"), None);
    }

    #[test]
    fn test_phone_repairs() {
        assert_eq!(
            fix("phone", IssueKind::InvalidPhone, "0091 98765 43210").as_deref(),
            Some("+91-9876543210")
        );
        assert_eq!(fix("phone", IssueKind::InvalidPhone, "12345"), None);
    }

    #[test]
    fn test_date_repairs() {
        assert_eq!(
            fix("order_date", IssueKind::UnparseableDate, "14th March 2024").as_deref(),
            Some("2024-03-14")
        );
        assert_eq!(
            fix("order_date", IssueKind::UnparseableDate, "2024_03_14").as_deref(),
            Some("2024-03-14")
        );
        assert_eq!(fix("order_date", IssueKind::UnparseableDate, "yesterday"), None);
    }

    #[test]
    fn test_amount_repairs() {
        assert_eq!(
            fix("unit_price", IssueKind::InvalidCurrency, "1.200,50").as_deref(),
            Some("1200.50")
        );
        assert_eq!(
            fix("unit_price", IssueKind::InvalidCurrency, "approx 450").as_deref(),
            Some("450.00")
        );
        assert_eq!(fix("unit_price", IssueKind::InvalidCurrency, "N/A"), None);
    }

    #[test]
    fn test_percentage_repairs() {
        assert_eq!(
            fix("tax_pct", IssueKind::InvalidPercentage, "18 percent").as_deref(),
            Some("0.18")
        );
        assert_eq!(fix("tax_pct", IssueKind::InvalidPercentage, "150%"), None);
    }

    #[test]
    fn test_identifier_repairs() {
        assert_eq!(
            fix("postal_code", IssueKind::InvalidIdentifierPattern, "560 001").as_deref(),
            Some("560001")
        );
    }

    #[test]
    fn test_nearest_allowed_value() {
        assert_eq!(fix("currency", IssueKind::OutOfRange, "USDD").as_deref(), Some("USD"));
        // too short to correct safely
        assert_eq!(fix("currency", IssueKind::OutOfRange, "Rs"), None);
    }
}
