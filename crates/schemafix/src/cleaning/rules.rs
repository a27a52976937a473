//! Per-format rule steps.
//!
//! Every step is idempotent: feeding a step its own output returns that output
//! unchanged. A failing step reports the best partial value it reached so the
//! cell is never discarded.

use chrono::{NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;

use super::issue::IssueKind;
use crate::config::CleaningConfig;
use crate::schema::{CanonicalColumn, ExpectedFormat};

/// The one date representation written to cleaned output.
pub const ISO_DATE: &str = "%Y-%m-%d";

// =============================================================================
// LAZY STATIC PATTERNS
// =============================================================================

static EMAIL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9._%+-]+@[a-z0-9.-]+\.[a-z]{2,}$").unwrap());

static CURRENCY_CODE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(?:inr|usd|eur|gbp|rs)\b\.?").unwrap());

// =============================================================================
// STEP RESULTS
// =============================================================================

/// A cell that failed a rule step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellFailure {
    /// Value reached before the failing step.
    pub partial: String,
    pub kind: IssueKind,
}

/// Outcome of running one step or a whole rule set.
pub type CellOutcome = std::result::Result<String, CellFailure>;

fn fail(partial: &str, kind: IssueKind) -> CellOutcome {
    Err(CellFailure {
        partial: partial.to_string(),
        kind,
    })
}

/// Everything a step may consult besides the value itself.
#[derive(Debug, Clone, Copy)]
pub struct RuleContext<'a> {
    pub column: &'a CanonicalColumn,
    pub pattern: Option<&'a Regex>,
    pub config: &'a CleaningConfig,
}

// =============================================================================
// RULE STEPS
// =============================================================================

/// One transformation step. Formats run a fixed sequence of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleStep {
    /// Trim and collapse internal whitespace runs to one space.
    CollapseWhitespace,
    /// Apply the column's case policy.
    ApplyCase,
    Lowercase,
    ValidateEmail,
    /// ISO calendar date from any configured input pattern.
    ParseDate,
    /// Drop currency symbols, codes and thousands separators.
    StripCurrencySymbols,
    /// Fixed-decimal amount; `(12.50)` is negative.
    ParseAmount,
    /// Digits only, then the national template.
    PhoneTemplate,
    /// Decimal fraction from `0.15`, `15` or `15%`.
    ParsePercentage,
    MatchPattern,
    ParseNumber,
    /// Column `min`/`max` bounds.
    CheckRange,
    /// Case-insensitive match against the allowed values, kept in their spelling.
    MatchAllowed,
}

impl RuleStep {
    /// Step sequence for a format.
    pub fn sequence(format: ExpectedFormat) -> &'static [RuleStep] {
        use RuleStep::*;

        match format {
            ExpectedFormat::FreeText => &[CollapseWhitespace, ApplyCase],
            ExpectedFormat::Email => &[CollapseWhitespace, Lowercase, ValidateEmail],
            ExpectedFormat::Date => &[CollapseWhitespace, ParseDate],
            ExpectedFormat::Currency => {
                &[CollapseWhitespace, StripCurrencySymbols, ParseAmount, CheckRange]
            }
            ExpectedFormat::Phone => &[CollapseWhitespace, PhoneTemplate],
            ExpectedFormat::Percentage => &[CollapseWhitespace, ParsePercentage],
            ExpectedFormat::IdentifierPattern => &[CollapseWhitespace, ApplyCase, MatchPattern],
            ExpectedFormat::Numeric => &[CollapseWhitespace, ParseNumber, CheckRange],
            ExpectedFormat::Categorical => &[CollapseWhitespace, ApplyCase, MatchAllowed],
        }
    }

    /// Get a human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            RuleStep::CollapseWhitespace => "collapse-whitespace",
            RuleStep::ApplyCase => "apply-case",
            RuleStep::Lowercase => "lowercase",
            RuleStep::ValidateEmail => "validate-email",
            RuleStep::ParseDate => "parse-date",
            RuleStep::StripCurrencySymbols => "strip-currency-symbols",
            RuleStep::ParseAmount => "parse-amount",
            RuleStep::PhoneTemplate => "phone-template",
            RuleStep::ParsePercentage => "parse-percentage",
            RuleStep::MatchPattern => "match-pattern",
            RuleStep::ParseNumber => "parse-number",
            RuleStep::CheckRange => "check-range",
            RuleStep::MatchAllowed => "match-allowed",
        }
    }

    /// Run this step on a value.
    pub fn apply(&self, ctx: &RuleContext<'_>, value: &str) -> CellOutcome {
        match self {
            RuleStep::CollapseWhitespace => Ok(collapse_whitespace(value)),
            RuleStep::ApplyCase => Ok(ctx.column.case.apply(value)),
            RuleStep::Lowercase => Ok(value.to_lowercase()),
            RuleStep::ValidateEmail => {
                if EMAIL.is_match(value) {
                    Ok(value.to_string())
                } else {
                    fail(value, IssueKind::InvalidEmail)
                }
            }
            RuleStep::ParseDate => parse_date(ctx.config, value),
            RuleStep::StripCurrencySymbols => Ok(strip_currency(value)),
            RuleStep::ParseAmount => parse_amount(ctx.config, value),
            RuleStep::PhoneTemplate => phone_template(ctx.config, value),
            RuleStep::ParsePercentage => parse_percentage(value),
            RuleStep::MatchPattern => match ctx.pattern {
                Some(pattern) if pattern.is_match(value) => Ok(value.to_string()),
                Some(_) => fail(value, IssueKind::InvalidIdentifierPattern),
                None => Ok(value.to_string()),
            },
            RuleStep::ParseNumber => match parse_plain_number(value) {
                Some(number) => Ok(format_number(number)),
                None => fail(value, IssueKind::InvalidNumber),
            },
            RuleStep::CheckRange => match value.parse::<f64>() {
                Ok(number) if !ctx.column.in_range(number) => fail(value, IssueKind::OutOfRange),
                _ => Ok(value.to_string()),
            },
            RuleStep::MatchAllowed => {
                let allowed = &ctx.column.allowed_values;
                if allowed.is_empty() {
                    return Ok(value.to_string());
                }
                match allowed.iter().find(|a| a.eq_ignore_ascii_case(value)) {
                    Some(canonical) => Ok(canonical.clone()),
                    None => fail(value, IssueKind::OutOfRange),
                }
            }
        }
    }
}

/// Run a column's full rule set on a raw cell.
///
/// Empty cells short-circuit: they fail with `empty-required` on required
/// columns and clean to `""` otherwise.
pub fn clean_value(ctx: &RuleContext<'_>, raw: &str) -> CellOutcome {
    if raw.trim().is_empty() {
        return if ctx.column.required {
            fail("", IssueKind::EmptyRequired)
        } else {
            Ok(String::new())
        };
    }

    let mut value = raw.to_string();
    for step in RuleStep::sequence(ctx.column.expected_format) {
        value = step.apply(ctx, &value)?;
    }
    Ok(value)
}

// =============================================================================
// STEP IMPLEMENTATIONS
// =============================================================================

fn collapse_whitespace(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn parse_date(config: &CleaningConfig, value: &str) -> CellOutcome {
    let formats = std::iter::once(ISO_DATE).chain(config.date_formats.iter().map(String::as_str));
    for format in formats {
        let parsed = if format.contains("%H") {
            NaiveDateTime::parse_from_str(value, format).map(|dt| dt.date())
        } else {
            NaiveDate::parse_from_str(value, format)
        };
        if let Ok(date) = parsed {
            return Ok(date.format(ISO_DATE).to_string());
        }
    }
    fail(value, IssueKind::UnparseableDate)
}

/// Repeats until nothing changes: removing spaces can expose a code (`r s`).
fn strip_currency(value: &str) -> String {
    let mut current = value.to_string();
    loop {
        let next: String = CURRENCY_CODE
            .replace_all(&current, "")
            .chars()
            .filter(|c| !matches!(c, '$' | '₹' | '€' | '£' | '¥' | ',' | '_') && !c.is_whitespace())
            .collect();
        if next == current {
            return next;
        }
        current = next;
    }
}

fn parse_amount(config: &CleaningConfig, value: &str) -> CellOutcome {
    let (negative, body) = match value.strip_prefix('(').and_then(|v| v.strip_suffix(')')) {
        Some(inner) => (true, inner),
        None => (false, value),
    };

    match body.parse::<f64>() {
        Ok(amount) if amount.is_finite() => {
            let amount = if negative { -amount } else { amount };
            Ok(format!("{:.*}", config.currency_decimals, amount))
        }
        _ => fail(value, IssueKind::InvalidCurrency),
    }
}

fn phone_template(config: &CleaningConfig, value: &str) -> CellOutcome {
    let digits: String = value.chars().filter(|c| c.is_ascii_digit()).collect();
    let national_len = config.phone_national_digits;
    let code = config.phone_country_code.as_str();

    let national = if digits.len() == national_len {
        Some(digits.as_str())
    } else if digits.len() == code.len() + national_len && digits.starts_with(code) {
        Some(&digits[code.len()..])
    } else if digits.len() == national_len + 1 && digits.starts_with('0') {
        // trunk prefix
        Some(&digits[1..])
    } else {
        None
    };

    match national {
        Some(national) => Ok(format!("+{}-{}", code, national)),
        None => fail(value, IssueKind::InvalidPhone),
    }
}

fn parse_percentage(value: &str) -> CellOutcome {
    let (body, explicit_percent) = match value.strip_suffix('%') {
        Some(body) => (body.trim(), true),
        None => (value, false),
    };

    let Ok(number) = body.parse::<f64>() else {
        return fail(value, IssueKind::InvalidPercentage);
    };

    let fraction = if explicit_percent || (number > 1.0 && number <= 100.0) {
        number / 100.0
    } else {
        number
    };

    if fraction.is_finite() && (0.0..=1.0).contains(&fraction) {
        Ok(format_number(fraction))
    } else {
        fail(value, IssueKind::InvalidPercentage)
    }
}

fn parse_plain_number(value: &str) -> Option<f64> {
    let compact: String = value
        .chars()
        .filter(|c| !matches!(c, ',' | '_') && !c.is_whitespace())
        .collect();
    compact.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Integers without a fraction, everything else in shortest round-trip form.
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::CasePolicy;

    fn run(column: &CanonicalColumn, raw: &str) -> CellOutcome {
        let config = CleaningConfig::default();
        let pattern = column.pattern.as_deref().map(|p| Regex::new(p).unwrap());
        let ctx = RuleContext {
            column,
            pattern: pattern.as_ref(),
            config: &config,
        };
        clean_value(&ctx, raw)
    }

    fn kind(outcome: CellOutcome) -> IssueKind {
        outcome.unwrap_err().kind
    }

    #[test]
    fn test_free_text() {
        let col = CanonicalColumn::new("city", ExpectedFormat::FreeText).with_case(CasePolicy::Title);
        assert_eq!(run(&col, "  new   DELHI ").unwrap(), "New Delhi");
    }

    #[test]
    fn test_dates_normalize_to_iso() {
        let col = CanonicalColumn::new("order_date", ExpectedFormat::Date);
        for raw in ["03/14/2024", "2024-03-14", "14-Mar-2024", "March 14, 2024", "2024-03-14 09:30:00"] {
            assert_eq!(run(&col, raw).unwrap(), "2024-03-14", "{}", raw);
        }
        assert_eq!(kind(run(&col, "yesterday")), IssueKind::UnparseableDate);
    }

    #[test]
    fn test_custom_date_formats_still_write_iso() {
        let col = CanonicalColumn::new("order_date", ExpectedFormat::Date);
        let config = CleaningConfig {
            date_formats: vec!["%d/%m/%Y".to_string()],
            ..Default::default()
        };
        let ctx = RuleContext {
            column: &col,
            pattern: None,
            config: &config,
        };

        let once = clean_value(&ctx, "14/03/2024").unwrap();
        assert_eq!(once, "2024-03-14");
        assert_eq!(clean_value(&ctx, &once).unwrap(), once);
    }

    #[test]
    fn test_day_first_fallback() {
        let col = CanonicalColumn::new("d", ExpectedFormat::Date);
        assert_eq!(run(&col, "14/03/2024").unwrap(), "2024-03-14");
    }

    #[test]
    fn test_currency() {
        let col = CanonicalColumn::new("amount", ExpectedFormat::Currency);
        assert_eq!(run(&col, "$1,200.50").unwrap(), "1200.50");
        assert_eq!(run(&col, "Rs. 1,00,000").unwrap(), "100000.00");
        assert_eq!(run(&col, "₹ 499").unwrap(), "499.00");
        assert_eq!(run(&col, "(12.5)").unwrap(), "-12.50");
        assert_eq!(kind(run(&col, "N/A")), IssueKind::InvalidCurrency);
    }

    #[test]
    fn test_currency_range() {
        let col = CanonicalColumn::new("fee", ExpectedFormat::Currency).with_range(Some(0.0), None);
        assert_eq!(kind(run(&col, "-5")), IssueKind::OutOfRange);
    }

    #[test]
    fn test_phone() {
        let col = CanonicalColumn::new("phone", ExpectedFormat::Phone);
        assert_eq!(run(&col, "98765 43210").unwrap(), "+91-9876543210");
        assert_eq!(run(&col, "+91 (987) 654-3210").unwrap(), "+91-9876543210");
        assert_eq!(run(&col, "09876543210").unwrap(), "+91-9876543210");
        let failure = run(&col, "12345").unwrap_err();
        assert_eq!(failure.kind, IssueKind::InvalidPhone);
        assert_eq!(failure.partial, "12345");
    }

    #[test]
    fn test_percentage() {
        let col = CanonicalColumn::new("tax_pct", ExpectedFormat::Percentage);
        assert_eq!(run(&col, "18%").unwrap(), "0.18");
        assert_eq!(run(&col, "18").unwrap(), "0.18");
        assert_eq!(run(&col, "0.18").unwrap(), "0.18");
        assert_eq!(run(&col, "1").unwrap(), "1");
        assert_eq!(kind(run(&col, "150%")), IssueKind::InvalidPercentage);
        assert_eq!(kind(run(&col, "-3")), IssueKind::InvalidPercentage);
        assert_eq!(kind(run(&col, "lots")), IssueKind::InvalidPercentage);
    }

    #[test]
    fn test_identifier_pattern() {
        let col = CanonicalColumn::new("customer_id", ExpectedFormat::IdentifierPattern)
            .with_pattern(r"^CUST-\d+$")
            .with_case(CasePolicy::Upper);
        assert_eq!(run(&col, " cust-42 ").unwrap(), "CUST-42");
        let failure = run(&col, "client 42").unwrap_err();
        assert_eq!(failure.kind, IssueKind::InvalidIdentifierPattern);
        assert_eq!(failure.partial, "CLIENT 42");
    }

    #[test]
    fn test_numeric() {
        let col = CanonicalColumn::new("quantity", ExpectedFormat::Numeric).with_range(Some(1.0), None);
        assert_eq!(run(&col, "1,000").unwrap(), "1000");
        assert_eq!(run(&col, "2.50").unwrap(), "2.5");
        assert_eq!(kind(run(&col, "0")), IssueKind::OutOfRange);
        assert_eq!(kind(run(&col, "two")), IssueKind::InvalidNumber);
    }

    #[test]
    fn test_categorical() {
        let col = CanonicalColumn::new("currency", ExpectedFormat::Categorical)
            .with_allowed_values(&["INR", "USD"]);
        assert_eq!(run(&col, "inr").unwrap(), "INR");
        assert_eq!(kind(run(&col, "Rs")), IssueKind::OutOfRange);
    }

    #[test]
    fn test_email() {
        let col = CanonicalColumn::new("email", ExpectedFormat::Email);
        assert_eq!(run(&col, " Asha.Rao@Example.COM ").unwrap(), "asha.rao@example.com");
        assert_eq!(kind(run(&col, "asha at example")), IssueKind::InvalidEmail);
    }

    #[test]
    fn test_empty_cells() {
        let optional = CanonicalColumn::new("notes", ExpectedFormat::Date);
        assert_eq!(run(&optional, "   ").unwrap(), "");

        let required = CanonicalColumn::new("order_date", ExpectedFormat::Date).required();
        assert_eq!(kind(run(&required, "")), IssueKind::EmptyRequired);
    }

    #[test]
    fn test_steps_are_idempotent_on_samples() {
        let columns = [
            CanonicalColumn::new("a", ExpectedFormat::Currency),
            CanonicalColumn::new("b", ExpectedFormat::Percentage),
            CanonicalColumn::new("c", ExpectedFormat::Phone),
            CanonicalColumn::new("d", ExpectedFormat::Date),
            CanonicalColumn::new("e", ExpectedFormat::Numeric),
        ];
        let samples = ["$1,200.50", "7%", "0.125", "98765 43210", "14-Mar-2024", "1e3", "junk", ""];

        for column in &columns {
            for raw in samples {
                let once = match run(column, raw) {
                    Ok(v) => v,
                    Err(f) => f.partial,
                };
                let twice = match run(column, &once) {
                    Ok(v) => v,
                    Err(f) => f.partial,
                };
                assert_eq!(once, twice, "{} / {}", column.name, raw);
            }
        }
    }
}
