//! Format and case policies attached to canonical columns.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SchemafixError;

/// Expected value format of a canonical column. Selects the cleaning rule set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExpectedFormat {
    /// Arbitrary text; whitespace and case normalization only.
    FreeText,
    /// Calendar date, normalized to ISO `YYYY-MM-DD`.
    Date,
    /// Monetary amount, normalized to a plain decimal with two places.
    Currency,
    /// Telephone number, normalized to the national template.
    Phone,
    /// Ratio, normalized to a decimal fraction in [0, 1].
    Percentage,
    /// Code validated against the column's regular pattern.
    IdentifierPattern,
    /// Plain number, optionally range-checked.
    Numeric,
    /// One of a closed set of values.
    Categorical,
    /// Email address.
    Email,
}

impl ExpectedFormat {
    /// All formats, in declaration order.
    pub const ALL: [ExpectedFormat; 9] = [
        ExpectedFormat::FreeText,
        ExpectedFormat::Date,
        ExpectedFormat::Currency,
        ExpectedFormat::Phone,
        ExpectedFormat::Percentage,
        ExpectedFormat::IdentifierPattern,
        ExpectedFormat::Numeric,
        ExpectedFormat::Categorical,
        ExpectedFormat::Email,
    ];

    /// Get a human-readable label for this format.
    pub fn label(&self) -> &'static str {
        match self {
            ExpectedFormat::FreeText => "free-text",
            ExpectedFormat::Date => "date",
            ExpectedFormat::Currency => "currency",
            ExpectedFormat::Phone => "phone",
            ExpectedFormat::Percentage => "percentage",
            ExpectedFormat::IdentifierPattern => "identifier-pattern",
            ExpectedFormat::Numeric => "numeric",
            ExpectedFormat::Categorical => "categorical",
            ExpectedFormat::Email => "email",
        }
    }
}

impl fmt::Display for ExpectedFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ExpectedFormat {
    type Err = SchemafixError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_ascii_lowercase().replace(['_', ' '], "-");
        match key.as_str() {
            "" | "free-text" | "text" | "string" => Ok(ExpectedFormat::FreeText),
            "date" => Ok(ExpectedFormat::Date),
            "currency" | "money" => Ok(ExpectedFormat::Currency),
            "phone" => Ok(ExpectedFormat::Phone),
            "percentage" | "percent" => Ok(ExpectedFormat::Percentage),
            "identifier-pattern" | "identifier" => Ok(ExpectedFormat::IdentifierPattern),
            "numeric" | "number" | "integer" => Ok(ExpectedFormat::Numeric),
            "categorical" | "category" => Ok(ExpectedFormat::Categorical),
            "email" => Ok(ExpectedFormat::Email),
            other => Err(SchemafixError::Config(format!(
                "Unknown expected format: '{}'",
                other
            ))),
        }
    }
}

/// Case normalization applied by text-like rule sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CasePolicy {
    /// Leave case untouched.
    #[default]
    Preserve,
    Lower,
    Upper,
    /// Upper-case the first letter of each word, lower-case the rest.
    Title,
}

impl CasePolicy {
    /// Apply the policy to a value.
    pub fn apply(&self, value: &str) -> String {
        match self {
            CasePolicy::Preserve => value.to_string(),
            CasePolicy::Lower => value.to_lowercase(),
            CasePolicy::Upper => value.to_uppercase(),
            CasePolicy::Title => value
                .split(' ')
                .map(|word| {
                    let mut chars = word.chars();
                    match chars.next() {
                        Some(first) => {
                            first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect()
                        }
                        None => String::new(),
                    }
                })
                .collect::<Vec<String>>()
                .join(" "),
        }
    }
}
