//! Canonical schema registry: the fixed, ordered target column set.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use indexmap::IndexMap;
use regex::Regex;
use serde::Deserialize;
use tracing::debug;

use super::column::CanonicalColumn;
use super::types::{CasePolicy, ExpectedFormat};
use crate::error::{Result, SchemafixError};

/// Normalize a column name for comparison: lower-case, separators collapsed to
/// single spaces.
///
/// `"Cust_ID "`, `"cust id"` and `"CUST-ID"` all normalize to `"cust id"`.
pub fn normalize_name(name: &str) -> String {
    name.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Ordered, immutable set of canonical columns.
#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    columns: IndexMap<String, CanonicalColumn>,
    /// Normalized name or synonym -> canonical name.
    aliases: HashMap<String, String>,
    /// Compiled identifier patterns by canonical name.
    patterns: HashMap<String, Regex>,
}

impl SchemaRegistry {
    /// Build a registry, validating names, synonyms and patterns.
    pub fn new(columns: Vec<CanonicalColumn>) -> Result<Self> {
        if columns.is_empty() {
            return Err(SchemafixError::Config(
                "Canonical schema has no columns".to_string(),
            ));
        }

        let mut ordered = IndexMap::with_capacity(columns.len());
        let mut aliases: HashMap<String, String> = HashMap::new();
        let mut patterns = HashMap::new();

        for column in columns {
            if column.name.trim().is_empty() {
                return Err(SchemafixError::Config(
                    "Canonical column with empty name".to_string(),
                ));
            }
            if ordered.contains_key(&column.name) {
                return Err(SchemafixError::Config(format!(
                    "Duplicate canonical column: '{}'",
                    column.name
                )));
            }

            for alias in std::iter::once(&column.name).chain(column.synonyms.iter()) {
                let key = normalize_name(alias);
                if key.is_empty() {
                    continue;
                }
                match aliases.get(&key) {
                    Some(owner) if owner != &column.name => {
                        return Err(SchemafixError::Config(format!(
                            "Name '{}' is claimed by both '{}' and '{}'",
                            alias, owner, column.name
                        )));
                    }
                    _ => {
                        aliases.insert(key, column.name.clone());
                    }
                }
            }

            match (&column.pattern, column.expected_format) {
                (Some(pattern), _) => {
                    patterns.insert(column.name.clone(), Regex::new(pattern)?);
                }
                (None, ExpectedFormat::IdentifierPattern) => {
                    return Err(SchemafixError::Config(format!(
                        "Identifier column '{}' has no pattern",
                        column.name
                    )));
                }
                (None, _) => {}
            }

            ordered.insert(column.name.clone(), column);
        }

        debug!(columns = ordered.len(), "canonical schema loaded");

        Ok(Self {
            columns: ordered,
            aliases,
            patterns,
        })
    }

    /// Load from a CSV with a `name` (or `canonical_name`) column and optional
    /// `description`, `example`, `expected_format`, `required`, `synonyms`,
    /// `pattern`, `allowed_values`, `min`, `max` and `case` columns.
    ///
    /// List-valued fields are `;`-separated.
    pub fn from_csv_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| SchemafixError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_csv_reader(BufReader::new(file))
    }

    /// Load from any CSV reader.
    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self> {
        let mut csv_reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
        let mut columns = Vec::new();

        for record in csv_reader.deserialize::<SchemaRecord>() {
            columns.push(record?.into_column()?);
        }

        Self::new(columns)
    }

    /// Load from a JSON array of column definitions.
    pub fn from_json_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| SchemafixError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let columns: Vec<CanonicalColumn> = serde_json::from_reader(BufReader::new(file))?;
        Self::new(columns)
    }

    /// Load by file extension: `.json` as JSON, anything else as CSV.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if path.extension().is_some_and(|e| e.eq_ignore_ascii_case("json")) {
            Self::from_json_path(path)
        } else {
            Self::from_csv_path(path)
        }
    }

    /// Columns in schema order.
    pub fn columns(&self) -> impl Iterator<Item = &CanonicalColumn> {
        self.columns.values()
    }

    /// Column names in schema order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(|k| k.as_str())
    }

    /// Look up a column by canonical name.
    pub fn get(&self, name: &str) -> Option<&CanonicalColumn> {
        self.columns.get(name)
    }

    /// Position of a column in schema order.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.columns.get_index_of(name)
    }

    /// Number of canonical columns.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Registries always hold at least one column.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Columns marked required.
    pub fn required_columns(&self) -> impl Iterator<Item = &CanonicalColumn> {
        self.columns.values().filter(|c| c.required)
    }

    /// Resolve a raw source name against canonical names and synonyms, after
    /// normalization.
    pub fn resolve_exact(&self, raw_name: &str) -> Option<&CanonicalColumn> {
        self.aliases
            .get(&normalize_name(raw_name))
            .and_then(|name| self.columns.get(name))
    }

    /// Compiled identifier pattern for a column.
    pub fn pattern(&self, name: &str) -> Option<&Regex> {
        self.patterns.get(name)
    }
}

/// One row of a schema CSV.
#[derive(Debug, Deserialize)]
struct SchemaRecord {
    #[serde(alias = "canonical_name")]
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    example: String,
    #[serde(default)]
    expected_format: String,
    #[serde(default)]
    required: String,
    #[serde(default)]
    synonyms: String,
    #[serde(default)]
    pattern: String,
    #[serde(default)]
    allowed_values: String,
    #[serde(default)]
    min: Option<f64>,
    #[serde(default)]
    max: Option<f64>,
    #[serde(default)]
    case: String,
}

impl SchemaRecord {
    fn into_column(self) -> Result<CanonicalColumn> {
        let format: ExpectedFormat = self.expected_format.parse()?;
        let case = match self.case.to_ascii_lowercase().as_str() {
            "" | "preserve" => CasePolicy::Preserve,
            "lower" => CasePolicy::Lower,
            "upper" => CasePolicy::Upper,
            "title" => CasePolicy::Title,
            other => {
                return Err(SchemafixError::Config(format!(
                    "Unknown case policy '{}' for column '{}'",
                    other, self.name
                )));
            }
        };

        let mut column = CanonicalColumn::new(self.name, format)
            .with_description(self.description)
            .with_example(self.example)
            .with_range(self.min, self.max)
            .with_case(case);

        column.required = matches!(
            self.required.to_ascii_lowercase().as_str(),
            "true" | "yes" | "y" | "1"
        );
        column.synonyms = split_list(&self.synonyms);
        column.allowed_values = split_list(&self.allowed_values);
        if !self.pattern.is_empty() {
            column.pattern = Some(self.pattern);
        }

        Ok(column)
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
