//! Mapping records produced by the column mapper.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SchemafixError};
use crate::input::DataTable;
use crate::schema::SchemaRegistry;

/// Strategy that produced a mapping, in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MappingType {
    /// Normalized name or synonym equality.
    Exact,
    /// String-similarity match above the fuzzy threshold.
    Fuzzy,
    /// Accepted answer from the semantic matcher.
    Semantic,
    /// Human assignment, or pending one when the column is unmapped.
    Manual,
}

impl MappingType {
    /// Get a human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            MappingType::Exact => "exact",
            MappingType::Fuzzy => "fuzzy",
            MappingType::Semantic => "semantic",
            MappingType::Manual => "manual",
        }
    }
}

impl fmt::Display for MappingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A source column as seen by the mapper.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceColumn {
    /// Header as it appears in the upload.
    pub raw_name: String,
    /// Non-empty sample values, in row order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub samples: Vec<String>,
}

impl SourceColumn {
    /// Create a source column without samples.
    pub fn new(raw_name: impl Into<String>) -> Self {
        Self {
            raw_name: raw_name.into(),
            samples: Vec::new(),
        }
    }

    /// Attach sample values.
    pub fn with_samples(mut self, samples: Vec<String>) -> Self {
        self.samples = samples;
        self
    }

    /// Source columns of a table, each with up to `max_samples` values.
    pub fn from_table(table: &DataTable, max_samples: usize) -> Vec<Self> {
        table
            .headers
            .iter()
            .enumerate()
            .map(|(i, h)| Self::new(h.clone()).with_samples(table.sample_values(i, max_samples)))
            .collect()
    }
}

/// Mapping of one source column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnMapping {
    /// Source header.
    pub source_column: String,
    /// Target canonical column; `None` while unmapped.
    pub canonical_column: Option<String>,
    /// Strategy that produced the mapping.
    pub mapping_type: MappingType,
    /// Confidence in [0, 1]; 1.0 for exact and manual, 0.0 while unmapped.
    pub confidence: f64,
    /// Short reason for the decision.
    pub explanation: String,
}

impl ColumnMapping {
    /// A mapping produced by a strategy.
    pub fn mapped(
        source: impl Into<String>,
        canonical: impl Into<String>,
        mapping_type: MappingType,
        confidence: f64,
        explanation: impl Into<String>,
    ) -> Self {
        Self {
            source_column: source.into(),
            canonical_column: Some(canonical.into()),
            mapping_type,
            confidence: confidence.clamp(0.0, 1.0),
            explanation: explanation.into(),
        }
    }

    /// A column awaiting manual assignment.
    pub fn unmapped(source: impl Into<String>, explanation: impl Into<String>) -> Self {
        Self {
            source_column: source.into(),
            canonical_column: None,
            mapping_type: MappingType::Manual,
            confidence: 0.0,
            explanation: explanation.into(),
        }
    }

    /// Whether this source column has a canonical target.
    pub fn is_mapped(&self) -> bool {
        self.canonical_column.is_some()
    }
}

/// A source column whose best fuzzy candidates were too close to call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AmbiguousMatch {
    /// Source header.
    pub source_column: String,
    /// Tied candidates with their scores, best first.
    pub candidates: Vec<(String, f64)>,
}

/// Canonical columns touched by a manual edit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MappingEdit {
    /// Canonical columns whose source changed, in edit order.
    pub affected: Vec<String>,
}

/// Result of mapping one upload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MappingReport {
    /// One entry per source column, in source order.
    pub mappings: Vec<ColumnMapping>,
    /// Canonical columns with no source, in schema order.
    pub missing: Vec<String>,
    /// Unresolved fuzzy ties.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ambiguous: Vec<AmbiguousMatch>,
    /// Extra source columns the human dropped from the output.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub discarded: Vec<String>,
}

impl MappingReport {
    /// Mapping entry for a source column.
    pub fn for_source(&self, source: &str) -> Option<&ColumnMapping> {
        self.mappings.iter().find(|m| m.source_column == source)
    }

    /// Mapping entry that targets a canonical column.
    pub fn for_canonical(&self, canonical: &str) -> Option<&ColumnMapping> {
        self.mappings
            .iter()
            .find(|m| m.canonical_column.as_deref() == Some(canonical))
    }

    /// Mapped entries, in source order.
    pub fn mapped(&self) -> impl Iterator<Item = &ColumnMapping> {
        self.mappings.iter().filter(|m| m.is_mapped())
    }

    /// Source columns with no canonical target that are still kept in the output.
    pub fn extra(&self) -> Vec<&str> {
        self.mappings
            .iter()
            .filter(|m| !m.is_mapped() && !self.discarded.contains(&m.source_column))
            .map(|m| m.source_column.as_str())
            .collect()
    }

    /// Required canonical columns with no source.
    pub fn missing_required(&self, registry: &SchemaRegistry) -> Vec<String> {
        registry
            .required_columns()
            .filter(|c| self.for_canonical(&c.name).is_none())
            .map(|c| c.name.clone())
            .collect()
    }

    /// Fail with [`SchemafixError::MappingAmbiguous`] for the first unresolved tie.
    pub fn ensure_unambiguous(&self) -> Result<()> {
        match self.ambiguous.first() {
            Some(tie) => Err(SchemafixError::MappingAmbiguous {
                column: tie.source_column.clone(),
                candidates: tie.candidates.iter().map(|(c, _)| c.clone()).collect(),
            }),
            None => Ok(()),
        }
    }

    /// Assign (or with `None`, unassign) a source column by hand.
    ///
    /// A manual assignment always wins: a different source column that held the
    /// target becomes unmapped.
    pub fn assign_manual(
        &mut self,
        registry: &SchemaRegistry,
        source: &str,
        canonical: Option<&str>,
    ) -> Result<MappingEdit> {
        let index = self
            .mappings
            .iter()
            .position(|m| m.source_column == source)
            .ok_or_else(|| SchemafixError::UnknownColumn(source.to_string()))?;

        if let Some(target) = canonical {
            if registry.get(target).is_none() {
                return Err(SchemafixError::UnknownColumn(target.to_string()));
            }
        }

        let mut edit = MappingEdit::default();
        let previous = self.mappings[index].canonical_column.clone();

        if let Some(old) = previous.as_deref() {
            if Some(old) != canonical {
                edit.affected.push(old.to_string());
            }
        }

        match canonical {
            Some(target) => {
                for (i, other) in self.mappings.iter_mut().enumerate() {
                    if i != index && other.canonical_column.as_deref() == Some(target) {
                        *other = ColumnMapping::unmapped(
                            other.source_column.clone(),
                            format!("Displaced by manual assignment of '{}'", source),
                        );
                    }
                }
                self.mappings[index] = ColumnMapping::mapped(
                    source,
                    target,
                    MappingType::Manual,
                    1.0,
                    "Manual assignment",
                );
                edit.affected.push(target.to_string());
            }
            None => {
                self.mappings[index] = ColumnMapping::unmapped(source, "Unassigned manually");
            }
        }

        self.ambiguous.retain(|a| a.source_column != source);
        self.discarded.retain(|d| d != source);
        self.refresh_missing(registry);

        Ok(edit)
    }

    /// Drop an extra source column from the output.
    pub fn discard_extra(&mut self, source: &str) -> Result<()> {
        let mapping = self
            .for_source(source)
            .ok_or_else(|| SchemafixError::UnknownColumn(source.to_string()))?;

        if let Some(target) = &mapping.canonical_column {
            return Err(SchemafixError::Config(format!(
                "Column '{}' is mapped to '{}'; unassign it before discarding",
                source, target
            )));
        }

        if !self.discarded.iter().any(|d| d == source) {
            self.discarded.push(source.to_string());
        }
        Ok(())
    }

    /// Recompute `missing` from the current mappings.
    pub fn refresh_missing(&mut self, registry: &SchemaRegistry) {
        self.missing = registry
            .names()
            .filter(|name| self.for_canonical(name).is_none())
            .map(str::to_string)
            .collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{CanonicalColumn, ExpectedFormat};

    fn registry() -> SchemaRegistry {
        SchemaRegistry::new(vec![
            CanonicalColumn::new("customer_id", ExpectedFormat::FreeText).required(),
            CanonicalColumn::new("email", ExpectedFormat::Email),
        ])
        .unwrap()
    }

    fn report() -> MappingReport {
        let mut report = MappingReport {
            mappings: vec![
                ColumnMapping::mapped("id", "customer_id", MappingType::Fuzzy, 0.8, "Fuzzy match"),
                ColumnMapping::unmapped("mail_to", "No candidate"),
                ColumnMapping::unmapped("notes", "No candidate"),
            ],
            ..Default::default()
        };
        report.refresh_missing(&registry());
        report
    }

    #[test]
    fn test_missing_and_extra() {
        let report = report();
        assert_eq!(report.missing, vec!["email"]);
        assert_eq!(report.extra(), vec!["mail_to", "notes"]);
        assert!(report.missing_required(&registry()).is_empty());
    }

    #[test]
    fn test_manual_assignment() {
        let registry = registry();
        let mut report = report();
        let edit = report.assign_manual(&registry, "mail_to", Some("email")).unwrap();

        assert_eq!(edit.affected, vec!["email"]);
        let mapping = report.for_source("mail_to").unwrap();
        assert_eq!(mapping.mapping_type, MappingType::Manual);
        assert_eq!(mapping.confidence, 1.0);
        assert!(report.missing.is_empty());
    }

    #[test]
    fn test_manual_assignment_displaces_holder() {
        let registry = registry();
        let mut report = report();
        let edit = report.assign_manual(&registry, "notes", Some("customer_id")).unwrap();

        assert_eq!(edit.affected, vec!["customer_id"]);
        assert!(!report.for_source("id").unwrap().is_mapped());
        assert_eq!(
            report.for_canonical("customer_id").unwrap().source_column,
            "notes"
        );
        assert_eq!(report.mapped().count(), 1);
    }

    #[test]
    fn test_unassign_reports_required_gap() {
        let registry = registry();
        let mut report = report();
        let edit = report.assign_manual(&registry, "id", None).unwrap();

        assert_eq!(edit.affected, vec!["customer_id"]);
        assert_eq!(report.missing_required(&registry), vec!["customer_id"]);
    }

    #[test]
    fn test_unknown_columns_rejected() {
        let registry = registry();
        let mut report = report();
        assert!(report.assign_manual(&registry, "nope", Some("email")).is_err());
        assert!(report.assign_manual(&registry, "notes", Some("nope")).is_err());
    }

    #[test]
    fn test_discard_extra() {
        let mut report = report();
        report.discard_extra("notes").unwrap();
        assert_eq!(report.extra(), vec!["mail_to"]);
        assert!(report.discard_extra("id").is_err());
    }

    #[test]
    fn test_ensure_unambiguous() {
        let mut report = report();
        assert!(report.ensure_unambiguous().is_ok());
        report.ambiguous.push(AmbiguousMatch {
            source_column: "mail_to".to_string(),
            candidates: vec![("email".to_string(), 0.7), ("customer_id".to_string(), 0.68)],
        });
        assert!(matches!(
            report.ensure_unambiguous(),
            Err(SchemafixError::MappingAmbiguous { .. })
        ));
    }
}
