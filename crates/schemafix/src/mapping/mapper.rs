//! Multi-strategy column mapper: exact, then fuzzy, then semantic, then manual.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use super::similarity::name_similarity;
use super::types::{AmbiguousMatch, ColumnMapping, MappingReport, MappingType, SourceColumn};
use crate::config::MapperConfig;
use crate::input::DataTable;
use crate::llm::{call_with_timeout, SemanticMatcher};
use crate::schema::{normalize_name, CanonicalColumn, SchemaRegistry};

/// A strategy's claim on a canonical column, before conflicts are resolved.
struct Claim {
    source_index: usize,
    canonical: String,
    confidence: f64,
}

/// Maps source headers onto the canonical schema.
///
/// Mapping is deterministic for identical inputs, thresholds and matcher
/// answers, and never mutates shared state.
pub struct ColumnMapper {
    registry: Arc<SchemaRegistry>,
    config: MapperConfig,
    semantic: Option<Arc<dyn SemanticMatcher>>,
}

impl ColumnMapper {
    /// Create a mapper with default thresholds and no semantic matcher.
    pub fn new(registry: Arc<SchemaRegistry>) -> Self {
        Self {
            registry,
            config: MapperConfig::default(),
            semantic: None,
        }
    }

    /// Use custom thresholds.
    pub fn with_config(mut self, config: MapperConfig) -> Self {
        self.config = config;
        self
    }

    /// Enable the semantic strategy.
    pub fn with_semantic_matcher(mut self, matcher: Arc<dyn SemanticMatcher>) -> Self {
        self.semantic = Some(matcher);
        self
    }

    /// Get the mapper configuration.
    pub fn config(&self) -> &MapperConfig {
        &self.config
    }

    /// Map the headers of a table, sampling values for the semantic strategy.
    pub fn map_table(&self, table: &DataTable) -> MappingReport {
        self.map(&SourceColumn::from_table(table, self.config.max_samples))
    }

    /// Map source columns. Each canonical column receives at most one source.
    pub fn map(&self, sources: &[SourceColumn]) -> MappingReport {
        let mut results: Vec<Option<ColumnMapping>> = vec![None; sources.len()];
        let mut notes: Vec<String> =
            vec!["No canonical column above threshold".to_string(); sources.len()];
        let mut claimed: HashSet<String> = HashSet::new();

        // 1. Exact: normalized name or synonym equality.
        for (i, source) in sources.iter().enumerate() {
            let Some(column) = self.registry.resolve_exact(&source.raw_name) else {
                continue;
            };
            if claimed.insert(column.name.clone()) {
                let how = if normalize_name(&source.raw_name) == normalize_name(&column.name) {
                    "Exact match"
                } else {
                    "Synonym match"
                };
                results[i] = Some(ColumnMapping::mapped(
                    &source.raw_name,
                    &column.name,
                    MappingType::Exact,
                    1.0,
                    how,
                ));
            } else {
                notes[i] = format!("Exact match '{}' already claimed", column.name);
            }
        }

        // 2. Fuzzy: best unclaimed candidate, unless the runner-up is too close.
        let mut ambiguous = Vec::new();
        let mut fuzzy_claims = Vec::new();

        for (i, source) in sources.iter().enumerate() {
            if results[i].is_some() {
                continue;
            }

            let ranked = self.rank_fuzzy(&source.raw_name, &claimed);
            let Some(&(best_name, best_score)) = ranked.first() else {
                continue;
            };
            if best_score < self.config.fuzzy_threshold {
                continue;
            }

            let tied: Vec<(String, f64)> = ranked
                .iter()
                .take_while(|(_, score)| best_score - score < self.config.ambiguity_margin)
                .map(|(name, score)| (name.to_string(), *score))
                .collect();

            if tied.len() > 1 {
                debug!(source = %source.raw_name, candidates = tied.len(), "ambiguous fuzzy match");
                notes[i] = format!(
                    "Ambiguous fuzzy match between {}",
                    tied.iter().map(|(n, _)| n.as_str()).collect::<Vec<_>>().join(", ")
                );
                ambiguous.push(AmbiguousMatch {
                    source_column: source.raw_name.clone(),
                    candidates: tied,
                });
            } else {
                fuzzy_claims.push(Claim {
                    source_index: i,
                    canonical: best_name.to_string(),
                    confidence: best_score,
                });
            }
        }

        for claim in resolve_claims(fuzzy_claims) {
            let i = claim.source_index;
            if claimed.insert(claim.canonical.clone()) {
                results[i] = Some(ColumnMapping::mapped(
                    &sources[i].raw_name,
                    claim.canonical,
                    MappingType::Fuzzy,
                    claim.confidence,
                    fuzzy_explanation(claim.confidence),
                ));
            } else {
                notes[i] = format!("Fuzzy match '{}' taken by a stronger match", claim.canonical);
            }
        }

        // 3. Semantic: delegate what is left to the external matcher.
        if let Some(matcher) = &self.semantic {
            let claims = self.semantic_claims(matcher, sources, &results, &claimed, &mut notes);
            for claim in resolve_claims(claims) {
                let i = claim.source_index;
                if claimed.insert(claim.canonical.clone()) {
                    ambiguous.retain(|a: &AmbiguousMatch| a.source_column != sources[i].raw_name);
                    results[i] = Some(ColumnMapping::mapped(
                        &sources[i].raw_name,
                        claim.canonical,
                        MappingType::Semantic,
                        claim.confidence,
                        "Semantic match",
                    ));
                } else {
                    notes[i] =
                        format!("Semantic match '{}' taken by a stronger match", claim.canonical);
                }
            }
        }

        // 4. Manual: everything unresolved waits for a human.
        let mappings: Vec<ColumnMapping> = results
            .into_iter()
            .zip(notes)
            .zip(sources)
            .map(|((result, note), source)| {
                result.unwrap_or_else(|| ColumnMapping::unmapped(&source.raw_name, note))
            })
            .collect();

        for mapping in &mappings {
            debug!(
                source = %mapping.source_column,
                canonical = mapping.canonical_column.as_deref().unwrap_or("-"),
                mapping_type = mapping.mapping_type.label(),
                confidence = mapping.confidence,
                "column mapping"
            );
        }

        let mut report = MappingReport {
            mappings,
            ambiguous,
            ..Default::default()
        };
        report.refresh_missing(&self.registry);

        info!(
            mapped = report.mapped().count(),
            missing = report.missing.len(),
            extra = report.extra().len(),
            ambiguous = report.ambiguous.len(),
            "mapping complete"
        );

        report
    }

    /// Unclaimed canonical columns scored against a source name, best first.
    /// Equal scores keep schema order.
    fn rank_fuzzy<'a>(&'a self, raw_name: &str, claimed: &HashSet<String>) -> Vec<(&'a str, f64)> {
        let mut ranked: Vec<(&str, f64)> = self
            .registry
            .columns()
            .filter(|c| !claimed.contains(&c.name))
            .map(|c| (c.name.as_str(), column_similarity(raw_name, c)))
            .collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        ranked
    }

    fn semantic_claims(
        &self,
        matcher: &Arc<dyn SemanticMatcher>,
        sources: &[SourceColumn],
        results: &[Option<ColumnMapping>],
        claimed: &HashSet<String>,
        notes: &mut [String],
    ) -> Vec<Claim> {
        let open: Vec<CanonicalColumn> = self
            .registry
            .columns()
            .filter(|c| !claimed.contains(&c.name))
            .cloned()
            .collect();
        if open.is_empty() {
            return Vec::new();
        }

        let timeout = Duration::from_millis(self.config.semantic_timeout_ms);
        let mut claims = Vec::new();

        for (i, source) in sources.iter().enumerate() {
            if results[i].is_some() {
                continue;
            }

            let matcher = Arc::clone(matcher);
            let capability = matcher.name().to_string();
            let name = source.raw_name.clone();
            let samples: Vec<String> =
                source.samples.iter().take(self.config.max_samples).cloned().collect();
            let candidates = open.clone();

            let answer = call_with_timeout(&capability, timeout, move || {
                matcher.match_column(&name, &samples, &candidates)
            });

            match answer {
                Ok(answer) => match answer.candidate {
                    Some(candidate)
                        if answer.confidence >= self.config.semantic_threshold
                            && open.iter().any(|c| c.name == candidate) =>
                    {
                        claims.push(Claim {
                            source_index: i,
                            canonical: candidate,
                            confidence: answer.confidence,
                        });
                    }
                    Some(candidate) => {
                        notes[i] = format!(
                            "Semantic candidate '{}' rejected (confidence {:.2})",
                            candidate, answer.confidence
                        );
                    }
                    None => {}
                },
                Err(e) => {
                    warn!(source = %source.raw_name, error = %e, "semantic matcher unavailable");
                    notes[i] = "Semantic matcher unavailable".to_string();
                }
            }
        }

        claims
    }
}

/// Best similarity of a source name against a column's name and synonyms.
fn column_similarity(raw_name: &str, column: &CanonicalColumn) -> f64 {
    std::iter::once(&column.name)
        .chain(column.synonyms.iter())
        .map(|alias| name_similarity(raw_name, alias))
        .fold(0.0, f64::max)
}

/// Order claims strongest first; earlier source columns win exact ties.
fn resolve_claims(mut claims: Vec<Claim>) -> Vec<Claim> {
    claims.sort_by(|a, b| {
        b.confidence
            .total_cmp(&a.confidence)
            .then(a.source_index.cmp(&b.source_index))
    });
    claims
}

fn fuzzy_explanation(score: f64) -> &'static str {
    if score >= 0.8 {
        "High confidence fuzzy match"
    } else if score >= 0.6 {
        "Medium confidence fuzzy match"
    } else {
        "Low confidence fuzzy match"
    }
}
