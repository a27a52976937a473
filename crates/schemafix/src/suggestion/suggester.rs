//! Issue-targeted fix suggestion.
//!
//! For every open issue the suggester consults, in order:
//!
//! 1. the learning store (a hit skips everything below),
//! 2. deterministic repairs validated by the column's own rules,
//! 3. the optional suggestion capability, under a timeout.
//!
//! A capability failure degrades to a "no value" suggestion at the fallback
//! confidence. The suggester only reads the learning store.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, info, trace, warn};

use super::repair::repair;
use super::suggestion::{suggestion_id, FixSource, FixSuggestion};
use crate::cleaning::{RuleEngine, ValidationIssue};
use crate::config::SuggesterConfig;
use crate::error::{Result, SchemafixError};
use crate::learning::{IssueSignature, LearningStore};
use crate::llm::{call_with_timeout, SuggestionCapability};

/// Value, confidence and provenance shared by every issue with one signature.
#[derive(Debug, Clone)]
struct Proposal {
    value: Option<String>,
    confidence: f64,
    source: FixSource,
    rationale: String,
}

/// Counters for one `suggest` call.
#[derive(Debug, Default)]
struct SuggestStats {
    learned: usize,
    deterministic: usize,
    capability_calls: usize,
    fallbacks: usize,
}

/// Produces [`FixSuggestion`]s for open validation issues.
pub struct FixSuggester {
    store: Arc<LearningStore>,
    engine: Arc<RuleEngine>,
    capability: Option<Arc<dyn SuggestionCapability>>,
    config: SuggesterConfig,
}

impl FixSuggester {
    /// Create a suggester without an external capability.
    pub fn new(store: Arc<LearningStore>, engine: Arc<RuleEngine>) -> Self {
        Self {
            store,
            engine,
            capability: None,
            config: SuggesterConfig::default(),
        }
    }

    /// Use an external suggestion capability on store misses.
    pub fn with_capability(mut self, capability: Arc<dyn SuggestionCapability>) -> Self {
        self.capability = Some(capability);
        self
    }

    /// Use custom confidence policies.
    pub fn with_config(mut self, config: SuggesterConfig) -> Self {
        self.config = config;
        self
    }

    /// Get the configuration.
    pub fn config(&self) -> &SuggesterConfig {
        &self.config
    }

    /// The learning store this suggester reads.
    pub fn store(&self) -> &Arc<LearningStore> {
        &self.store
    }

    /// Suggest a fix for each issue, in issue order.
    pub fn suggest(&self, issues: &[ValidationIssue]) -> Vec<FixSuggestion> {
        match self.suggest_cancellable(issues, &AtomicBool::new(false)) {
            Ok(suggestions) => suggestions,
            Err(_) => Vec::new(),
        }
    }

    /// Suggest with a cancellation flag checked between issues.
    pub fn suggest_cancellable(
        &self,
        issues: &[ValidationIssue],
        cancel: &AtomicBool,
    ) -> Result<Vec<FixSuggestion>> {
        let mut proposals: HashMap<IssueSignature, Proposal> = HashMap::new();
        let mut stats = SuggestStats::default();
        let mut suggestions = Vec::with_capacity(issues.len());

        for issue in issues {
            if cancel.load(Ordering::SeqCst) {
                return Err(SchemafixError::Cancelled(String::new()));
            }

            let signature = IssueSignature::from_issue(issue);
            let proposal = match proposals.get(&signature) {
                Some(proposal) => proposal.clone(),
                None => {
                    let proposal = self.propose(issue, &signature, &mut stats);
                    proposals.insert(signature, proposal.clone());
                    proposal
                }
            };

            let suggestion = FixSuggestion::new(issue, proposal.source)
                .with_id(suggestion_id(suggestions.len() + 1))
                .with_value(proposal.value)
                .with_confidence(proposal.confidence)
                .with_rationale(proposal.rationale);
            suggestions.push(suggestion);
        }

        info!(
            suggestions = suggestions.len(),
            signatures = proposals.len(),
            learned = stats.learned,
            deterministic = stats.deterministic,
            capability_calls = stats.capability_calls,
            fallbacks = stats.fallbacks,
            "suggestions generated"
        );

        Ok(suggestions)
    }

    fn propose(
        &self,
        issue: &ValidationIssue,
        signature: &IssueSignature,
        stats: &mut SuggestStats,
    ) -> Proposal {
        if let Some(fix) = self.store.lookup(signature) {
            debug!(signature = %signature, "learning store hit");
            stats.learned += 1;
            return Proposal {
                value: Some(fix.resolution),
                confidence: self.config.learned_confidence,
                source: FixSource::Learned,
                rationale: format!(
                    "Learned fix, promoted {} time(s)",
                    fix.occurrences
                ),
            };
        }

        let Some(column) = self.engine.registry().get(&issue.canonical_column).cloned() else {
            stats.fallbacks += 1;
            return self.fallback(format!(
                "Column '{}' is not in the schema",
                issue.canonical_column
            ));
        };

        if self.config.deterministic_repairs {
            if let Some(fixed) = repair(&self.engine, &column, issue.issue_kind, &issue.raw_value) {
                debug!(signature = %signature, "deterministic repair");
                stats.deterministic += 1;
                return Proposal {
                    value: Some(fixed.value),
                    confidence: self.config.deterministic_confidence,
                    source: FixSource::Generated,
                    rationale: fixed.rationale,
                };
            }
        }

        let Some(capability) = &self.capability else {
            stats.fallbacks += 1;
            return self.fallback("No learned fix and no suggestion capability configured");
        };

        stats.capability_calls += 1;
        let name = capability.name().to_string();
        let worker = Arc::clone(capability);
        let kind = issue.issue_kind;
        let raw = issue.raw_value.clone();
        let column_meta = column.clone();
        trace!(signature = %signature, raw = %issue.raw_value, "calling suggestion capability");

        let answer = call_with_timeout(&name, self.config.capability_timeout(), move || {
            worker.suggest_fix(&column_meta, kind, &raw)
        });

        match answer {
            Ok(fix) => {
                let confidence = if fix.confidence.is_finite() {
                    fix.confidence.clamp(0.0, 1.0)
                } else {
                    self.config.fallback_confidence
                };
                let rationale = if fix.rationale.is_empty() {
                    format!("Suggested by {}", name)
                } else {
                    fix.rationale
                };
                match fix.suggested_value {
                    Some(value) => match self.engine.clean_cell(&column, &value) {
                        Ok(clean) => Proposal {
                            value: Some(clean),
                            confidence,
                            source: FixSource::Generated,
                            rationale,
                        },
                        // Offered for review, but capped: the column rules reject it.
                        Err(_) => Proposal {
                            value: Some(value),
                            confidence: confidence.min(self.config.fallback_confidence),
                            source: FixSource::Generated,
                            rationale: format!("{} (fails column rules)", rationale),
                        },
                    },
                    None => Proposal {
                        value: None,
                        confidence,
                        source: FixSource::Generated,
                        rationale,
                    },
                }
            }
            Err(e) => {
                warn!(signature = %signature, error = %e, "suggestion capability unavailable");
                stats.fallbacks += 1;
                self.fallback(format!("No suggestion: {}", e))
            }
        }
    }

    fn fallback(&self, rationale: impl Into<String>) -> Proposal {
        Proposal {
            value: None,
            confidence: self.config.fallback_confidence,
            source: FixSource::Generated,
            rationale: rationale.into(),
        }
    }
}
