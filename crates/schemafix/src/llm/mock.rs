//! Scripted capability for testing.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use crate::cleaning::IssueKind;
use crate::error::{Result, SchemafixError};
use crate::learning::normalize_pattern;
use crate::schema::CanonicalColumn;

use super::provider::{CapabilityFix, SemanticMatch, SemanticMatcher, SuggestionCapability};

/// Capability that returns scripted answers and counts its calls.
///
/// Unscripted questions get a "no match" / "no proposal" answer.
#[derive(Debug, Default)]
pub struct MockCapability {
    matches: HashMap<String, SemanticMatch>,
    fixes: HashMap<(String, String), CapabilityFix>,
    failing: bool,
    delay: Option<Duration>,
    match_calls: AtomicUsize,
    suggest_calls: AtomicUsize,
}

impl MockCapability {
    /// Create a mock with no scripted answers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `canonical` for the source header `column_name`.
    pub fn with_match(
        mut self,
        column_name: impl Into<String>,
        canonical: impl Into<String>,
        confidence: f64,
    ) -> Self {
        self.matches.insert(
            column_name.into(),
            SemanticMatch {
                candidate: Some(canonical.into()),
                confidence,
            },
        );
        self
    }

    /// Propose `value` for `raw_value` in `column`.
    pub fn with_fix(
        mut self,
        column: impl Into<String>,
        raw_value: &str,
        value: impl Into<String>,
        confidence: f64,
    ) -> Self {
        self.fixes.insert(
            (column.into(), normalize_pattern(raw_value)),
            CapabilityFix {
                suggested_value: Some(value.into()),
                confidence,
                rationale: "Scripted fix".to_string(),
            },
        );
        self
    }

    /// Fail every call.
    pub fn failing(mut self) -> Self {
        self.failing = true;
        self
    }

    /// Sleep before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of `match_column` calls so far.
    pub fn match_calls(&self) -> usize {
        self.match_calls.load(Ordering::SeqCst)
    }

    /// Number of `suggest_fix` calls so far.
    pub fn suggest_calls(&self) -> usize {
        self.suggest_calls.load(Ordering::SeqCst)
    }

    fn prepare(&self) -> Result<()> {
        if let Some(delay) = self.delay {
            thread::sleep(delay);
        }
        if self.failing {
            return Err(SchemafixError::CapabilityUnavailable {
                capability: "mock".to_string(),
                reason: "scripted failure".to_string(),
            });
        }
        Ok(())
    }
}

impl SemanticMatcher for MockCapability {
    fn match_column(
        &self,
        column_name: &str,
        _samples: &[String],
        candidates: &[CanonicalColumn],
    ) -> Result<SemanticMatch> {
        self.match_calls.fetch_add(1, Ordering::SeqCst);
        self.prepare()?;

        Ok(self
            .matches
            .get(column_name)
            .filter(|m| {
                m.candidate
                    .as_ref()
                    .is_some_and(|c| candidates.iter().any(|col| &col.name == c))
            })
            .cloned()
            .unwrap_or_else(SemanticMatch::none))
    }

    fn name(&self) -> &str {
        "mock"
    }
}

impl SuggestionCapability for MockCapability {
    fn suggest_fix(
        &self,
        column: &CanonicalColumn,
        _kind: IssueKind,
        raw_value: &str,
    ) -> Result<CapabilityFix> {
        self.suggest_calls.fetch_add(1, Ordering::SeqCst);
        self.prepare()?;

        Ok(self
            .fixes
            .get(&(column.name.clone(), normalize_pattern(raw_value)))
            .cloned()
            .unwrap_or_else(|| CapabilityFix {
                suggested_value: None,
                confidence: 0.0,
                rationale: "No scripted fix".to_string(),
            }))
    }

    fn name(&self) -> &str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ExpectedFormat;

    fn email() -> CanonicalColumn {
        CanonicalColumn::new("email", ExpectedFormat::Email)
    }

    #[test]
    fn test_scripted_match() {
        let mock = MockCapability::new().with_match("Kontakt", "email", 0.8);

        let answer = mock.match_column("Kontakt", &[], &[email()]).unwrap();
        assert_eq!(answer.candidate.as_deref(), Some("email"));
        assert_eq!(answer.confidence, 0.8);

        let unknown = mock.match_column("Other", &[], &[email()]).unwrap();
        assert_eq!(unknown, SemanticMatch::none());
        assert_eq!(mock.match_calls(), 2);
    }

    #[test]
    fn test_match_outside_candidates_is_none() {
        let mock = MockCapability::new().with_match("Kontakt", "email", 0.8);
        let answer = mock.match_column("Kontakt", &[], &[]).unwrap();
        assert!(answer.candidate.is_none());
    }

    #[test]
    fn test_scripted_fix_uses_normalized_value() {
        let mock = MockCapability::new().with_fix("email", "Bob At Mail", "bob@mail.com", 0.6);

        let fix = mock
            .suggest_fix(&email(), IssueKind::InvalidEmail, "  bob at  mail ")
            .unwrap();
        assert_eq!(fix.suggested_value.as_deref(), Some("bob@mail.com"));
        assert_eq!(mock.suggest_calls(), 1);
    }

    #[test]
    fn test_failing_mock() {
        let mock = MockCapability::new().failing();
        assert!(mock.match_column("x", &[], &[]).is_err());
        assert!(mock.suggest_fix(&email(), IssueKind::InvalidEmail, "x").is_err());
        assert_eq!(mock.match_calls(), 1);
        assert_eq!(mock.suggest_calls(), 1);
    }
}
