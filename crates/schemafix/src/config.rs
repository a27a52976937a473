//! Pipeline configuration.
//!
//! Every threshold and confidence floor is a policy constant rather than
//! hard-wired behavior. All sections deserialize from JSON with missing fields
//! taking their defaults.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SchemafixError};

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub mapper: MapperConfig,
    pub cleaning: CleaningConfig,
    pub suggester: SuggesterConfig,
}

impl PipelineConfig {
    /// Create a configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| SchemafixError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config: Self = serde_json::from_reader(BufReader::new(file))?;
        config.validate()?;
        Ok(config)
    }

    /// Set the mapper section.
    pub fn with_mapper(mut self, mapper: MapperConfig) -> Self {
        self.mapper = mapper;
        self
    }

    /// Set the cleaning section.
    pub fn with_cleaning(mut self, cleaning: CleaningConfig) -> Self {
        self.cleaning = cleaning;
        self
    }

    /// Set the suggester section.
    pub fn with_suggester(mut self, suggester: SuggesterConfig) -> Self {
        self.suggester = suggester;
        self
    }

    /// Reject thresholds outside [0, 1] and empty date pattern lists.
    pub fn validate(&self) -> Result<()> {
        let unit = [
            ("mapper.fuzzy_threshold", self.mapper.fuzzy_threshold),
            ("mapper.ambiguity_margin", self.mapper.ambiguity_margin),
            ("mapper.semantic_threshold", self.mapper.semantic_threshold),
            ("suggester.learned_confidence", self.suggester.learned_confidence),
            ("suggester.deterministic_confidence", self.suggester.deterministic_confidence),
            ("suggester.fallback_confidence", self.suggester.fallback_confidence),
        ];
        for (name, value) in unit {
            if !(0.0..=1.0).contains(&value) {
                return Err(SchemafixError::Config(format!(
                    "{} must be within [0, 1], got {}",
                    name, value
                )));
            }
        }
        if self.cleaning.date_formats.is_empty() {
            return Err(SchemafixError::Config(
                "cleaning.date_formats must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Column mapper thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapperConfig {
    /// Minimum fuzzy score to accept a match.
    pub fuzzy_threshold: f64,
    /// Runner-up scores closer than this make a fuzzy match ambiguous.
    pub ambiguity_margin: f64,
    /// Minimum semantic matcher confidence to accept a match.
    pub semantic_threshold: f64,
    /// Sample values passed to the semantic matcher.
    pub max_samples: usize,
    /// Timeout for one semantic matcher call.
    pub semantic_timeout_ms: u64,
}

impl Default for MapperConfig {
    fn default() -> Self {
        Self {
            fuzzy_threshold: 0.6,
            ambiguity_margin: 0.05,
            semantic_threshold: 0.5,
            max_samples: 5,
            semantic_timeout_ms: 10_000,
        }
    }
}

/// Cleaning rule policies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CleaningConfig {
    /// `chrono` input patterns tried in order, after ISO `%Y-%m-%d`. Patterns
    /// with a time component parse as date-times and keep only the date.
    /// Dates are always written as ISO.
    pub date_formats: Vec<String>,
    /// Country calling code prepended by the phone template.
    pub phone_country_code: String,
    /// Digits in a national phone number.
    pub phone_national_digits: usize,
    /// Decimal places for currency values.
    pub currency_decimals: usize,
}

impl Default for CleaningConfig {
    fn default() -> Self {
        Self {
            date_formats: [
                "%Y-%m-%d",
                "%m/%d/%Y",
                "%d/%m/%Y",
                "%Y/%m/%d",
                "%d-%b-%Y",
                "%d-%m-%Y",
                "%m-%d-%Y",
                "%d.%m.%Y",
                "%d %b %Y",
                "%d %B %Y",
                "%b %d, %Y",
                "%B %d, %Y",
                "%Y-%m-%d %H:%M:%S",
                "%Y-%m-%dT%H:%M:%S",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            phone_country_code: "91".to_string(),
            phone_national_digits: 10,
            currency_decimals: 2,
        }
    }
}

/// Fix suggester confidence policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SuggesterConfig {
    /// Confidence given to suggestions served from the learning store.
    pub learned_confidence: f64,
    /// Confidence given to deterministic repairs.
    pub deterministic_confidence: f64,
    /// Confidence when the suggestion capability is unavailable or errors.
    pub fallback_confidence: f64,
    /// Timeout for one suggestion capability call.
    pub capability_timeout_ms: u64,
    /// Try deterministic repairs before calling the capability.
    pub deterministic_repairs: bool,
}

impl SuggesterConfig {
    /// Capability timeout as a duration.
    pub fn capability_timeout(&self) -> Duration {
        Duration::from_millis(self.capability_timeout_ms)
    }
}

impl Default for SuggesterConfig {
    fn default() -> Self {
        Self {
            learned_confidence: 0.9,
            deterministic_confidence: 0.7,
            fallback_confidence: 0.3,
            capability_timeout_ms: 10_000,
            deterministic_repairs: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults_are_valid() {
        assert!(PipelineConfig::default().validate().is_ok());
    }

    #[test]
    fn test_load_partial_json() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"mapper": {{"fuzzy_threshold": 0.75}}}}"#).unwrap();

        let config = PipelineConfig::load(file.path()).unwrap();
        assert_eq!(config.mapper.fuzzy_threshold, 0.75);
        assert_eq!(config.mapper.semantic_threshold, 0.5);
        assert_eq!(config.suggester.fallback_confidence, 0.3);
    }

    #[test]
    fn test_rejects_out_of_range_threshold() {
        let config = PipelineConfig::new().with_mapper(MapperConfig {
            fuzzy_threshold: 1.5,
            ..Default::default()
        });
        assert!(matches!(config.validate(), Err(SchemafixError::Config(_))));
    }
}
