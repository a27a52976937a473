//! Ollama local LLM capability.
//!
//! Ollama runs models locally without API keys.
//! Install from: https://ollama.ai

use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::Deserialize;
use serde_json::json;

use crate::cleaning::IssueKind;
use crate::error::{Result, SchemafixError};
use crate::schema::CanonicalColumn;

use super::prompts;
use super::provider::{CapabilityFix, LlmConfig, SemanticMatch, SemanticMatcher, SuggestionCapability};

/// Default Ollama API endpoint.
const DEFAULT_API_URL: &str = "http://localhost:11434/api/chat";

/// Semantic matcher and fix suggester backed by a local Ollama model.
pub struct OllamaCapability {
    client: Client,
    api_url: String,
    config: LlmConfig,
}

impl OllamaCapability {
    /// Create with default settings.
    ///
    /// Uses llama3.2 by default. Make sure you've pulled it:
    /// `ollama pull llama3.2`
    pub fn new() -> Result<Self> {
        Self::with_config(LlmConfig::default())
    }

    /// Create with a specific model.
    pub fn with_model(model: impl Into<String>) -> Result<Self> {
        let config = LlmConfig {
            model: model.into(),
            ..LlmConfig::default()
        };
        Self::with_config(config)
    }

    /// Create with custom configuration.
    pub fn with_config(config: LlmConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(120)) // Local models can be slower
            .build()
            .map_err(|e| SchemafixError::Config(format!("Failed to create HTTP client: {}", e)))?;

        let api_url = std::env::var("OLLAMA_HOST")
            .map(|host| format!("{}/api/chat", host.trim_end_matches('/')))
            .unwrap_or_else(|_| DEFAULT_API_URL.to_string());

        Ok(Self {
            client,
            api_url,
            config,
        })
    }

    /// Get the configuration.
    pub fn config(&self) -> &LlmConfig {
        &self.config
    }

    fn unavailable(reason: impl Into<String>) -> SchemafixError {
        SchemafixError::CapabilityUnavailable {
            capability: "ollama".to_string(),
            reason: reason.into(),
        }
    }

    /// Build headers for API requests.
    fn build_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers
    }

    /// Send a message to Ollama.
    fn send_message(&self, user_prompt: &str) -> Result<String> {
        let body = json!({
            "model": self.config.model,
            "stream": false,
            "format": "json",
            "options": {
                "temperature": self.config.temperature,
                "num_predict": self.config.max_tokens
            },
            "messages": [
                {
                    "role": "system",
                    "content": prompts::system_prompt()
                },
                {
                    "role": "user",
                    "content": user_prompt
                }
            ]
        });

        let response = self
            .client
            .post(&self.api_url)
            .headers(self.build_headers())
            .json(&body)
            .send()
            .map_err(|e| {
                if e.is_connect() {
                    Self::unavailable("failed to connect to Ollama; start it with `ollama serve`")
                } else {
                    Self::unavailable(format!("request failed: {}", e))
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().unwrap_or_default();

            if error_text.contains("not found") {
                return Err(Self::unavailable(format!(
                    "model '{}' not found; pull it with `ollama pull {}`",
                    self.config.model, self.config.model
                )));
            }

            return Err(Self::unavailable(format!("HTTP {}: {}", status, error_text)));
        }

        let api_response: OllamaResponse = response
            .json()
            .map_err(|e| Self::unavailable(format!("failed to parse response: {}", e)))?;

        Ok(api_response.message.content)
    }
}

impl SemanticMatcher for OllamaCapability {
    fn match_column(
        &self,
        column_name: &str,
        samples: &[String],
        candidates: &[CanonicalColumn],
    ) -> Result<SemanticMatch> {
        let prompt = prompts::semantic_match_prompt(column_name, samples, candidates);
        let response = self.send_message(&prompt)?;
        let parsed: MatchResponse = parse_json_response(&response)?;

        // A name outside the candidate list is treated as no answer.
        let candidate = parsed
            .candidate
            .filter(|c| candidates.iter().any(|col| &col.name == c));

        Ok(SemanticMatch {
            confidence: if candidate.is_some() {
                parsed.confidence.clamp(0.0, 1.0)
            } else {
                0.0
            },
            candidate,
        })
    }

    fn name(&self) -> &str {
        "ollama"
    }
}

impl SuggestionCapability for OllamaCapability {
    fn suggest_fix(
        &self,
        column: &CanonicalColumn,
        kind: IssueKind,
        raw_value: &str,
    ) -> Result<CapabilityFix> {
        let prompt = prompts::fix_prompt(column, kind, raw_value);
        let response = self.send_message(&prompt)?;
        let parsed: FixResponse = parse_json_response(&response)?;

        Ok(CapabilityFix {
            suggested_value: parsed.suggested_value.filter(|v| !v.trim().is_empty()),
            confidence: parsed.confidence.clamp(0.0, 1.0),
            rationale: parsed.rationale,
        })
    }

    fn name(&self) -> &str {
        "ollama"
    }
}

/// Parse JSON from an LLM response, handling markdown code blocks.
fn parse_json_response<T: for<'de> Deserialize<'de>>(response: &str) -> Result<T> {
    let json_str = if response.contains("```json") {
        response
            .split("```json")
            .nth(1)
            .and_then(|s| s.split("```").next())
            .map(|s| s.trim())
            .unwrap_or(response)
    } else if response.contains("```") {
        response
            .split("```")
            .nth(1)
            .map(|s| s.trim())
            .unwrap_or(response)
    } else {
        response.trim()
    };

    serde_json::from_str(json_str).map_err(|e| {
        SchemafixError::CapabilityUnavailable {
            capability: "ollama".to_string(),
            reason: format!("unparseable answer: {}", e),
        }
    })
}

/// Ollama API response structure.
#[derive(Debug, Deserialize)]
struct OllamaResponse {
    message: OllamaMessage,
}

#[derive(Debug, Deserialize)]
struct OllamaMessage {
    content: String,
}

/// Parsed semantic match answer.
#[derive(Debug, Deserialize)]
struct MatchResponse {
    #[serde(default)]
    candidate: Option<String>,
    #[serde(default)]
    confidence: f64,
}

/// Parsed fix answer.
#[derive(Debug, Deserialize)]
struct FixResponse {
    #[serde(default)]
    suggested_value: Option<String>,
    #[serde(default)]
    confidence: f64,
    #[serde(default)]
    rationale: String,
}
