//! CLI command implementations.

pub mod cleanup;
pub mod finalize;
pub mod fix;
pub mod learned;
pub mod map;
pub mod map_edit;
pub mod run;
pub mod schema;
pub mod status;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use schemafix::{
    FileStore, IssueSignature, KeyValueStore, OllamaCapability, Pipeline, PipelineConfig,
    SchemaRegistry, Session,
};

use crate::cli::LlmChoice;

pub type CommandResult = Result<(), Box<dyn std::error::Error>>;

/// Options shared by every command.
pub struct Context {
    pub state_dir: PathBuf,
    pub schema: Option<PathBuf>,
    pub config: Option<PathBuf>,
}

impl Context {
    /// Load the schema given with `--schema`, or the built-in one.
    pub fn registry(&self) -> schemafix::Result<Arc<SchemaRegistry>> {
        let registry = match &self.schema {
            Some(path) => SchemaRegistry::from_path(path)?,
            None => SchemaRegistry::builtin()?,
        };
        Ok(Arc::new(registry))
    }

    /// Load `--config`, or the defaults.
    pub fn pipeline_config(&self) -> schemafix::Result<PipelineConfig> {
        match &self.config {
            Some(path) => PipelineConfig::load(path),
            None => Ok(PipelineConfig::default()),
        }
    }

    /// A pipeline persisting to the state directory.
    pub fn pipeline(&self, llm: &LlmChoice, model: Option<&str>) -> schemafix::Result<Pipeline> {
        let store: Arc<dyn KeyValueStore> = Arc::new(FileStore::open(&self.state_dir)?);
        let mut pipeline = Pipeline::new(self.registry()?)
            .with_config(self.pipeline_config()?)
            .with_store(store)?;

        if let LlmChoice::Ollama = llm {
            let ollama = Arc::new(match model {
                Some(model) => OllamaCapability::with_model(model)?,
                None => OllamaCapability::new()?,
            });
            pipeline = pipeline
                .with_semantic_matcher(ollama.clone())
                .with_suggestion_capability(ollama);
        }

        Ok(pipeline)
    }

    /// A pipeline with `session` restored from its checkpoint.
    pub fn resume(&self, session: &str) -> schemafix::Result<Pipeline> {
        let pipeline = self.pipeline(&LlmChoice::None, None)?;
        pipeline.resume(session)?;
        Ok(pipeline)
    }
}

/// Find the signature named by a suggestion id or a signature id prefix.
pub fn resolve_signature(session: &Session, needle: &str) -> Result<IssueSignature, String> {
    if let Some(suggestion) = session.suggestions.iter().find(|s| s.id == needle) {
        return Ok(suggestion.issue_signature.clone());
    }

    let mut matches: Vec<&IssueSignature> = session
        .pending_suggestions()
        .map(|s| &s.issue_signature)
        .filter(|sig| sig.fingerprint().starts_with(needle))
        .collect();
    matches.sort();
    matches.dedup();

    match matches.as_slice() {
        [one] => Ok((*one).clone()),
        [] => Err(format!("No pending suggestion matches '{}'", needle)),
        _ => Err(format!(
            "'{}' matches {} signatures; use a longer prefix",
            needle,
            matches.len()
        )),
    }
}

/// Display form of a path for messages.
pub fn shown(path: &Path) -> String {
    path.display().to_string()
}
