//! Processing orchestrator.
//!
//! Each session sits behind its own mutex, so its stage transitions never
//! overlap, while distinct sessions run in parallel. Stages compute on the
//! locked session and commit only on success: a failed or cancelled stage
//! leaves the previous stage's outputs untouched.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{Duration, Utc};
use parking_lot::{Mutex, RwLock};
use tracing::{debug, info};

use super::session::{FixDecision, Session};
use super::stage::Stage;
use super::summary::ProcessingSummary;
use crate::cleaning::{CleanReport, RuleEngine};
use crate::config::PipelineConfig;
use crate::error::{Result, SchemafixError};
use crate::input::{DataTable, Parser};
use crate::learning::{IssueSignature, LearningStore};
use crate::llm::{SemanticMatcher, SuggestionCapability};
use crate::mapping::{ColumnMapper, MappingEdit, MappingReport};
use crate::schema::SchemaRegistry;
use crate::store::{load_json, save_json, KeyValueStore, MemoryStore};
use crate::suggestion::{FixSuggester, FixSuggestion};

/// Namespace session checkpoints are persisted under.
pub const SESSION_NAMESPACE: &str = "sessions";

/// Namespace finalized sessions are moved to by [`Pipeline::archive`].
pub const ARCHIVE_NAMESPACE: &str = "archive";

/// Stages a mapping edit may happen in.
const EDITABLE: &[Stage] = &[Stage::Mapped, Stage::Cleaned, Stage::Suggested];

struct SessionHandle {
    session: Arc<Mutex<Session>>,
    cancel: Arc<AtomicBool>,
}

/// Sequences mapper, rule engine and suggester per session.
pub struct Pipeline {
    registry: Arc<SchemaRegistry>,
    config: PipelineConfig,
    mapper: ColumnMapper,
    engine: Arc<RuleEngine>,
    suggester: FixSuggester,
    learning: Arc<LearningStore>,
    semantic: Option<Arc<dyn SemanticMatcher>>,
    capability: Option<Arc<dyn SuggestionCapability>>,
    store: Arc<dyn KeyValueStore>,
    sessions: RwLock<HashMap<String, SessionHandle>>,
}

impl Pipeline {
    /// Create a pipeline with in-memory persistence and default policies.
    pub fn new(registry: Arc<SchemaRegistry>) -> Self {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let learning = Arc::new(LearningStore::in_memory());
        let config = PipelineConfig::default();
        let engine = Arc::new(RuleEngine::new(registry.clone()));

        Self {
            mapper: ColumnMapper::new(registry.clone()),
            suggester: FixSuggester::new(learning.clone(), engine.clone()),
            registry,
            config,
            engine,
            learning,
            semantic: None,
            capability: None,
            store,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Persist checkpoints and learned fixes in `store`.
    ///
    /// The learning store is reopened from the same backend.
    pub fn with_store(mut self, store: Arc<dyn KeyValueStore>) -> Result<Self> {
        self.learning = Arc::new(LearningStore::open(store.clone())?);
        self.store = store;
        Ok(self.assemble())
    }

    /// Share an already opened learning store.
    pub fn with_learning_store(mut self, learning: Arc<LearningStore>) -> Self {
        self.learning = learning;
        self.assemble()
    }

    /// Use custom policies.
    pub fn with_config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self.assemble()
    }

    /// Enable the semantic mapping strategy.
    pub fn with_semantic_matcher(mut self, matcher: Arc<dyn SemanticMatcher>) -> Self {
        self.semantic = Some(matcher);
        self.assemble()
    }

    /// Call `capability` on learning store misses.
    pub fn with_suggestion_capability(mut self, capability: Arc<dyn SuggestionCapability>) -> Self {
        self.capability = Some(capability);
        self.assemble()
    }

    fn assemble(mut self) -> Self {
        self.engine = Arc::new(
            RuleEngine::new(self.registry.clone()).with_config(self.config.cleaning.clone()),
        );

        let mut mapper =
            ColumnMapper::new(self.registry.clone()).with_config(self.config.mapper.clone());
        if let Some(matcher) = &self.semantic {
            mapper = mapper.with_semantic_matcher(matcher.clone());
        }
        self.mapper = mapper;

        let mut suggester = FixSuggester::new(self.learning.clone(), self.engine.clone())
            .with_config(self.config.suggester.clone());
        if let Some(capability) = &self.capability {
            suggester = suggester.with_capability(capability.clone());
        }
        self.suggester = suggester;
        self
    }

    /// Get the registry.
    pub fn registry(&self) -> &Arc<SchemaRegistry> {
        &self.registry
    }

    /// Get the configuration.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Get the shared learning store.
    pub fn learning_store(&self) -> &Arc<LearningStore> {
        &self.learning
    }

    // =========================================================================
    // SESSION LIFECYCLE
    // =========================================================================

    /// Start a session for an uploaded table.
    pub fn upload(&self, source_name: impl Into<String>, table: DataTable) -> Result<String> {
        if table.column_count() == 0 {
            return Err(SchemafixError::EmptyData("table has no columns".to_string()));
        }

        let id = new_session_id();
        let session = Session::new(&id, source_name, table);
        info!(
            session = %id,
            rows = session.source.row_count(),
            columns = session.source.column_count(),
            "session uploaded"
        );
        self.insert(session);
        Ok(id)
    }

    /// Parse a delimited file and start a session for it.
    pub fn upload_file(&self, path: impl AsRef<Path>) -> Result<String> {
        let (table, metadata) = Parser::new().parse_file(path)?;
        self.upload(metadata.file, table)
    }

    /// Ids of the sessions held in memory, sorted.
    pub fn sessions(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.sessions.read().keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Snapshot of a session.
    pub fn session(&self, id: &str) -> Result<Session> {
        Ok(self.handle(id)?.lock().clone())
    }

    /// Current stage of a session.
    pub fn stage(&self, id: &str) -> Result<Stage> {
        Ok(self.handle(id)?.lock().stage)
    }

    /// Ask the running (or next) stage of a session to stop.
    ///
    /// The flag is cleared once a stage observes it.
    pub fn cancel(&self, id: &str) -> Result<()> {
        let sessions = self.sessions.read();
        let handle = sessions
            .get(id)
            .ok_or_else(|| SchemafixError::SessionNotFound(id.to_string()))?;
        handle.cancel.store(true, Ordering::SeqCst);
        info!(session = %id, "cancellation requested");
        Ok(())
    }

    /// Persist a session so it can be resumed by another process.
    pub fn checkpoint(&self, id: &str) -> Result<()> {
        let handle = self.handle(id)?;
        let session = handle.lock();
        save_json(self.store.as_ref(), SESSION_NAMESPACE, id, &*session)?;
        debug!(session = %id, stage = %session.stage, "checkpoint written");
        Ok(())
    }

    /// Load a checkpointed session, replacing any in-memory copy.
    pub fn resume(&self, id: &str) -> Result<Stage> {
        let session: Session = load_json(self.store.as_ref(), SESSION_NAMESPACE, id)?
            .ok_or_else(|| SchemafixError::SessionNotFound(id.to_string()))?;
        let stage = session.stage;
        self.insert(session);
        info!(session = %id, stage = %stage, "session resumed");
        Ok(stage)
    }

    /// Ids of every checkpointed session.
    pub fn checkpoints(&self) -> Result<Vec<String>> {
        self.store.keys(SESSION_NAMESPACE)
    }

    /// Ids of every archived session.
    pub fn archived(&self) -> Result<Vec<String>> {
        self.store.keys(ARCHIVE_NAMESPACE)
    }

    /// Move a finalized session out of the live set.
    ///
    /// The session is written under [`ARCHIVE_NAMESPACE`], its checkpoint is
    /// removed and its in-memory handle dropped. A session known only from its
    /// checkpoint can be archived too.
    pub fn archive(&self, id: &str) -> Result<Session> {
        let session = match self.handle(id) {
            Ok(handle) => handle.lock().clone(),
            Err(_) => load_json(self.store.as_ref(), SESSION_NAMESPACE, id)?
                .ok_or_else(|| SchemafixError::SessionNotFound(id.to_string()))?,
        };
        session.require("archive", &[Stage::Finalized])?;

        save_json(self.store.as_ref(), ARCHIVE_NAMESPACE, id, &session)?;
        self.store.remove(SESSION_NAMESPACE, id)?;
        self.sessions.write().remove(id);

        info!(session = %id, "session archived");
        Ok(session)
    }

    /// Destroy every session, checkpoint and archive untouched for `max_age`.
    ///
    /// Sessions whose stage is running are skipped. Returns the removed ids, sorted.
    pub fn expire(&self, max_age: Duration) -> Result<Vec<String>> {
        let Some(cutoff) = Utc::now().checked_sub_signed(max_age) else {
            return Ok(Vec::new());
        };
        let mut expired = Vec::new();

        let live: HashSet<String> = {
            let mut sessions = self.sessions.write();
            sessions.retain(|id, handle| match handle.session.try_lock() {
                Some(session) if session.updated_at <= cutoff => {
                    expired.push(id.clone());
                    false
                }
                _ => true,
            });
            sessions.keys().cloned().collect()
        };

        for namespace in [SESSION_NAMESPACE, ARCHIVE_NAMESPACE] {
            for id in self.store.keys(namespace)? {
                if namespace == SESSION_NAMESPACE && live.contains(&id) {
                    continue;
                }
                let stale = expired.contains(&id)
                    || load_json::<Session>(self.store.as_ref(), namespace, &id)?
                        .is_some_and(|session| session.updated_at <= cutoff);
                if stale {
                    self.store.remove(namespace, &id)?;
                    expired.push(id);
                }
            }
        }

        expired.sort();
        expired.dedup();
        if !expired.is_empty() {
            info!(count = expired.len(), max_age_hours = max_age.num_hours(), "sessions expired");
        }
        Ok(expired)
    }

    // =========================================================================
    // STAGES
    // =========================================================================

    /// `Uploaded → Mapped`.
    pub fn map(&self, id: &str) -> Result<MappingReport> {
        self.with_session(id, |session, _| {
            session.require("map", &[Stage::Uploaded])?;

            let report = self.mapper.map_table(&session.source);
            info!(
                session = %session.id,
                mapped = report.mapped().count(),
                missing = report.missing.len(),
                ambiguous = report.ambiguous.len(),
                "session mapped"
            );

            session.mapping = Some(report.clone());
            session.advance(Stage::Mapped);
            Ok(report)
        })
    }

    /// Assign (or with `None`, unassign) a source column by hand.
    ///
    /// Past `Mapped`, only the affected canonical columns are re-cleaned and
    /// their issues re-evaluated; fixes applied elsewhere survive.
    pub fn edit_mapping(
        &self,
        id: &str,
        source_column: &str,
        canonical: Option<&str>,
    ) -> Result<MappingEdit> {
        self.with_session(id, |session, cancel| {
            session.require("edit mapping", EDITABLE)?;

            let mut mapping = session.mapping()?.clone();
            let edit = mapping.assign_manual(&self.registry, source_column, canonical)?;
            debug!(
                session = %session.id,
                source = source_column,
                target = canonical.unwrap_or("-"),
                affected = ?edit.affected,
                "manual mapping edit"
            );

            self.recommit(session, mapping, &edit.affected, cancel)?;
            Ok(edit)
        })
    }

    /// Drop an extra source column from the output.
    pub fn discard_extra(&self, id: &str, source_column: &str) -> Result<()> {
        self.with_session(id, |session, cancel| {
            session.require("discard column", EDITABLE)?;

            let mut mapping = session.mapping()?.clone();
            mapping.discard_extra(source_column)?;
            self.recommit(session, mapping, &[], cancel)
        })
    }

    /// `Mapped → Cleaned`.
    pub fn clean(&self, id: &str) -> Result<CleanReport> {
        self.with_session(id, |session, cancel| {
            session.require("clean", &[Stage::Mapped])?;

            let result = self
                .engine
                .clean_cancellable(&session.source, session.mapping()?, cancel)?;

            session.issues = result.issues;
            session.suggestions.clear();
            session.cleaned = Some(result.table);
            session.clean_report = Some(result.report.clone());
            session.advance(Stage::Cleaned);
            info!(
                session = %session.id,
                issues = session.issues.len(),
                "session cleaned"
            );
            Ok(result.report)
        })
    }

    /// `Cleaned | Suggested → Suggested`.
    ///
    /// Suggests fixes for open issues that have no pending suggestion and
    /// returns the new suggestions.
    pub fn suggest(&self, id: &str) -> Result<Vec<FixSuggestion>> {
        self.with_session(id, |session, cancel| {
            session.require("suggest", &[Stage::Cleaned, Stage::Suggested])?;

            let open = session.unsuggested_issues();
            let suggestions = self.suggester.suggest_cancellable(&open, cancel)?;

            let first = session.suggestions.len();
            session.push_suggestions(suggestions);
            let created = session.suggestions[first..].to_vec();
            session.advance(Stage::Suggested);
            info!(
                session = %session.id,
                suggestions = created.len(),
                "session suggested"
            );
            Ok(created)
        })
    }

    /// Decide every pending suggestion with `signature`.
    ///
    /// Accept and promote write the value into the cleaned table and close the
    /// matching issues; promote also records it in the learning store. Once no
    /// suggestion is pending the session re-enters `Cleaned`. Returns the
    /// number of suggestions decided.
    pub fn apply_fix(
        &self,
        id: &str,
        signature: &IssueSignature,
        decision: FixDecision,
    ) -> Result<usize> {
        self.with_session(id, |session, _| {
            session.require("apply fix", &[Stage::Suggested])?;

            let targets = session.pending_for(signature);
            if targets.is_empty() {
                return Err(SchemafixError::SuggestionNotFound(signature.to_string()));
            }

            let status = decision.status();
            if !status.is_applied() {
                for &i in &targets {
                    session.suggestions[i].resolve(status, None)?;
                }
                return Ok(self.settle(session, targets.len()));
            }

            // Resolve every value before touching the session.
            let mut writes = Vec::with_capacity(targets.len());
            for &i in &targets {
                let suggestion = &session.suggestions[i];
                let value = decision
                    .override_value()
                    .map(str::to_string)
                    .or_else(|| suggestion.suggested_value.clone())
                    .ok_or_else(|| {
                        SchemafixError::Config(format!(
                            "Suggestion {} has no value; supply one with the decision",
                            suggestion.id
                        ))
                    })?;
                writes.push((i, self.normalize_fix(&suggestion.canonical_column, &value)));
            }

            let mut cleaned = session.cleaned()?.clone();
            for (i, value) in &writes {
                let suggestion = &session.suggestions[*i];
                let column = cleaned
                    .column_index(&suggestion.canonical_column)
                    .ok_or_else(|| SchemafixError::UnknownColumn(suggestion.canonical_column.clone()))?;
                cleaned.set(suggestion.row_index, column, value.clone());
            }

            if matches!(decision, FixDecision::Promote { .. }) {
                let resolution = writes[0].1.clone();
                self.learning
                    .promote(signature, resolution, Some(session.id.as_str()))?;
            }

            for (i, value) in writes {
                let (row, column) = {
                    let s = &session.suggestions[i];
                    (s.row_index, s.canonical_column.clone())
                };
                session.suggestions[i].resolve(status, Some(value))?;
                session
                    .issues
                    .retain(|issue| !(issue.is_at(row, &column) && signature.matches(issue)));
            }
            session.cleaned = Some(cleaned);

            Ok(self.settle(session, targets.len()))
        })
    }

    /// `Cleaned | Suggested → Finalized`. Returns the cleaned table.
    pub fn finalize(&self, id: &str) -> Result<DataTable> {
        self.with_session(id, |session, _| {
            session.require("finalize", &[Stage::Cleaned, Stage::Suggested])?;

            let missing = session.mapping()?.missing_required(&self.registry);
            if !missing.is_empty() {
                return Err(SchemafixError::UnmappedRequiredColumn { columns: missing });
            }

            let table = session.cleaned()?.clone();
            session.advance(Stage::Finalized);
            info!(
                session = %session.id,
                rows = table.row_count(),
                open_issues = session.issues.len(),
                "session finalized"
            );
            Ok(table)
        })
    }

    /// The cleaned table of a finalized session.
    pub fn result(&self, id: &str) -> Result<DataTable> {
        let handle = self.handle(id)?;
        let session = handle.lock();
        session.require("read result", &[Stage::Finalized])?;
        Ok(session.cleaned()?.clone())
    }

    /// Counts describing a session.
    pub fn summary(&self, id: &str) -> Result<ProcessingSummary> {
        let handle = self.handle(id)?;
        let session = handle.lock();
        let missing = session
            .mapping
            .as_ref()
            .map(|m| m.missing_required(&self.registry))
            .unwrap_or_default();
        Ok(ProcessingSummary::of(&session, missing))
    }

    // =========================================================================
    // INTERNALS
    // =========================================================================

    fn insert(&self, session: Session) {
        let id = session.id.clone();
        let handle = SessionHandle {
            session: Arc::new(Mutex::new(session)),
            cancel: Arc::new(AtomicBool::new(false)),
        };
        self.sessions.write().insert(id, handle);
    }

    fn handle(&self, id: &str) -> Result<Arc<Mutex<Session>>> {
        self.sessions
            .read()
            .get(id)
            .map(|h| h.session.clone())
            .ok_or_else(|| SchemafixError::SessionNotFound(id.to_string()))
    }

    /// Run `f` on a working copy of the session under its lock; commit on success.
    fn with_session<T>(
        &self,
        id: &str,
        f: impl FnOnce(&mut Session, &AtomicBool) -> Result<T>,
    ) -> Result<T> {
        let (session, cancel) = {
            let sessions = self.sessions.read();
            let handle = sessions
                .get(id)
                .ok_or_else(|| SchemafixError::SessionNotFound(id.to_string()))?;
            (handle.session.clone(), handle.cancel.clone())
        };

        let mut guard = session.lock();
        let mut working = guard.clone();
        match f(&mut working, &cancel) {
            Ok(value) => {
                *guard = working;
                Ok(value)
            }
            Err(SchemafixError::Cancelled(_)) => {
                cancel.store(false, Ordering::SeqCst);
                info!(session = %id, stage = %guard.stage, "stage cancelled");
                Err(SchemafixError::Cancelled(id.to_string()))
            }
            Err(e) => Err(e),
        }
    }

    /// Store an edited mapping, re-cleaning affected columns past `Mapped`.
    fn recommit(
        &self,
        session: &mut Session,
        mut mapping: MappingReport,
        affected: &[String],
        cancel: &AtomicBool,
    ) -> Result<()> {
        mapping.refresh_missing(&self.registry);

        if session.stage >= Stage::Cleaned {
            let result = self.engine.reclean(
                &session.source,
                &mapping,
                session.cleaned.as_ref(),
                affected,
                cancel,
            )?;

            session.forget_columns(affected);
            session.issues.extend(result.issues);
            session.issues.sort_by(|a, b| {
                (a.row_index, &a.canonical_column).cmp(&(b.row_index, &b.canonical_column))
            });
            if let Some(report) = &mut session.clean_report {
                report.after = result.report.after;
                report.cells_changed += result.report.cells_changed;
            }
            session.cleaned = Some(result.table);

            if session.stage == Stage::Suggested && !session.has_pending() {
                session.advance(Stage::Cleaned);
            }
        }

        session.mapping = Some(mapping);
        session.updated_at = Utc::now();
        Ok(())
    }

    /// Clean a decided value with its column's rules when they accept it.
    fn normalize_fix(&self, canonical: &str, value: &str) -> String {
        self.registry
            .get(canonical)
            .and_then(|column| self.engine.clean_cell(column, value).ok())
            .unwrap_or_else(|| value.to_string())
    }

    /// Fall back to `Cleaned` once nothing is pending.
    fn settle(&self, session: &mut Session, decided: usize) -> usize {
        if session.has_pending() {
            session.updated_at = Utc::now();
        } else {
            session.advance(Stage::Cleaned);
        }
        debug!(session = %session.id, decided, stage = %session.stage, "fix decision applied");
        decided
    }
}

fn new_session_id() -> String {
    format!("sess_{:016x}", fastrand::u64(..))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cleaning::IssueKind;
    use crate::schema::{CanonicalColumn, ExpectedFormat};

    fn registry() -> Arc<SchemaRegistry> {
        Arc::new(
            SchemaRegistry::new(vec![
                CanonicalColumn::new("customer_id", ExpectedFormat::FreeText).required(),
                CanonicalColumn::new("currency", ExpectedFormat::Categorical)
                    .with_allowed_values(&["INR", "USD"])
                    .with_case(crate::schema::CasePolicy::Upper),
            ])
            .unwrap(),
        )
    }

    fn table() -> DataTable {
        DataTable::from_rows(
            &["customer_id", "currency"],
            &[&["C1", "inr"], &["C2", "Rs"], &["C3", "Rs"]],
        )
    }

    fn cleaned_session(pipeline: &Pipeline) -> String {
        let id = pipeline.upload("orders.csv", table()).unwrap();
        pipeline.map(&id).unwrap();
        pipeline.clean(&id).unwrap();
        id
    }

    #[test]
    fn test_happy_path_stages() {
        let pipeline = Pipeline::new(registry());
        let id = pipeline.upload("orders.csv", table()).unwrap();
        assert_eq!(pipeline.stage(&id).unwrap(), Stage::Uploaded);

        pipeline.map(&id).unwrap();
        assert_eq!(pipeline.stage(&id).unwrap(), Stage::Mapped);

        let report = pipeline.clean(&id).unwrap();
        assert_eq!(report.issues_by_kind.get(&IssueKind::OutOfRange), Some(&2));

        let suggestions = pipeline.suggest(&id).unwrap();
        assert_eq!(suggestions.len(), 2);
        assert_eq!(pipeline.stage(&id).unwrap(), Stage::Suggested);

        let table = pipeline.finalize(&id).unwrap();
        assert_eq!(table.get(0, 1), Some("INR"));
        assert_eq!(pipeline.stage(&id).unwrap(), Stage::Finalized);
    }

    #[test]
    fn test_out_of_order_is_state_conflict() {
        let pipeline = Pipeline::new(registry());
        let id = pipeline.upload("orders.csv", table()).unwrap();

        let err = pipeline.suggest(&id).unwrap_err();
        assert!(matches!(
            err,
            SchemafixError::StateConflict {
                current: Stage::Uploaded,
                ..
            }
        ));
        assert_eq!(pipeline.stage(&id).unwrap(), Stage::Uploaded);
    }

    #[test]
    fn test_finalized_is_terminal() {
        let pipeline = Pipeline::new(registry());
        let id = cleaned_session(&pipeline);
        pipeline.finalize(&id).unwrap();

        assert!(pipeline.edit_mapping(&id, "currency", None).is_err());
        assert!(pipeline.suggest(&id).is_err());
        assert!(pipeline.finalize(&id).is_err());
        assert!(pipeline.result(&id).is_ok());
    }

    #[test]
    fn test_promote_returns_to_cleaned_and_learns() {
        let pipeline = Pipeline::new(registry());
        let id = cleaned_session(&pipeline);
        let suggestions = pipeline.suggest(&id).unwrap();
        let signature = suggestions[0].issue_signature.clone();

        let decided = pipeline
            .apply_fix(
                &id,
                &signature,
                FixDecision::Promote {
                    value: Some("inr".to_string()),
                },
            )
            .unwrap();

        assert_eq!(decided, 2);
        let session = pipeline.session(&id).unwrap();
        assert_eq!(session.stage, Stage::Cleaned);
        assert!(session.issues.is_empty());
        assert_eq!(session.cleaned.as_ref().unwrap().get(1, 1), Some("INR"));

        let learned = pipeline.learning_store().lookup(&signature).unwrap();
        assert_eq!(learned.resolution, "INR");
        assert_eq!(learned.promoted_by.as_deref(), Some(id.as_str()));
    }

    #[test]
    fn test_accept_without_value_fails_cleanly() {
        let pipeline = Pipeline::new(registry());
        let id = cleaned_session(&pipeline);
        let suggestions = pipeline.suggest(&id).unwrap();
        assert!(suggestions[0].suggested_value.is_none());

        let before = pipeline.session(&id).unwrap();
        let result = pipeline.apply_fix(&id, &suggestions[0].issue_signature, FixDecision::accept());
        assert!(matches!(result, Err(SchemafixError::Config(_))));
        assert_eq!(pipeline.session(&id).unwrap(), before);
    }

    #[test]
    fn test_reject_then_resuggest() {
        let pipeline = Pipeline::new(registry());
        let id = cleaned_session(&pipeline);
        let first = pipeline.suggest(&id).unwrap();

        pipeline
            .apply_fix(&id, &first[0].issue_signature, FixDecision::Reject)
            .unwrap();
        assert_eq!(pipeline.stage(&id).unwrap(), Stage::Cleaned);

        let second = pipeline.suggest(&id).unwrap();
        assert_eq!(second.len(), 2);
        assert_eq!(second[0].id, "sug_003");
    }

    #[test]
    fn test_finalize_requires_mapped_required_columns() {
        let pipeline = Pipeline::new(registry());
        let id = cleaned_session(&pipeline);
        pipeline.edit_mapping(&id, "customer_id", None).unwrap();

        let err = pipeline.finalize(&id).unwrap_err();
        match err {
            SchemafixError::UnmappedRequiredColumn { columns } => {
                assert_eq!(columns, vec!["customer_id".to_string()]);
            }
            other => panic!("unexpected error {:?}", other),
        }
        assert_eq!(pipeline.stage(&id).unwrap(), Stage::Cleaned);
    }

    #[test]
    fn test_cancel_keeps_previous_stage() {
        let pipeline = Pipeline::new(registry());
        let id = pipeline.upload("orders.csv", table()).unwrap();
        pipeline.map(&id).unwrap();

        pipeline.cancel(&id).unwrap();
        let err = pipeline.clean(&id).unwrap_err();
        assert!(matches!(err, SchemafixError::Cancelled(ref s) if s == &id));

        let session = pipeline.session(&id).unwrap();
        assert_eq!(session.stage, Stage::Mapped);
        assert!(session.cleaned.is_none());

        // The flag is consumed; the stage can run again.
        pipeline.clean(&id).unwrap();
    }

    #[test]
    fn test_checkpoint_and_resume() {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let first = Pipeline::new(registry()).with_store(store.clone()).unwrap();
        let id = cleaned_session(&first);
        first.checkpoint(&id).unwrap();

        let second = Pipeline::new(registry()).with_store(store).unwrap();
        assert_eq!(second.checkpoints().unwrap(), vec![id.clone()]);
        assert_eq!(second.resume(&id).unwrap(), Stage::Cleaned);
        assert_eq!(second.session(&id).unwrap().issues.len(), 2);
    }

    #[test]
    fn test_unknown_session() {
        let pipeline = Pipeline::new(registry());
        assert!(matches!(
            pipeline.map("sess_missing"),
            Err(SchemafixError::SessionNotFound(_))
        ));
    }

    #[test]
    fn test_archive_moves_finalized_session() {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let pipeline = Pipeline::new(registry()).with_store(store.clone()).unwrap();
        let id = cleaned_session(&pipeline);
        pipeline.checkpoint(&id).unwrap();

        assert!(matches!(
            pipeline.archive(&id),
            Err(SchemafixError::StateConflict { .. })
        ));

        pipeline.finalize(&id).unwrap();
        let archived = pipeline.archive(&id).unwrap();
        assert_eq!(archived.stage, Stage::Finalized);

        assert!(pipeline.sessions().is_empty());
        assert!(pipeline.checkpoints().unwrap().is_empty());
        assert_eq!(pipeline.archived().unwrap(), vec![id.clone()]);
        assert!(matches!(
            pipeline.resume(&id),
            Err(SchemafixError::SessionNotFound(_))
        ));
    }

    #[test]
    fn test_expire_drops_stale_sessions_and_checkpoints() {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let pipeline = Pipeline::new(registry()).with_store(store.clone()).unwrap();
        let fresh = cleaned_session(&pipeline);
        pipeline.checkpoint(&fresh).unwrap();

        // a checkpoint left behind by another process a day ago
        let mut stale = Session::new("sess_stale", "old.csv", table());
        stale.updated_at = Utc::now() - Duration::hours(25);
        save_json(store.as_ref(), SESSION_NAMESPACE, "sess_stale", &stale).unwrap();

        let expired = pipeline.expire(Duration::hours(24)).unwrap();
        assert_eq!(expired, vec!["sess_stale".to_string()]);
        assert_eq!(pipeline.checkpoints().unwrap(), vec![fresh.clone()]);
        assert_eq!(pipeline.sessions(), vec![fresh.clone()]);

        let expired = pipeline.expire(Duration::zero()).unwrap();
        assert_eq!(expired, vec![fresh]);
        assert!(pipeline.sessions().is_empty());
        assert!(pipeline.checkpoints().unwrap().is_empty());
    }
}
