//! The fix learning store.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::signature::IssueSignature;
use crate::error::{Result, SchemafixError};
use crate::store::{load_json, save_json, KeyValueStore, MemoryStore};

/// Namespace learned fixes are persisted under.
pub const LEARNED_NAMESPACE: &str = "learned_fixes";

/// A resolution promoted by a human, reusable across uploads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearnedFix {
    pub signature: IssueSignature,
    /// Value that replaces matching cells.
    pub resolution: String,
    /// Number of promotions for this signature.
    pub occurrences: u64,
    pub first_promoted: DateTime<Utc>,
    pub last_promoted: DateTime<Utc>,
    /// Who made the latest promotion.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub promoted_by: Option<String>,
}

/// Process-wide map from issue signature to learned resolution.
///
/// Lookups take a shared read lock and run concurrently. Promotions take a
/// per-signature write lock, so writers to the same signature serialize (the
/// last one wins, nothing is lost) while writers to different signatures
/// proceed in parallel. Each promotion is persisted before it becomes visible.
pub struct LearningStore {
    backend: Arc<dyn KeyValueStore>,
    entries: RwLock<HashMap<String, LearnedFix>>,
    write_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl LearningStore {
    /// Open a store, loading every persisted fix.
    pub fn open(backend: Arc<dyn KeyValueStore>) -> Result<Self> {
        let mut entries = HashMap::new();
        for key in backend.keys(LEARNED_NAMESPACE)? {
            if let Some(fix) = load_json::<LearnedFix>(backend.as_ref(), LEARNED_NAMESPACE, &key)? {
                entries.insert(key, fix);
            }
        }

        info!(entries = entries.len(), "learning store opened");

        Ok(Self {
            backend,
            entries: RwLock::new(entries),
            write_locks: Mutex::new(HashMap::new()),
        })
    }

    /// An empty store that is not persisted.
    pub fn in_memory() -> Self {
        Self {
            backend: Arc::new(MemoryStore::new()),
            entries: RwLock::new(HashMap::new()),
            write_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Learned fix for a signature.
    pub fn lookup(&self, signature: &IssueSignature) -> Option<LearnedFix> {
        self.entries
            .read()
            .get(&signature.fingerprint())
            .filter(|fix| &fix.signature == signature)
            .cloned()
    }

    /// Whether a signature has a learned fix.
    pub fn contains(&self, signature: &IssueSignature) -> bool {
        self.lookup(signature).is_some()
    }

    /// Record a human-promoted resolution.
    ///
    /// A repeated promotion replaces the resolution and increments the
    /// occurrence counter.
    pub fn promote(
        &self,
        signature: &IssueSignature,
        resolution: impl Into<String>,
        promoted_by: Option<&str>,
    ) -> Result<LearnedFix> {
        let key = signature.fingerprint();
        let lock = self.write_lock(&key);
        let _guard = lock.lock();

        let now = Utc::now();
        let current = self.entries.read().get(&key).cloned();
        let next = match current {
            Some(existing) if &existing.signature != signature => {
                return Err(SchemafixError::LearningStoreWriteConflict {
                    signature: signature.to_string(),
                });
            }
            Some(existing) => LearnedFix {
                resolution: resolution.into(),
                occurrences: existing.occurrences + 1,
                last_promoted: now,
                promoted_by: promoted_by.map(str::to_string),
                ..existing
            },
            None => LearnedFix {
                signature: signature.clone(),
                resolution: resolution.into(),
                occurrences: 1,
                first_promoted: now,
                last_promoted: now,
                promoted_by: promoted_by.map(str::to_string),
            },
        };

        save_json(self.backend.as_ref(), LEARNED_NAMESPACE, &key, &next)?;
        self.entries.write().insert(key, next.clone());

        debug!(
            signature = %signature,
            occurrences = next.occurrences,
            "fix promoted"
        );

        Ok(next)
    }

    /// All learned fixes, ordered by signature.
    pub fn entries(&self) -> Vec<LearnedFix> {
        let mut fixes: Vec<LearnedFix> = self.entries.read().values().cloned().collect();
        fixes.sort_by(|a, b| a.signature.cmp(&b.signature));
        fixes
    }

    /// Number of learned fixes.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether no fix has been learned.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    fn write_lock(&self, key: &str) -> Arc<Mutex<()>> {
        Arc::clone(
            self.write_locks
                .lock()
                .entry(key.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(()))),
        )
    }
}

impl Default for LearningStore {
    fn default() -> Self {
        Self::in_memory()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cleaning::IssueKind;

    fn signature() -> IssueSignature {
        IssueSignature::new("currency", IssueKind::OutOfRange, "Rs")
    }

    #[test]
    fn test_lookup_miss_then_hit() {
        let store = LearningStore::in_memory();
        assert!(store.lookup(&signature()).is_none());

        store.promote(&signature(), "INR", Some("analyst")).unwrap();
        let fix = store.lookup(&signature()).unwrap();
        assert_eq!(fix.resolution, "INR");
        assert_eq!(fix.occurrences, 1);
        assert_eq!(fix.promoted_by.as_deref(), Some("analyst"));
    }

    #[test]
    fn test_repromote_overwrites_and_counts() {
        let store = LearningStore::in_memory();
        let first = store.promote(&signature(), "INR", None).unwrap();
        let second = store.promote(&signature(), "USD", None).unwrap();

        assert_eq!(second.resolution, "USD");
        assert_eq!(second.occurrences, 2);
        assert_eq!(second.first_promoted, first.first_promoted);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_reopen_restores_entries() {
        let backend: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        LearningStore::open(backend.clone())
            .unwrap()
            .promote(&signature(), "INR", None)
            .unwrap();

        let reopened = LearningStore::open(backend).unwrap();
        assert_eq!(reopened.lookup(&signature()).unwrap().resolution, "INR");
    }
}
