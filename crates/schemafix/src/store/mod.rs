//! Key-value persistence for the learning store and session checkpoints.
//!
//! The core only needs load/save per key. Each save must be durable and
//! atomic for its key; there are no cross-key transactions.

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{Result, SchemafixError};

/// Namespaced byte store.
pub trait KeyValueStore: Send + Sync {
    /// Read a value, `None` when the key is absent.
    fn load(&self, namespace: &str, key: &str) -> Result<Option<Vec<u8>>>;

    /// Write a value, replacing any previous one atomically.
    fn save(&self, namespace: &str, key: &str, value: &[u8]) -> Result<()>;

    /// Delete a key. Returns whether it existed.
    fn remove(&self, namespace: &str, key: &str) -> Result<bool>;

    /// All keys in a namespace, sorted.
    fn keys(&self, namespace: &str) -> Result<Vec<String>>;
}

/// Read and deserialize a JSON value.
pub fn load_json<T: DeserializeOwned>(
    store: &dyn KeyValueStore,
    namespace: &str,
    key: &str,
) -> Result<Option<T>> {
    match store.load(namespace, key)? {
        Some(bytes) => serde_json::from_slice(&bytes).map(Some).map_err(|e| {
            SchemafixError::Persistence(format!(
                "Failed to parse '{}/{}': {}",
                namespace, key, e
            ))
        }),
        None => Ok(None),
    }
}

/// Serialize and write a JSON value.
pub fn save_json<T: Serialize>(
    store: &dyn KeyValueStore,
    namespace: &str,
    key: &str,
    value: &T,
) -> Result<()> {
    let bytes = serde_json::to_vec_pretty(value).map_err(|e| {
        SchemafixError::Persistence(format!(
            "Failed to serialize '{}/{}': {}",
            namespace, key, e
        ))
    })?;
    store.save(namespace, key, &bytes)
}

/// Keys and namespaces become file names, so only a safe alphabet is allowed.
pub(crate) fn validate_key(kind: &str, key: &str) -> Result<()> {
    let valid = !key.is_empty()
        && !key.starts_with('.')
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
    if valid {
        Ok(())
    } else {
        Err(SchemafixError::Persistence(format!(
            "Invalid {} '{}'",
            kind, key
        )))
    }
}
