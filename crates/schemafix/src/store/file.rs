//! Directory-backed store: one JSON file per key.

use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use super::{validate_key, KeyValueStore};
use crate::error::{Result, SchemafixError};

const EXTENSION: &str = "json";

/// Store rooted at a directory, with one subdirectory per namespace.
///
/// Saves write a temporary sibling file, sync it, and rename it over the
/// target, so readers see either the old or the new value.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Open (creating if needed) a store rooted at `root`.
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).map_err(|e| {
            SchemafixError::Persistence(format!(
                "Failed to create directory '{}': {}",
                root.display(),
                e
            ))
        })?;
        Ok(Self { root })
    }

    /// Root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, namespace: &str, key: &str) -> Result<PathBuf> {
        validate_key("namespace", namespace)?;
        validate_key("key", key)?;
        Ok(self.root.join(namespace).join(format!("{}.{}", key, EXTENSION)))
    }
}

impl KeyValueStore for FileStore {
    fn load(&self, namespace: &str, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path_for(namespace, key)?;
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(SchemafixError::Persistence(format!(
                "Failed to read '{}': {}",
                path.display(),
                e
            ))),
        }
    }

    fn save(&self, namespace: &str, key: &str, value: &[u8]) -> Result<()> {
        let path = self.path_for(namespace, key)?;
        let dir = self.root.join(namespace);
        fs::create_dir_all(&dir).map_err(|e| {
            SchemafixError::Persistence(format!(
                "Failed to create directory '{}': {}",
                dir.display(),
                e
            ))
        })?;

        let tmp = dir.join(format!(".{}.{:016x}.tmp", key, fastrand::u64(..)));
        let write = || -> std::io::Result<()> {
            let mut file = File::create(&tmp)?;
            file.write_all(value)?;
            file.sync_all()?;
            fs::rename(&tmp, &path)
        };

        write().map_err(|e| {
            let _ = fs::remove_file(&tmp);
            SchemafixError::Persistence(format!(
                "Failed to write '{}': {}",
                path.display(),
                e
            ))
        })
    }

    fn remove(&self, namespace: &str, key: &str) -> Result<bool> {
        let path = self.path_for(namespace, key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(SchemafixError::Persistence(format!(
                "Failed to remove '{}': {}",
                path.display(),
                e
            ))),
        }
    }

    fn keys(&self, namespace: &str) -> Result<Vec<String>> {
        validate_key("namespace", namespace)?;
        let dir = self.root.join(namespace);
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(SchemafixError::Persistence(format!(
                    "Failed to list '{}': {}",
                    dir.display(),
                    e
                )));
            }
        };

        let mut keys: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|ext| ext == EXTENSION))
            .filter_map(|path| path.file_stem().map(|s| s.to_string_lossy().into_owned()))
            .filter(|stem| !stem.starts_with('.'))
            .collect();
        keys.sort();
        Ok(keys)
    }
}
