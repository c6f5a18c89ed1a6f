//! Persisted cursor (`settings.json`).

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::{Error, Result};

#[derive(Debug, Default, Serialize, Deserialize)]
struct Settings {
    #[serde(rename = "last_processed_sentence", alias = "last_processed_paragraph", default)]
    cursor: usize,

    // Keys written by other tools survive a rewrite
    #[serde(flatten)]
    extra: Map<String, Value>,
}

/// Reads and writes the last visited sentence index.
#[derive(Debug)]
pub struct CursorStore {
    path: PathBuf,
    settings: Settings,
}

impl CursorStore {
    /// Load the settings file. A missing file means cursor 0; an unreadable or
    /// malformed one is treated the same way, with a warning.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let settings = match std::fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                warn!("Ignoring malformed settings file {}: {}", path.display(), e);
                Settings::default()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No settings file at {}, starting at the first sentence", path.display());
                Settings::default()
            }
            Err(e) => {
                warn!("Cannot read settings file {}: {}", path.display(), e);
                Settings::default()
            }
        };
        Self { path, settings }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn cursor(&self) -> usize {
        self.settings.cursor
    }

    /// Persist `cursor`, replacing the file atomically.
    ///
    /// # Errors
    /// Returns an error if the file cannot be written.
    pub fn save(&mut self, cursor: usize) -> Result<()> {
        self.settings.cursor = cursor;
        let json = serde_json::to_string_pretty(&self.settings)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| Error::file_access(parent, e))?;
        }

        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json).map_err(|e| Error::file_access(&tmp, e))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| Error::file_access(&self.path, e))?;

        debug!("Saved cursor {} to {}", cursor, self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_json(path: &Path) -> Value {
        serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
    }

    #[test]
    fn test_missing_file_starts_at_zero() {
        let dir = tempfile::tempdir().unwrap();
        let store = CursorStore::open(dir.path().join("settings.json"));
        assert_eq!(store.cursor(), 0);
    }

    #[test]
    fn test_save_then_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");

        let mut store = CursorStore::open(&path);
        store.save(42).unwrap();

        assert_eq!(CursorStore::open(&path).cursor(), 42);
        assert_eq!(read_json(&path)["last_processed_sentence"], 42);
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn test_legacy_key_is_migrated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"last_processed_paragraph": 7}"#).unwrap();

        let mut store = CursorStore::open(&path);
        assert_eq!(store.cursor(), 7);
        store.save(8).unwrap();

        let json = read_json(&path);
        assert_eq!(json["last_processed_sentence"], 8);
        assert!(json.get("last_processed_paragraph").is_none());
    }

    #[test]
    fn test_unknown_keys_are_preserved() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"last_processed_sentence": 1, "theme": "dark"}"#).unwrap();

        let mut store = CursorStore::open(&path);
        store.save(2).unwrap();

        let json = read_json(&path);
        assert_eq!(json["last_processed_sentence"], 2);
        assert_eq!(json["theme"], "dark");
    }

    #[test]
    fn test_malformed_file_is_treated_as_absent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{not json").unwrap();
        assert_eq!(CursorStore::open(&path).cursor(), 0);

        std::fs::write(&path, r#"{"last_processed_sentence": -3}"#).unwrap();
        assert_eq!(CursorStore::open(&path).cursor(), 0);
    }
}
