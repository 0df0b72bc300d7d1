//! Persistent store module.
//!
//! Reads and writes the JSON documents that back the application state.
//! Failures never propagate to callers: loads fall back to a default value
//! and saves report `false`, both after logging.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Environment variable overriding the data directory.
pub const HOME_ENV: &str = "KEYCLACK_HOME";

const DATA_DIR_NAME: &str = ".keyclack";
const SETTINGS_FILE: &str = "settings.json";
const KEY_BINDINGS_FILE: &str = "key_bindings.json";
const SOUND_LIBRARY_FILE: &str = "sound_library.json";
const SOUNDS_DIR: &str = "sounds";
const LOGS_DIR: &str = "logs";

/// Errors raised while reading or writing a document.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("i/o error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("malformed json in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Per-user directory layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataDir {
    root: PathBuf,
}

impl DataDir {
    /// Uses the given directory as the data root.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolves the data root from `KEYCLACK_HOME` or the home directory.
    pub fn from_env() -> Self {
        if let Some(dir) = std::env::var_os(HOME_ENV).filter(|v| !v.is_empty()) {
            return Self::new(dir);
        }
        match dirs::home_dir() {
            Some(home) => Self::new(home.join(DATA_DIR_NAME)),
            // Fallback to current directory
            None => Self::new(DATA_DIR_NAME),
        }
    }

    /// Creates the root, `sounds/` and `logs/` directories.
    pub fn ensure(&self) -> Result<(), StoreError> {
        for dir in [self.root.clone(), self.sounds_dir(), self.logs_dir()] {
            fs::create_dir_all(&dir).map_err(|source| StoreError::Io { path: dir, source })?;
        }
        Ok(())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn settings_file(&self) -> PathBuf {
        self.root.join(SETTINGS_FILE)
    }

    pub fn key_bindings_file(&self) -> PathBuf {
        self.root.join(KEY_BINDINGS_FILE)
    }

    pub fn sound_library_file(&self) -> PathBuf {
        self.root.join(SOUND_LIBRARY_FILE)
    }

    pub fn sounds_dir(&self) -> PathBuf {
        self.root.join(SOUNDS_DIR)
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.root.join(LOGS_DIR)
    }

    /// Modification times of the three documents, in a fixed order.
    pub fn modified_times(&self) -> [Option<SystemTime>; 3] {
        [
            modified_time(&self.settings_file()),
            modified_time(&self.key_bindings_file()),
            modified_time(&self.sound_library_file()),
        ]
    }
}

/// Reads and parses a JSON document.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, StoreError> {
    let content = fs::read_to_string(path).map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| StoreError::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// Serializes a document with 2-space indentation and overwrites the file.
pub fn write_json<T: Serialize + ?Sized>(path: &Path, document: &T) -> Result<(), StoreError> {
    let content = serde_json::to_string_pretty(document).map_err(|source| StoreError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    fs::write(path, content).map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Loads a document, returning `default` when it is missing or unreadable.
pub fn load<T: DeserializeOwned>(path: &Path, default: T) -> T {
    if !path.exists() {
        log::debug!("{} not found, using defaults", path.display());
        return default;
    }
    match read_json(path) {
        Ok(document) => document,
        Err(e) => {
            log::warn!("Failed to load config: {}, using defaults", e);
            default
        }
    }
}

/// Saves a document. Returns `false` (after logging) on failure.
pub fn save<T: Serialize + ?Sized>(path: &Path, document: &T) -> bool {
    match write_json(path, document) {
        Ok(()) => true,
        Err(e) => {
            log::error!("Failed to save config: {}", e);
            false
        }
    }
}

/// Gets the modification time of a file.
pub fn modified_time(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).ok().and_then(|m| m.modified().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    #[test]
    fn missing_file_yields_default() {
        let dir = TempDir::new().unwrap();
        let loaded: Vec<String> = load(&dir.path().join("nope.json"), vec!["x".to_string()]);
        assert_eq!(loaded, vec!["x".to_string()]);
    }

    #[test]
    fn malformed_file_yields_default() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.json");
        fs::write(&path, "{ not json").unwrap();

        let loaded: BTreeMap<String, String> = load(&path, BTreeMap::new());
        assert!(loaded.is_empty());
        assert!(matches!(
            read_json::<BTreeMap<String, String>>(&path),
            Err(StoreError::Json { .. })
        ));
    }

    #[test]
    fn save_writes_two_space_indented_utf8() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("doc.json");
        let mut doc = BTreeMap::new();
        doc.insert("name".to_string(), "clé".to_string());

        assert!(save(&path, &doc));
        let raw = fs::read_to_string(&path).unwrap();
        assert_eq!(raw, "{\n  \"name\": \"clé\"\n}");

        let loaded: BTreeMap<String, String> = load(&path, BTreeMap::new());
        assert_eq!(loaded, doc);
    }

    #[test]
    fn save_into_missing_directory_reports_false() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing").join("doc.json");
        assert!(!save(&path, &vec![1, 2, 3]));
    }

    #[test]
    fn data_dir_layout() {
        let dir = TempDir::new().unwrap();
        let data = DataDir::new(dir.path().join("home"));
        data.ensure().unwrap();

        assert!(data.sounds_dir().is_dir());
        assert!(data.logs_dir().is_dir());
        assert_eq!(data.settings_file(), data.root().join("settings.json"));
        assert_eq!(data.key_bindings_file(), data.root().join("key_bindings.json"));
        assert_eq!(data.sound_library_file(), data.root().join("sound_library.json"));
        assert_eq!(data.modified_times(), [None, None, None]);

        assert!(save(&data.settings_file(), &BTreeMap::<String, bool>::new()));
        assert!(data.modified_times()[0].is_some());
    }
}
