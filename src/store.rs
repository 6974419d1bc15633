//! Durable per-language persistence of translation maps.
//!
//! Layout mirrors the storefront's browser storage: one entry per language
//! under `translations_<code>` holding a JSON object, plus a bare code string
//! under `preferred_language`.

use crate::i18n::Language;
use std::collections::HashMap;
use std::fmt;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tracing::{debug, warn};

/// Source string -> translated string, for one language.
pub type TranslationMap = HashMap<String, String>;

pub const PREFERRED_LANGUAGE_KEY: &str = "preferred_language";

pub fn translations_key(language: Language) -> String {
    format!("translations_{}", language.code())
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid store key '{0}'")]
    InvalidKey(String),

    #[error("store I/O error on {}: {}", .path.display(), .source)]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A string key-value store that survives process restarts.
pub trait KeyValueStore: fmt::Debug + Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
}

/// One file per key inside a directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Open (creating if needed) a store rooted at `dir`.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|source| StoreError::Io {
            path: dir.clone(),
            source,
        })?;
        Ok(Self { dir })
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StoreError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(StoreError::InvalidKey(key.to_string()));
        }
        Ok(self.dir.join(key))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let path = self.path_for(key)?;
        match std::fs::read_to_string(&path) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StoreError::Io { path, source }),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let path = self.path_for(key)?;
        // Write-then-rename so a crash never leaves a truncated entry
        let tmp = self.dir.join(format!(".{}.tmp", key));
        std::fs::write(&tmp, value).map_err(|source| StoreError::Io {
            path: tmp.clone(),
            source,
        })?;
        std::fs::rename(&tmp, &path).map_err(|source| StoreError::Io { path, source })
    }
}

/// In-process store; contents are lost when dropped.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries().insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Best-effort translation cache persistence.
///
/// Nothing here returns an error: corrupt or unreadable data loads as an empty
/// map and failed writes are logged and dropped.
#[derive(Debug, Clone)]
pub struct TranslationStore {
    backend: Arc<dyn KeyValueStore>,
}

impl TranslationStore {
    pub fn new(backend: impl KeyValueStore + 'static) -> Self {
        Self {
            backend: Arc::new(backend),
        }
    }

    /// Load the persisted map for `language`, or an empty one.
    pub fn load(&self, language: Language) -> TranslationMap {
        let key = translations_key(language);
        let raw = match self.backend.get(&key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return TranslationMap::new(),
            Err(e) => {
                warn!("Failed to read {}: {}, starting with an empty cache", key, e);
                return TranslationMap::new();
            }
        };

        match serde_json::from_str::<TranslationMap>(&raw) {
            Ok(map) => {
                debug!("Loaded {} cached translations for {}", map.len(), language);
                map
            }
            Err(e) => {
                warn!("Discarding malformed {}: {}", key, e);
                TranslationMap::new()
            }
        }
    }

    /// Overwrite the persisted map for `language`.
    pub fn save(&self, language: Language, map: &TranslationMap) {
        if let Some(json) = Self::encode(language, map) {
            self.write(language, &json);
        }
    }

    /// Serialize `map` in the stored format, for a later [`write`](Self::write).
    pub fn encode(language: Language, map: &TranslationMap) -> Option<String> {
        match serde_json::to_string(map) {
            Ok(json) => Some(json),
            Err(e) => {
                warn!("Failed to serialize {}: {}", translations_key(language), e);
                None
            }
        }
    }

    /// Overwrite the persisted map for `language` with already encoded JSON.
    pub fn write(&self, language: Language, json: &str) {
        let key = translations_key(language);
        if let Err(e) = self.backend.set(&key, json) {
            warn!("Failed to persist {}: {}", key, e);
        }
    }

    /// The stored preference, if any. Not validated against the registry.
    pub fn load_preferred_language(&self) -> Option<String> {
        match self.backend.get(PREFERRED_LANGUAGE_KEY) {
            Ok(value) => value
                .map(|code| code.trim().to_string())
                .filter(|code| !code.is_empty()),
            Err(e) => {
                warn!("Failed to read {}: {}", PREFERRED_LANGUAGE_KEY, e);
                None
            }
        }
    }

    pub fn save_preferred_language(&self, language: Language) {
        if let Err(e) = self.backend.set(PREFERRED_LANGUAGE_KEY, language.code()) {
            warn!("Failed to persist {}: {}", PREFERRED_LANGUAGE_KEY, e);
        }
    }
}
