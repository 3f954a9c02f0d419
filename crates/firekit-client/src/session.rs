//! Session-scoped configuration store and the profile config file.
//!
//! The store is an explicit object handed to resolution calls, not ambient
//! process state. Callers that share one store across threads must follow a
//! single-writer convention; reads are always safe.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use serde_json::Value;
use tracing::debug;

use crate::config::ConfigKey;

/// Default config file name searched for in the working directory.
const CONFIG_FILE_NAME: &str = "firekit.json";

// =============================================================================
// Session store
// =============================================================================

/// In-process key/value configuration, living until cleared or dropped.
#[derive(Debug, Default)]
pub struct SessionStore {
    values: RwLock<HashMap<ConfigKey, String>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a session value.
    pub fn get(&self, key: ConfigKey) -> Option<String> {
        self.values
            .read()
            .ok()
            .and_then(|map| map.get(&key).cloned())
    }

    /// Set a session value.
    pub fn set(&self, key: ConfigKey, value: impl Into<String>) {
        if let Ok(mut map) = self.values.write() {
            map.insert(key, value.into());
        }
    }

    /// Clear the given keys, or everything when `keys` is `None`.
    pub fn clear(&self, keys: Option<&[ConfigKey]>) {
        if let Ok(mut map) = self.values.write() {
            match keys {
                Some(keys) => {
                    for key in keys {
                        map.remove(key);
                    }
                }
                None => map.clear(),
            }
        }
    }
}

// =============================================================================
// Config file
// =============================================================================

/// Profile-scoped key/value document loaded from a JSON config file.
///
/// File layout: an object of profiles, each a flat string mapping:
/// `{"default": {"project_id": "...", "api_key": "..."}}`.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    values: HashMap<String, String>,
}

impl ConfigFile {
    /// Load the given profile from a config file.
    ///
    /// Returns `None` when the file is missing, unreadable, or has no such
    /// profile; the resolver treats every failure as absence.
    pub fn load(path: &Path, profile: &str) -> Option<Self> {
        let text = std::fs::read_to_string(path).ok()?;
        let doc: Value = serde_json::from_str(&text).ok()?;
        let section = doc.get(profile)?.as_object()?;

        let values = section
            .iter()
            .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
            .collect();

        debug!(path = %path.display(), profile = %profile, "loaded config file");
        Some(Self { values })
    }

    /// Locate a config file: `FIREKIT_CONFIG` first, then the working
    /// directory.
    pub fn find() -> Option<PathBuf> {
        if let Ok(path) = std::env::var("FIREKIT_CONFIG") {
            let path = PathBuf::from(path);
            if path.is_file() {
                return Some(path);
            }
        }
        let local = PathBuf::from(CONFIG_FILE_NAME);
        local.is_file().then_some(local)
    }

    /// Look up a key inside the loaded profile.
    pub fn lookup(&self, key: ConfigKey) -> Option<&str> {
        self.values.get(key.file_key()).map(String::as_str)
    }
}

// =============================================================================
// Tests
// =============================================================================
