//! Key/value preference storage.
//!
//! Volume, the speech flag, the active theme and the last `play_once`
//! timestamp are all plain strings behind [`KeyValueStore`]. Clients sharing a
//! store share those values, which is what makes `play_once` work across
//! clients.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::config::ConfigResult;

/// Persistent string storage shared across clients.
pub trait KeyValueStore: Send + Sync {
    /// Reads `key`.
    fn get(&self, key: &str) -> Option<String>;

    /// Writes `key`. Failures are the store's concern and are not reported.
    fn set(&self, key: &str, value: &str);
}

/// In-memory store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-filled with `values`.
    #[must_use]
    pub fn with_values<K, V>(values: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            values: RwLock::new(values.into_iter().map(|(k, v)| (k.into(), v.into())).collect()),
        }
    }

    /// Number of stored keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.read().len()
    }

    /// Whether nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.read().is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.read().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.values.write().insert(key.to_string(), value.to_string());
    }
}

/// Store persisted to a TOML file of string values.
///
/// The file is read once on open and rewritten on every `set`.
#[derive(Debug)]
pub struct TomlFileStore {
    path: PathBuf,
    values: RwLock<BTreeMap<String, String>>,
}

impl TomlFileStore {
    /// Opens `path`, starting empty when the file does not exist.
    pub fn open(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref().to_path_buf();

        let values = if path.exists() {
            let contents = fs::read_to_string(&path)?;
            toml::from_str(&contents)?
        } else {
            debug!("Preference file {} not found, starting empty", path.display());
            BTreeMap::new()
        };

        Ok(Self {
            path,
            values: RwLock::new(values),
        })
    }

    /// Backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes the current values to disk.
    pub fn flush(&self) -> ConfigResult<()> {
        let contents = toml::to_string_pretty(&*self.values.read())?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, contents)?;
        Ok(())
    }
}

impl KeyValueStore for TomlFileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.read().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.values.write().insert(key.to_string(), value.to_string());

        if let Err(e) = self.flush() {
            warn!("Failed to persist '{}' to {}: {}", key, self.path.display(), e);
        }
    }
}
