//! Boolean option storage.
//!
//! The recompiler only ever persists a handful of on/off switches, so the
//! store interface is a typed key/value map of booleans. [`MemoryStore`]
//! keeps everything in process; [`JsonFileStore`] mirrors the map to a flat
//! JSON object on disk.

use camino::{Utf8Path, Utf8PathBuf};
use rustc_hash::FxHashMap;
use tracing::debug;

use crate::error::ConfigError;

/// A key/value store of boolean options.
pub trait ConfigStore {
    /// Returns the value stored under `key`, or `default` if absent.
    fn get_bool(&self, key: &str, default: bool) -> bool;

    /// Stores `value` under `key`.
    fn set_bool(&mut self, key: &str, value: bool);

    /// Persists pending writes. In-memory stores have nothing to do.
    fn flush(&mut self) -> Result<(), ConfigError> {
        Ok(())
    }
}

/// An in-memory [`ConfigStore`].
///
/// # Examples
///
/// ```
/// use br_core::{ConfigStore, MemoryStore};
///
/// let mut store = MemoryStore::new();
/// assert!(store.get_bool("enabled", true));
/// store.set_bool("enabled", false);
/// assert!(!store.get_bool("enabled", true));
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    values: FxHashMap<String, bool>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if `key` has been set.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }
}

impl ConfigStore for MemoryStore {
    fn get_bool(&self, key: &str, default: bool) -> bool {
        self.values.get(key).copied().unwrap_or(default)
    }

    fn set_bool(&mut self, key: &str, value: bool) {
        self.values.insert(key.to_owned(), value);
    }
}

/// A [`ConfigStore`] backed by a JSON file.
///
/// The file holds a flat object such as `{"enabled": true}`. A missing file
/// loads as an empty store; [`flush`](ConfigStore::flush) writes the whole
/// map back, creating parent directories as needed.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: Utf8PathBuf,
    values: FxHashMap<String, bool>,
    dirty: bool,
}

impl JsonFileStore {
    /// Opens the store at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file exists but cannot be read,
    /// [`ConfigError::Parse`] if it is not JSON, and
    /// [`ConfigError::MalformedStore`] if it is not an object of booleans.
    pub fn open(path: impl Into<Utf8PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();

        let values = if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            parse_values(&path, &content)?
        } else {
            debug!(path = %path, "Settings file not found, starting empty");
            FxHashMap::default()
        };

        Ok(Self {
            path,
            values,
            dirty: false,
        })
    }

    /// Returns the backing file path.
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Returns all stored entries sorted by key.
    #[must_use]
    pub fn entries(&self) -> Vec<(&str, bool)> {
        let mut entries: Vec<_> = self.values.iter().map(|(k, v)| (k.as_str(), *v)).collect();
        entries.sort_unstable_by_key(|(k, _)| *k);
        entries
    }
}

fn parse_values(path: &Utf8Path, content: &str) -> Result<FxHashMap<String, bool>, ConfigError> {
    let value: serde_json::Value = serde_json::from_str(content)?;
    let serde_json::Value::Object(map) = value else {
        return Err(ConfigError::MalformedStore {
            path: path.to_owned(),
            reason: "top-level value is not an object".to_owned(),
        });
    };

    map.into_iter()
        .map(|(key, value)| match value {
            serde_json::Value::Bool(b) => Ok((key, b)),
            _ => Err(ConfigError::MalformedStore {
                path: path.to_owned(),
                reason: format!("value for '{key}' is not a boolean"),
            }),
        })
        .collect()
}

impl ConfigStore for JsonFileStore {
    fn get_bool(&self, key: &str, default: bool) -> bool {
        self.values.get(key).copied().unwrap_or(default)
    }

    fn set_bool(&mut self, key: &str, value: bool) {
        if self.values.insert(key.to_owned(), value) != Some(value) {
            self.dirty = true;
        }
    }

    fn flush(&mut self) -> Result<(), ConfigError> {
        if !self.dirty && self.path.exists() {
            return Ok(());
        }

        if let Some(parent) = self.path.parent() {
            if !parent.as_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let ordered: std::collections::BTreeMap<&str, bool> =
            self.values.iter().map(|(k, v)| (k.as_str(), *v)).collect();
        let json = serde_json::to_string_pretty(&ordered)?;
        std::fs::write(&self.path, json)?;
        self.dirty = false;

        debug!(path = %self.path, entries = ordered.len(), "Settings written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store_path(dir: &tempfile::TempDir, name: &str) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(dir.path().join(name)).unwrap()
    }

    #[test]
    fn test_memory_store_defaults_and_overrides() {
        let mut store = MemoryStore::new();
        assert!(!store.contains("debug_mode"));
        assert!(!store.get_bool("debug_mode", false));

        store.set_bool("debug_mode", true);
        assert!(store.contains("debug_mode"));
        assert!(store.get_bool("debug_mode", false));
        assert!(store.flush().is_ok());
    }

    #[test]
    fn test_json_store_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(temp_store_path(&dir, "settings.json")).unwrap();
        assert!(store.entries().is_empty());
        assert!(store.get_bool("enabled", true));
    }

    #[test]
    fn test_json_store_round_trip_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = temp_store_path(&dir, "nested/settings.json");

        let mut store = JsonFileStore::open(path.clone()).unwrap();
        store.set_bool("enabled", false);
        store.set_bool("log_on_trigger", true);
        store.flush().unwrap();

        let reopened = JsonFileStore::open(path).unwrap();
        assert!(!reopened.get_bool("enabled", true));
        assert!(reopened.get_bool("log_on_trigger", false));
        assert_eq!(
            reopened.entries(),
            vec![("enabled", false), ("log_on_trigger", true)]
        );
    }

    #[test]
    fn test_json_store_rejects_non_boolean_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = temp_store_path(&dir, "settings.json");
        std::fs::write(&path, r#"{"enabled": "yes"}"#).unwrap();

        let err = JsonFileStore::open(path).unwrap_err();
        assert!(matches!(err, ConfigError::MalformedStore { .. }));
        assert!(err.to_string().contains("'enabled'"));
    }

    #[test]
    fn test_json_store_rejects_non_object() {
        let dir = tempfile::tempdir().unwrap();
        let path = temp_store_path(&dir, "settings.json");
        std::fs::write(&path, "[true, false]").unwrap();

        assert!(matches!(
            JsonFileStore::open(path),
            Err(ConfigError::MalformedStore { .. })
        ));
    }
}
