//! Client-side key-value settings store.
//!
//! Timer durations, theme and the task score are persisted as JSON values
//! under string keys. The store is injected so the core stays testable
//! without touching the real filesystem.

use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::common::StorageError;

pub const TIMER_SETTINGS_KEY: &str = "timer-settings";
pub const THEME_KEY: &str = "theme";
pub const TASK_SCORE_KEY: &str = "task-score";

pub trait KvStore: Send + Sync {
    fn get(&self, key: &str) -> Option<Value>;
    fn put(&self, key: &str, value: Value) -> Result<(), StorageError>;
}

/// Single-file JSON store. The whole object is rewritten on every put;
/// settings are tiny and writes are rare.
pub struct JsonFileStore {
    path: PathBuf,
    entries: Mutex<serde_json::Map<String, Value>>,
}

impl JsonFileStore {
    /// Open the store, starting empty if the file is missing or corrupt.
    pub fn open(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let entries = match std::fs::read_to_string(&path) {
            Ok(s) => match serde_json::from_str::<serde_json::Map<String, Value>>(&s) {
                Ok(map) => map,
                Err(e) => {
                    warn!("settings file {} is corrupt, starting empty: {e}", path.display());
                    serde_json::Map::new()
                }
            },
            Err(_) => serde_json::Map::new(),
        };
        Self {
            path,
            entries: Mutex::new(entries),
        }
    }
}

impl KvStore for JsonFileStore {
    fn get(&self, key: &str) -> Option<Value> {
        self.entries.lock().get(key).cloned()
    }

    fn put(&self, key: &str, value: Value) -> Result<(), StorageError> {
        let serialized = {
            let mut entries = self.entries.lock();
            entries.insert(key.to_string(), value);
            serde_json::to_string_pretty(&*entries)?
        };
        std::fs::write(&self.path, serialized)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerSettings {
    pub work_minutes: u32,
    pub break_minutes: u32,
}

impl Default for TimerSettings {
    fn default() -> Self {
        Self {
            work_minutes: 25,
            break_minutes: 5,
        }
    }
}

/// Load saved timer settings, falling back to the given defaults when
/// nothing usable is stored.
pub fn load_timer_settings(store: &dyn KvStore, defaults: TimerSettings) -> TimerSettings {
    match store.get(TIMER_SETTINGS_KEY) {
        Some(value) => serde_json::from_value(value).unwrap_or(defaults),
        None => defaults,
    }
}

pub fn save_timer_settings(store: &dyn KvStore, settings: TimerSettings) {
    match serde_json::to_value(settings) {
        Ok(value) => {
            if let Err(e) = store.put(TIMER_SETTINGS_KEY, value) {
                warn!("failed to save timer settings: {e}");
            }
        }
        Err(e) => warn!("failed to serialize timer settings: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store() -> (tempfile::TempDir, JsonFileStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path().join("settings.json"));
        (dir, store)
    }

    #[test]
    fn put_then_get_roundtrip() {
        let (_dir, store) = temp_store();
        store.put(THEME_KEY, Value::String("dark".into())).unwrap();
        assert_eq!(store.get(THEME_KEY), Some(Value::String("dark".into())));
    }

    #[test]
    fn survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        {
            let store = JsonFileStore::open(&path);
            store.put(TASK_SCORE_KEY, Value::from(42)).unwrap();
        }
        let store = JsonFileStore::open(&path);
        assert_eq!(store.get(TASK_SCORE_KEY), Some(Value::from(42)));
    }

    #[test]
    fn corrupt_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{not json").unwrap();
        let store = JsonFileStore::open(&path);
        assert_eq!(store.get(THEME_KEY), None);
    }

    #[test]
    fn timer_settings_default_when_missing() {
        let (_dir, store) = temp_store();
        let defaults = TimerSettings::default();
        assert_eq!(load_timer_settings(&store, defaults), defaults);

        let saved = TimerSettings {
            work_minutes: 40,
            break_minutes: 10,
        };
        save_timer_settings(&store, saved);
        assert_eq!(load_timer_settings(&store, defaults), saved);
    }
}
