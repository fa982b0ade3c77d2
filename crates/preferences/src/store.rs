//! Key-value preference persistence.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use common::Error;
use serde_json::Value;
use tracing::debug;

/// Local key-value storage. Values are arbitrary JSON.
pub trait PreferenceStore: Send + Sync {
    fn save(&self, key: &str, value: Value) -> Result<(), Error>;

    fn load(&self, key: &str) -> Result<Option<Value>, Error>;

    fn remove(&self, key: &str) -> Result<(), Error>;
}

/// Process-local store, lost on exit.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PreferenceStore for MemoryStore {
    fn save(&self, key: &str, value: Value) -> Result<(), Error> {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.to_string(), value);
        Ok(())
    }

    fn load(&self, key: &str) -> Result<Option<Value>, Error> {
        Ok(self
            .entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .cloned())
    }

    fn remove(&self, key: &str) -> Result<(), Error> {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(key);
        Ok(())
    }
}

/// All keys in one JSON object on disk.
///
/// Writes go to a sibling temp file that is renamed over the original, so a
/// crash mid-write leaves the previous contents intact.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    // Serializes read-modify-write cycles from this process.
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<BTreeMap<String, Value>, Error> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => return Err(e.into()),
        };
        if contents.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&contents).map_err(|e| {
            Error::Storage(format!("{} is not a JSON object: {}", self.path.display(), e))
        })
    }

    fn write_all(&self, entries: &BTreeMap<String, Value>) -> Result<(), Error> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        let body = serde_json::to_string_pretty(entries)?;
        fs::write(&tmp, body)?;
        fs::rename(&tmp, &self.path)?;
        debug!("Wrote {} preference keys to {}", entries.len(), self.path.display());
        Ok(())
    }

    fn modify(&self, f: impl FnOnce(&mut BTreeMap<String, Value>)) -> Result<(), Error> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut entries = self.read_all()?;
        f(&mut entries);
        self.write_all(&entries)
    }
}

impl PreferenceStore for JsonFileStore {
    fn save(&self, key: &str, value: Value) -> Result<(), Error> {
        self.modify(|entries| {
            entries.insert(key.to_string(), value);
        })
    }

    fn load(&self, key: &str) -> Result<Option<Value>, Error> {
        Ok(self.read_all()?.remove(key))
    }

    fn remove(&self, key: &str) -> Result<(), Error> {
        self.modify(|entries| {
            entries.remove(key);
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_memory_store_round_trip() {
        let store = MemoryStore::new();
        assert_eq!(store.load("k").unwrap(), None);

        store.save("k", json!({"a": 1})).unwrap();
        assert_eq!(store.load("k").unwrap(), Some(json!({"a": 1})));

        store.remove("k").unwrap();
        assert_eq!(store.load("k").unwrap(), None);
    }

    #[test]
    fn test_file_store_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("prefs.json");

        let store = JsonFileStore::new(&path);
        assert_eq!(store.load("appSetting").unwrap(), None);
        store.save("appSetting", json!({"fontSize": 32})).unwrap();
        store.save("reservedHospitals", json!(["H1"])).unwrap();

        let reopened = JsonFileStore::new(&path);
        assert_eq!(
            reopened.load("appSetting").unwrap(),
            Some(json!({"fontSize": 32}))
        );
        assert_eq!(
            reopened.load("reservedHospitals").unwrap(),
            Some(json!(["H1"]))
        );
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn test_file_store_rejects_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefs.json");
        std::fs::write(&path, "not json").unwrap();

        let store = JsonFileStore::new(&path);
        assert!(matches!(store.load("appSetting"), Err(Error::Storage(_))));
    }
}
