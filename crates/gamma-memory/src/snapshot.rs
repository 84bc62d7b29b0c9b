use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde_json::{Map, Value};
use tracing::debug;

use gamma_core::config::StorageConfig;
use gamma_core::error::{GammaError, Result};
use gamma_core::traits::SnapshotStore;

/// File-backed snapshot store: one JSON object per file, written wholesale
/// on every update. Last-writer-wins; a torn write loses at most the most
/// recent update, which callers tolerate by design.
pub struct FileSnapshotStore {
    path: PathBuf,
    cells: Mutex<Map<String, Value>>,
}

impl FileSnapshotStore {
    /// Open the store, loading any existing snapshot file.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let cells = if path.exists() {
            let raw = std::fs::read_to_string(path)?;
            if raw.trim().is_empty() {
                Map::new()
            } else {
                let value: Value = serde_json::from_str(&raw)
                    .map_err(|e| GammaError::Snapshot(format!("corrupt snapshot file: {}", e)))?;
                value
                    .as_object()
                    .cloned()
                    .ok_or_else(|| {
                        GammaError::Snapshot("snapshot file is not a JSON object".to_string())
                    })?
            }
        } else {
            Map::new()
        };

        debug!(path = %path.display(), keys = cells.len(), "Snapshot store opened");
        Ok(Self {
            path: path.to_path_buf(),
            cells: Mutex::new(cells),
        })
    }

    /// Open the store at the file named in the `[storage]` config section.
    pub fn from_config(config: &StorageConfig) -> Result<Self> {
        Self::open(Path::new(&config.snapshot_file))
    }
}

impl SnapshotStore for FileSnapshotStore {
    fn write(&self, key: &str, value: &Value) -> Result<()> {
        let mut cells = self
            .cells
            .lock()
            .map_err(|e| GammaError::Snapshot(e.to_string()))?;
        cells.insert(key.to_string(), value.clone());
        let raw = serde_json::to_string_pretty(&Value::Object(cells.clone()))?;
        std::fs::write(&self.path, raw)?;
        Ok(())
    }

    fn read(&self, key: &str) -> Result<Option<Value>> {
        let cells = self
            .cells
            .lock()
            .map_err(|e| GammaError::Snapshot(e.to_string()))?;
        Ok(cells.get(key).cloned())
    }
}

/// In-memory snapshot store for tests and embedded use.
#[derive(Default)]
pub struct InMemorySnapshotStore {
    cells: Mutex<Map<String, Value>>,
}

impl InMemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SnapshotStore for InMemorySnapshotStore {
    fn write(&self, key: &str, value: &Value) -> Result<()> {
        let mut cells = self
            .cells
            .lock()
            .map_err(|e| GammaError::Snapshot(e.to_string()))?;
        cells.insert(key.to_string(), value.clone());
        Ok(())
    }

    fn read(&self, key: &str) -> Result<Option<Value>> {
        let cells = self
            .cells
            .lock()
            .map_err(|e| GammaError::Snapshot(e.to_string()))?;
        Ok(cells.get(key).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_store_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");

        let store = FileSnapshotStore::open(&path).unwrap();
        store
            .write("executions", &serde_json::json!({"run-1": {"status": "completed"}}))
            .unwrap();

        // Reopen from disk: the written value survives.
        let reopened = FileSnapshotStore::open(&path).unwrap();
        let value = reopened.read("executions").unwrap().unwrap();
        assert_eq!(value["run-1"]["status"], "completed");
    }

    #[test]
    fn test_from_config_opens_configured_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("configured.json");
        let config = StorageConfig {
            snapshot_file: path.display().to_string(),
            snapshot_key: "executions".to_string(),
        };

        let store = FileSnapshotStore::from_config(&config).unwrap();
        store.write("executions", &serde_json::json!({})).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_file_store_missing_key() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSnapshotStore::open(&dir.path().join("state.json")).unwrap();
        assert!(store.read("nope").unwrap().is_none());
    }

    #[test]
    fn test_file_store_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/deeper/state.json");
        let store = FileSnapshotStore::open(&path).unwrap();
        store.write("k", &serde_json::json!(1)).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_file_store_rejects_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, "not json at all").unwrap();
        assert!(FileSnapshotStore::open(&path).is_err());
    }

    #[test]
    fn test_write_overwrites_previous_value() {
        let store = InMemorySnapshotStore::new();
        store.write("k", &serde_json::json!(1)).unwrap();
        store.write("k", &serde_json::json!(2)).unwrap();
        assert_eq!(store.read("k").unwrap().unwrap(), serde_json::json!(2));
    }
}
