use shared::persistence::{KeyValueStore, MemoryStore, PersistenceError, PrefValue};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Player preferences kept as a JSON object on disk. Every `save` rewrites
/// the whole file through a temporary sibling.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    entries: MemoryStore,
}

impl JsonFileStore {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, PersistenceError> {
        let path = path.into();
        let entries: BTreeMap<String, PrefValue> = match fs::read_to_string(&path) {
            Ok(contents) if contents.trim().is_empty() => BTreeMap::new(),
            Ok(contents) => {
                serde_json::from_str(&contents).map_err(|e| PersistenceError::Format(e.to_string()))?
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::info!("No store at {}, starting fresh", path.display());
                BTreeMap::new()
            }
            Err(e) => return Err(e.into()),
        };
        Ok(Self {
            path,
            entries: MemoryStore::from_entries(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl KeyValueStore for JsonFileStore {
    fn get_int(&self, key: &str) -> Option<i64> {
        self.entries.get_int(key)
    }

    fn get_float(&self, key: &str) -> Option<f64> {
        self.entries.get_float(key)
    }

    fn set_int(&mut self, key: &str, value: i64) {
        self.entries.set_int(key, value);
    }

    fn set_float(&mut self, key: &str, value: f64) {
        self.entries.set_float(key, value);
    }

    fn has_key(&self, key: &str) -> bool {
        self.entries.has_key(key)
    }

    fn save(&mut self) -> Result<(), PersistenceError> {
        let contents = serde_json::to_string_pretty(self.entries.entries())
            .map_err(|e| PersistenceError::Format(e.to_string()))?;
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let temp_path = self.temp_path();
        fs::write(&temp_path, contents)?;
        fs::rename(&temp_path, &self.path)?;
        Ok(())
    }
}

#[cfg(test)]
pub(crate) fn temp_store_path() -> PathBuf {
    std::env::temp_dir()
        .join("coin-backend-tests")
        .join(format!("{}.json", uuid::Uuid::new_v4()))
}
