use crate::error::{StoreError, StoreResult};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::warn;

pub const SETTINGS_KEY: &str = "focusflow_settings";
pub const HISTORY_KEY: &str = "focusflow_history";
pub const BLOCKED_SITES_KEY: &str = "focusflow_blocked_sites";

/// Durable key-value storage of JSON strings.
pub trait KeyValueStore: Send {
    fn get(&self, key: &str) -> StoreResult<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> StoreResult<()>;
}

/// One `<key>.json` file per key inside a data directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    base_dir: PathBuf,
}

impl FileStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> StoreResult<Self> {
        let base_dir = base_dir.into();
        fs::create_dir_all(&base_dir)?;
        Ok(Self { base_dir })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.base_dir.join(format!("{key}.json"))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(contents) if contents.trim().is_empty() => Ok(None),
            Ok(contents) => Ok(Some(contents)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> StoreResult<()> {
        let path = self.path_for(key);
        let temp_path = path.with_extension("tmp");
        let file = fs::File::create(&temp_path)?;
        let mut writer = BufWriter::new(file);
        writer.write_all(value.as_bytes())?;
        writer.write_all(b"\n")?;
        writer.flush()?;

        match fs::rename(&temp_path, &path) {
            Ok(()) => Ok(()),
            Err(_err) if path.exists() => {
                if let Err(e) = fs::remove_file(&path) {
                    warn!("Failed to remove {}: {}", path.display(), e);
                }
                fs::rename(&temp_path, &path).map_err(StoreError::from)
            }
            Err(err) => Err(StoreError::from(err)),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> StoreResult<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Opens the file store in `dir`, or an in-memory one when the directory
/// cannot be used. Nothing is saved across restarts in that case.
pub fn open_store(dir: &Path) -> Box<dyn KeyValueStore> {
    match FileStore::new(dir) {
        Ok(store) => Box::new(store),
        Err(e) => {
            warn!("Persistence unavailable ({}), running without saving", e);
            Box::new(MemoryStore::new())
        }
    }
}

/// Typed access on top of a [`KeyValueStore`].
///
/// Reads fail open: a missing, unreadable or malformed record loads as `None`
/// so callers keep their defaults. Write failures are logged and dropped.
pub struct Persistence {
    store: Box<dyn KeyValueStore>,
}

impl Persistence {
    pub fn new(store: Box<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub fn load<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = match self.store.get(key) {
            Ok(raw) => raw?,
            Err(e) => {
                warn!("Failed to read {}: {}", key, e);
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Ignoring malformed {}: {}", key, e);
                None
            }
        }
    }

    pub fn try_save<T: Serialize + ?Sized>(&mut self, key: &str, value: &T) -> StoreResult<()> {
        let json = serde_json::to_string(value)?;
        self.store.set(key, &json)
    }

    pub fn save<T: Serialize + ?Sized>(&mut self, key: &str, value: &T) {
        if let Err(e) = self.try_save(key, value) {
            warn!("Failed to save {}: {}", key, e);
        }
    }
}
