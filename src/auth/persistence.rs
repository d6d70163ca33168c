use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::{Result, WalletError};

/// Key under which the logged-in wallet address is stored.
pub const USER_KEY: &str = "user";
/// Key for the DID token that authorises relay calls for that user.
pub const DID_TOKEN_KEY: &str = "didToken";

const STORE_FILE: &str = "store.json";
const APP_DIR: &str = "magic-aa-wallet";

/// String key-value store that survives restarts.
pub trait KvStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

/// JSON object on disk, rewritten on every change.
pub struct FileKvStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileKvStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Store in the platform data directory.
    pub fn in_app_data_dir() -> Self {
        let dir = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR);
        Self::new(dir.join(STORE_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_map(&self) -> Result<BTreeMap<String, String>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let contents = std::fs::read_to_string(&self.path)?;
        if contents.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&contents).map_err(|e| {
            WalletError::Storage(format!("failed to parse {}: {e}", self.path.display()))
        })
    }

    fn write_map(&self, map: &BTreeMap<String, String>) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let json = serde_json::to_string_pretty(map)
            .map_err(|e| WalletError::Storage(format!("failed to serialize store: {e}")))?;
        std::fs::write(&self.path, json)?;
        Ok(())
    }

    fn guard(&self) -> Result<std::sync::MutexGuard<'_, ()>> {
        self.lock
            .lock()
            .map_err(|_| WalletError::Storage("store lock poisoned".to_string()))
    }
}

impl KvStore for FileKvStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let _guard = self.guard()?;
        Ok(self.read_map()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let _guard = self.guard()?;
        let mut map = self.read_map()?;
        map.insert(key.to_string(), value.to_string());
        self.write_map(&map)?;
        log::debug!("[Store] saved {:?} to {:?}", key, self.path);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let _guard = self.guard()?;
        let mut map = self.read_map()?;
        if map.remove(key).is_some() {
            self.write_map(&map)?;
            log::info!("[Store] removed {:?} from {:?}", key, self.path);
        }
        Ok(())
    }
}

/// Process-local store.
#[derive(Default)]
pub struct MemoryKvStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryKvStore {
    fn entries(&self) -> Result<std::sync::MutexGuard<'_, BTreeMap<String, String>>> {
        self.entries
            .lock()
            .map_err(|_| WalletError::Storage("store lock poisoned".to_string()))
    }
}

impl KvStore for MemoryKvStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.entries()?.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_store_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(STORE_FILE);

        let store = FileKvStore::new(&path);
        assert_eq!(store.get(USER_KEY).unwrap(), None);
        store.set(USER_KEY, "0xabc").unwrap();
        store.set("other", "1").unwrap();

        let reopened = FileKvStore::new(&path);
        assert_eq!(reopened.get(USER_KEY).unwrap().as_deref(), Some("0xabc"));

        reopened.remove(USER_KEY).unwrap();
        assert_eq!(store.get(USER_KEY).unwrap(), None);
        assert_eq!(store.get("other").unwrap().as_deref(), Some("1"));
    }

    #[test]
    fn corrupt_file_is_a_storage_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(STORE_FILE);
        std::fs::write(&path, "{not json").unwrap();
        let err = FileKvStore::new(&path).get(USER_KEY).unwrap_err();
        assert!(matches!(err, WalletError::Storage(_)));
    }

    #[test]
    fn memory_store_round_trip() {
        let store = MemoryKvStore::default();
        store.set(USER_KEY, "0x1").unwrap();
        assert_eq!(store.get(USER_KEY).unwrap().as_deref(), Some("0x1"));
        store.remove(USER_KEY).unwrap();
        assert!(store.get(USER_KEY).unwrap().is_none());
    }
}
