//! In-memory key-value storage.

use std::collections::BTreeMap;
use std::sync::RwLock;

use super::{KeyValueStore, StorageError};

/// Non-durable store, for tests and ephemeral sessions.
///
/// Writes can be made to fail to exercise persistence error paths.
#[derive(Debug, Default)]
pub struct MemoryKeyValueStore {
    values: RwLock<BTreeMap<String, String>>,
    fail_writes: RwLock<bool>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `put`/`remove` fail with a quota error.
    pub fn set_fail_writes(&self, fail: bool) {
        if let Ok(mut flag) = self.fail_writes.write() {
            *flag = fail;
        }
    }

    fn check_writable(&self) -> Result<(), StorageError> {
        let failing = self.fail_writes.read().map(|f| *f).unwrap_or(false);
        if failing {
            return Err(StorageError::QuotaExceeded(
                "write rejected by memory store".to_string(),
            ));
        }
        Ok(())
    }
}

fn poisoned() -> StorageError {
    StorageError::Database("memory store lock poisoned".to_string())
}

impl KeyValueStore for MemoryKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let values = self.values.read().map_err(|_| poisoned())?;
        Ok(values.get(key).cloned())
    }

    fn put(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.check_writable()?;
        let mut values = self.values.write().map_err(|_| poisoned())?;
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.check_writable()?;
        let mut values = self.values.write().map_err(|_| poisoned())?;
        values.remove(key);
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, StorageError> {
        let values = self.values.read().map_err(|_| poisoned())?;
        Ok(values.keys().cloned().collect())
    }
}
