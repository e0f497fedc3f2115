//! In-memory key-value store for tests and ephemeral sessions.

use std::collections::HashMap;
use std::sync::Mutex;

use super::{KeyValueStore, Result, StorageError};

/// Key-value store that lives only as long as the process.
#[derive(Debug, Default)]
pub struct MemoryKeyValueStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let Ok(entries) = self.entries.lock() else {
            return Err(StorageError::Poisoned);
        };
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let Ok(mut entries) = self.entries.lock() else {
            return Err(StorageError::Poisoned);
        };
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn clear_all(&self) -> Result<()> {
        let Ok(mut entries) = self.entries.lock() else {
            return Err(StorageError::Poisoned);
        };
        entries.clear();
        Ok(())
    }

    fn len(&self) -> Result<usize> {
        let Ok(entries) = self.entries.lock() else {
            return Err(StorageError::Poisoned);
        };
        Ok(entries.len())
    }
}
