//! Key-value persistence for the authorization state.
//!
//! The authorization store serializes its whole state into a single value,
//! so backends only need string keys and values.

mod error;
mod memory;
mod sqlite;

pub use error::{Result, StorageError};
pub use memory::MemoryKeyValueStore;
pub use sqlite::SqliteKeyValueStore;

/// Synchronous string key-value persistence.
pub trait KeyValueStore: Send + Sync {
    /// Read the value stored under `key`.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Remove every key.
    fn clear_all(&self) -> Result<()>;

    /// Number of stored keys.
    fn len(&self) -> Result<usize>;

    /// Whether the store holds no keys.
    fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}
