//! Key-value storage collaborator.
//!
//! The ledger reads and writes whole JSON values under well-known keys.
//! Two backends: [`MemoryStore`] for tests and ephemeral runs,
//! [`SqliteStore`] for durable CLI use.

pub mod memory;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use async_trait::async_trait;
use serde_json::Value;

/// Errors from the storage collaborator.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Database operation failed.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A stored value could not be decoded as JSON.
    #[error("corrupt value under key {key:?}: {source}")]
    Corrupt {
        /// The key whose value failed to decode.
        key: String,
        /// The underlying decode error.
        source: serde_json::Error,
    },
}

/// Minimal key-value persistence: get/set/remove on JSON values.
///
/// Callers perform read-modify-write cycles against this trait with no
/// transactional guard; concurrent writers to the same key are
/// last-write-wins.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Load the value stored under `key`, if any.
    async fn get(&self, key: &str) -> Result<Option<Value>, StorageError>;

    /// Store `value` under `key`, replacing any existing value.
    async fn set(&self, key: &str, value: Value) -> Result<(), StorageError>;

    /// Delete `key` entirely. Removing a missing key is a no-op.
    async fn remove(&self, key: &str) -> Result<(), StorageError>;
}
