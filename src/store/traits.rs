//! `KeyValueStore` trait: the client-local persistence the tour writes to.

use async_trait::async_trait;

use crate::error::StoreError;

/// Backend-agnostic string key-value store.
///
/// Writes are whole-value overwrites; there is no merge and no transaction
/// across keys. Concurrent writers to the same key race, last write wins.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read a value, `None` if the key is absent.
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Write a value, replacing any previous one.
    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Delete a key. Returns whether it existed.
    async fn remove(&self, key: &str) -> Result<bool, StoreError>;
}
