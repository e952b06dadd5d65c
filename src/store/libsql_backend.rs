//! libSQL backend — durable `KeyValueStore` implementation.
//!
//! Supports local file and in-memory databases.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use libsql::{Connection, Database as LibSqlDatabase, params};
use tracing::info;

use crate::error::StoreError;
use crate::store::migrations;
use crate::store::traits::KeyValueStore;

/// libSQL key-value store.
///
/// Stores a single connection that is reused for all operations.
pub struct LibSqlStore {
    #[allow(dead_code)]
    db: Arc<LibSqlDatabase>,
    conn: Connection,
}

impl LibSqlStore {
    /// Open (or create) a local database file and run migrations.
    pub async fn new_local(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                StoreError::Connection(format!("Failed to create database directory: {e}"))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| StoreError::Connection(format!("Failed to open libSQL database: {e}")))?;

        let store = Self::from_database(db).await?;
        info!(path = %path.display(), "Profile database opened");
        Ok(store)
    }

    /// Create an in-memory database (for tests).
    pub async fn new_memory() -> Result<Self, StoreError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| {
                StoreError::Connection(format!("Failed to create in-memory database: {e}"))
            })?;
        Self::from_database(db).await
    }

    async fn from_database(db: LibSqlDatabase) -> Result<Self, StoreError> {
        let conn = db
            .connect()
            .map_err(|e| StoreError::Connection(format!("Failed to create connection: {e}")))?;
        migrations::run_migrations(&conn).await?;
        Ok(Self {
            db: Arc::new(db),
            conn,
        })
    }
}

#[async_trait]
impl KeyValueStore for LibSqlStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut rows = self
            .conn
            .query("SELECT value FROM kv_store WHERE key = ?1", params![key])
            .await
            .map_err(|e| StoreError::Query(format!("get: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => row
                .get::<String>(0)
                .map(Some)
                .map_err(|e| StoreError::Query(format!("get: {e}"))),
            Ok(None) => Ok(None),
            Err(e) => Err(StoreError::Query(format!("get: {e}"))),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let now = Utc::now().to_rfc3339();
        self.conn
            .execute(
                "INSERT INTO kv_store (key, value, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT (key) DO UPDATE SET value = ?2, updated_at = ?3",
                params![key, value, now],
            )
            .await
            .map_err(|e| StoreError::Query(format!("set: {e}")))?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<bool, StoreError> {
        let count = self
            .conn
            .execute("DELETE FROM kv_store WHERE key = ?1", params![key])
            .await
            .map_err(|e| StoreError::Query(format!("remove: {e}")))?;
        Ok(count > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn kv_crud() {
        let store = LibSqlStore::new_memory().await.unwrap();
        assert!(store.get("profile").await.unwrap().is_none());

        store.set("profile", r#"{"a":1}"#).await.unwrap();
        assert_eq!(
            store.get("profile").await.unwrap().as_deref(),
            Some(r#"{"a":1}"#)
        );

        store.set("profile", r#"{"a":2}"#).await.unwrap();
        assert_eq!(
            store.get("profile").await.unwrap().as_deref(),
            Some(r#"{"a":2}"#)
        );

        assert!(store.remove("profile").await.unwrap());
        assert!(!store.remove("profile").await.unwrap());
        assert!(store.get("profile").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn values_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("tour.db");

        {
            let store = LibSqlStore::new_local(&path).await.unwrap();
            store.set("flag", "true").await.unwrap();
        }

        let reopened = LibSqlStore::new_local(&path).await.unwrap();
        assert_eq!(reopened.get("flag").await.unwrap().as_deref(), Some("true"));
    }
}
