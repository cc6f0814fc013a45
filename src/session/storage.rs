// src/session/storage.rs
//! Durable session persistence

use crate::utils::errors::{CaptureError, Result};
use async_trait::async_trait;
use dashmap::DashMap;
use std::path::PathBuf;
use tokio::fs;

/// Durable key/value seam behind the session store.
#[async_trait]
pub trait SessionStorage: Send + Sync {
    /// Load the raw record stored under `key`, if any.
    async fn load(&self, key: &str) -> Result<Option<String>>;

    /// Store `value` under `key`, replacing any existing record.
    async fn store(&self, key: &str, value: &str) -> Result<()>;
}

/// File-backed storage, one JSON file per key.
pub struct FileStorage {
    base_dir: PathBuf,
}

impl FileStorage {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        // Keys are namespaced with ':'; flatten to a safe file name
        let name: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '.' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.base_dir.join(format!("{}.json", name))
    }
}

#[async_trait]
impl SessionStorage for FileStorage {
    async fn load(&self, key: &str) -> Result<Option<String>> {
        match fs::read_to_string(self.path_for(key)).await {
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(CaptureError::Storage(format!(
                "Failed to read session record: {}",
                e
            ))),
        }
    }

    async fn store(&self, key: &str, value: &str) -> Result<()> {
        fs::create_dir_all(&self.base_dir).await.map_err(|e| {
            CaptureError::Storage(format!("Failed to create storage directory: {}", e))
        })?;
        fs::write(self.path_for(key), value)
            .await
            .map_err(|e| CaptureError::Storage(format!("Failed to write session record: {}", e)))
    }
}

/// In-memory storage for tests and ephemeral embeddings.
#[derive(Default)]
pub struct MemoryStorage {
    records: DashMap<String, String>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStorage for MemoryStorage {
    async fn load(&self, key: &str) -> Result<Option<String>> {
        Ok(self.records.get(key).map(|entry| entry.value().clone()))
    }

    async fn store(&self, key: &str, value: &str) -> Result<()> {
        self.records.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_file_storage_roundtrip() {
        let dir = tempdir().unwrap();
        let storage = FileStorage::new(dir.path());

        assert_eq!(storage.load("beacon:session:v1:proj").await.unwrap(), None);

        storage
            .store("beacon:session:v1:proj", "{\"session_id\":\"abc\"}")
            .await
            .unwrap();

        let loaded = storage.load("beacon:session:v1:proj").await.unwrap();
        assert_eq!(loaded.as_deref(), Some("{\"session_id\":\"abc\"}"));
    }

    #[tokio::test]
    async fn test_file_storage_overwrites() {
        let dir = tempdir().unwrap();
        let storage = FileStorage::new(dir.path());

        storage.store("key", "first").await.unwrap();
        storage.store("key", "second").await.unwrap();

        assert_eq!(storage.load("key").await.unwrap().as_deref(), Some("second"));
    }

    #[tokio::test]
    async fn test_file_storage_key_flattening() {
        let dir = tempdir().unwrap();
        let storage = FileStorage::new(dir.path());

        storage.store("beacon:session:v1:a/b", "x").await.unwrap();
        // Separator characters never escape the base directory
        assert_eq!(
            storage.load("beacon:session:v1:a/b").await.unwrap().as_deref(),
            Some("x")
        );
        assert!(dir.path().join("beacon_session_v1_a_b.json").exists());
    }

    #[tokio::test]
    async fn test_memory_storage_roundtrip() {
        let storage = MemoryStorage::new();
        storage.store("key", "value").await.unwrap();
        assert_eq!(storage.load("key").await.unwrap().as_deref(), Some("value"));
        assert_eq!(storage.load("other").await.unwrap(), None);
    }
}
