//! Key-value blob persistence
//!
//! The store persists its whole state as one serialized blob under a single
//! key. Implementations only need get/set/remove of strings.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::{Error, Result};

/// Opaque string storage keyed by name
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;

    async fn set(&self, key: &str, value: &str) -> Result<()>;

    async fn remove(&self, key: &str) -> Result<()>;
}

/// In-memory blob store
#[derive(Default)]
pub struct MemoryBlobStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current raw value, bypassing the async interface
    pub fn peek(&self, key: &str) -> Option<String> {
        self.entries.lock().get(key).cloned()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.lock().get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.entries.lock().remove(key);
        Ok(())
    }
}

/// Blob store keeping one `<key>.json` file per key in a directory
///
/// Each write goes to its own synced temporary file in the same directory and
/// is then persisted over the target, so a reader never sees a half-written
/// blob and concurrent writers never share a temp path.
pub struct FileBlobStore {
    dir: PathBuf,
}

impl FileBlobStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Default data directory (`<data_dir>/modelhub`)
    pub fn default_dir() -> PathBuf {
        dirs::data_dir()
            .map(|p| p.join("modelhub"))
            .unwrap_or_else(|| PathBuf::from(".modelhub"))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
            && !key.starts_with('.');
        if !valid {
            return Err(Error::Storage(format!("Invalid storage key: {:?}", key)));
        }
        Ok(self.dir.join(format!("{}.json", key)))
    }
}

/// Replace `path` with `bytes` through a synced temp file in `dir`
fn write_atomic(dir: &Path, path: &Path, bytes: &[u8]) -> Result<()> {
    std::fs::create_dir_all(dir)
        .map_err(|e| Error::Storage(format!("Failed to create {:?}: {}", dir, e)))?;

    let mut tmp = NamedTempFile::new_in(dir)
        .map_err(|e| Error::Storage(format!("Failed to create temp file in {:?}: {}", dir, e)))?;
    tmp.write_all(bytes)
        .and_then(|_| tmp.as_file().sync_all())
        .map_err(|e| Error::Storage(format!("Failed to write {:?}: {}", tmp.path(), e)))?;
    tmp.persist(path)
        .map_err(|e| Error::Storage(format!("Failed to replace {:?}: {}", path, e.error)))?;
    Ok(())
}

#[async_trait]
impl BlobStore for FileBlobStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key)?;
        match tokio::fs::read_to_string(&path).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::Storage(format!("Failed to read {:?}: {}", path, e))),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key)?;
        let dir = self.dir.clone();
        let content = value.to_string();
        let target = path.clone();

        tokio::task::spawn_blocking(move || write_atomic(&dir, &target, content.as_bytes()))
            .await
            .map_err(|e| Error::Storage(format!("Blob write task failed: {}", e)))??;

        debug!("Wrote {} bytes to {:?}", value.len(), path);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let path = self.path_for(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::Storage(format!("Failed to remove {:?}: {}", path, e))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_memory_store_roundtrip() {
        let store = MemoryBlobStore::new();
        assert_eq!(store.get("k").await.unwrap(), None);
        store.set("k", "v").await.unwrap();
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v"));
        store.remove("k").await.unwrap();
        assert_eq!(store.peek("k"), None);
    }

    #[tokio::test]
    async fn test_file_store_roundtrip() {
        let dir = TempDir::new().unwrap();
        let store = FileBlobStore::new(dir.path().join("nested"));

        assert_eq!(store.get("editor-config").await.unwrap(), None);
        store.set("editor-config", "{}").await.unwrap();
        assert_eq!(
            store.get("editor-config").await.unwrap().as_deref(),
            Some("{}")
        );
        assert!(dir.path().join("nested/editor-config.json").exists());
        assert_eq!(std::fs::read_dir(dir.path().join("nested")).unwrap().count(), 1);

        store.remove("editor-config").await.unwrap();
        store.remove("editor-config").await.unwrap();
        assert_eq!(store.get("editor-config").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_file_store_rejects_path_keys() {
        let dir = TempDir::new().unwrap();
        let store = FileBlobStore::new(dir.path());
        assert!(store.set("../escape", "x").await.is_err());
        assert!(store.get("").await.is_err());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_file_store_concurrent_writers() {
        let dir = TempDir::new().unwrap();

        let handles: Vec<_> = (0..32)
            .map(|i| {
                let dir = dir.path().to_path_buf();
                tokio::spawn(async move {
                    FileBlobStore::new(dir)
                        .set("k", &format!("{{\"writer\": {}}}", i))
                        .await
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let store = FileBlobStore::new(dir.path());
        let raw = store.get("k").await.unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert!(value["writer"].is_u64());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }
}
