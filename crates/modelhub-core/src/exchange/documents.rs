//! Deployment document I/O
//!
//! Readers and writers for the two named JSON documents. The in-memory
//! implementation backs tests and previews; [`ProjectDocuments`] maps the
//! names onto a task-runner project checkout.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::deployment::{CONFIG_DOCUMENT, SUPPORTED_MODELS_DOCUMENT};
use crate::error::{Error, Result};

/// Source of named JSON documents
#[async_trait]
pub trait DocumentReader: Send + Sync {
    /// Read a document, `None` when it does not exist
    async fn read(&self, name: &str) -> Result<Option<Value>>;
}

/// Sink for named JSON documents
#[async_trait]
pub trait DocumentWriter: Send + Sync {
    /// Write several documents as one unit: either every document is
    /// replaced or none is
    async fn write_all(&self, documents: &[(&str, &Value)]) -> Result<()>;

    async fn write(&self, name: &str, document: &Value) -> Result<()> {
        self.write_all(&[(name, document)]).await
    }
}

/// Documents held in memory
#[derive(Default)]
pub struct MemoryDocuments {
    documents: Mutex<HashMap<String, Value>>,
}

impl MemoryDocuments {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, name: &str, document: Value) {
        self.documents.lock().insert(name.to_string(), document);
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        self.documents.lock().get(name).cloned()
    }
}

#[async_trait]
impl DocumentReader for MemoryDocuments {
    async fn read(&self, name: &str) -> Result<Option<Value>> {
        Ok(self.get(name))
    }
}

#[async_trait]
impl DocumentWriter for MemoryDocuments {
    async fn write_all(&self, documents: &[(&str, &Value)]) -> Result<()> {
        let mut stored = self.documents.lock();
        for (name, document) in documents {
            stored.insert(name.to_string(), (*document).clone());
        }
        Ok(())
    }
}

/// Documents inside a task-runner project directory
///
/// `supported-models.json` lives at `scripts/modules/supported-models.json`
/// and `config.json` at `.taskmaster/config.json`. A batch is staged into
/// synced temp files first and only then moved over the targets; a target
/// that fails to move rolls the earlier ones back. Once the whole batch has
/// landed, each replaced file's previous content is kept as `<file>.bak`.
pub struct ProjectDocuments {
    root: PathBuf,
}

impl ProjectDocuments {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File path for a document name
    pub fn path_for(&self, name: &str) -> Result<PathBuf> {
        match name {
            SUPPORTED_MODELS_DOCUMENT => Ok(self
                .root
                .join("scripts")
                .join("modules")
                .join(SUPPORTED_MODELS_DOCUMENT)),
            CONFIG_DOCUMENT => Ok(self.root.join(".taskmaster").join(CONFIG_DOCUMENT)),
            other => Err(Error::Storage(format!("Unknown document: {}", other))),
        }
    }
}

fn backup_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".bak");
    path.with_file_name(name)
}

#[async_trait]
impl DocumentReader for ProjectDocuments {
    async fn read(&self, name: &str) -> Result<Option<Value>> {
        let path = self.path_for(name)?;
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        debug!("Read {} bytes from {:?}", content.len(), path);
        Ok(Some(serde_json::from_str(&content)?))
    }
}

#[async_trait]
impl DocumentWriter for ProjectDocuments {
    async fn write_all(&self, documents: &[(&str, &Value)]) -> Result<()> {
        let mut staged = Vec::with_capacity(documents.len());
        for (name, document) in documents {
            let mut content = serde_json::to_string_pretty(document)?;
            content.push('\n');
            staged.push((self.path_for(name)?, content));
        }

        tokio::task::spawn_blocking(move || replace_files(staged))
            .await
            .map_err(|e| Error::Storage(format!("Document write task failed: {}", e)))?
    }
}

fn read_existing(path: &Path) -> Result<Option<Vec<u8>>> {
    match std::fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Move every staged file into place, or none of them
fn replace_files(staged: Vec<(PathBuf, String)>) -> Result<()> {
    let mut pending = Vec::with_capacity(staged.len());
    for (path, content) in staged {
        let previous = read_existing(&path)?;
        let parent = path.parent().unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(parent)?;

        let mut tmp = NamedTempFile::new_in(parent)?;
        tmp.write_all(content.as_bytes())?;
        tmp.as_file().sync_all()?;
        pending.push((path, tmp, previous));
    }

    let mut replaced: Vec<(PathBuf, Option<Vec<u8>>)> = Vec::with_capacity(pending.len());
    for (path, tmp, previous) in pending {
        if let Err(e) = tmp.persist(&path) {
            roll_back(&replaced);
            return Err(Error::Storage(format!(
                "Failed to replace {:?}: {}",
                path, e.error
            )));
        }
        debug!("Wrote {:?}", path);
        replaced.push((path, previous));
    }

    for (path, previous) in &replaced {
        if let Some(previous) = previous {
            let backup = backup_path(path);
            std::fs::write(&backup, previous)?;
            debug!("Backed up previous {:?} to {:?}", path, backup);
        }
    }
    Ok(())
}

fn roll_back(replaced: &[(PathBuf, Option<Vec<u8>>)]) {
    for (path, previous) in replaced {
        let restored = match previous {
            Some(bytes) => std::fs::write(path, bytes),
            None => std::fs::remove_file(path),
        };
        match restored {
            Ok(()) => warn!("Rolled back {:?}", path),
            Err(e) => warn!("Failed to roll back {:?}: {}", path, e),
        }
    }
}
