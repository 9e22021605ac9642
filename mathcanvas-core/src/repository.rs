//! Persistence collaborators.
//!
//! The engine treats storage as an opaque, fallible service that accepts a
//! [`Document`] and hands back an id. Nothing here retries: failures are
//! returned to the caller untouched, and the in-memory canvas is never
//! modified by a save.

use std::collections::HashMap;
use std::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::document::Document;
use crate::error::PersistenceError;
use crate::CanvasResult;

/// Identifier assigned to a saved document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DocumentId(String);

impl DocumentId {
    /// Create a new unique document ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Borrow the id as a string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for DocumentId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<String> for DocumentId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for DocumentId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Storage for canvas documents.
#[async_trait]
pub trait DocumentRepository: Send + Sync {
    /// Store a document and return its new id.
    async fn save(&self, document: &Document) -> CanvasResult<DocumentId>;

    /// Fetch a previously saved document.
    ///
    /// Schema checks run here, so a stored document from a newer build fails
    /// with [`CanvasError::SchemaVersion`](crate::CanvasError::SchemaVersion).
    async fn load(&self, id: &DocumentId) -> CanvasResult<Document>;

    /// Ids of every stored document.
    async fn list(&self) -> CanvasResult<Vec<DocumentId>>;
}

/// In-process repository holding serialized documents in a map.
///
/// Cloning shares the underlying storage.
#[derive(Debug, Clone, Default)]
pub struct MemoryRepository {
    documents: Arc<RwLock<HashMap<DocumentId, String>>>,
}

impl MemoryRepository {
    /// Create an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store raw JSON under `id`, bypassing serialization.
    ///
    /// Lets hosts import documents produced elsewhere.
    pub fn insert_raw(&self, id: impl Into<DocumentId>, json: impl Into<String>) {
        let mut documents = self
            .documents
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        documents.insert(id.into(), json.into());
    }

    /// Number of stored documents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.documents
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Check if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl DocumentRepository for MemoryRepository {
    async fn save(&self, document: &Document) -> CanvasResult<DocumentId> {
        let json = serde_json::to_string(document)
            .map_err(|e| PersistenceError::Serialization(e.to_string()))?;
        let id = DocumentId::new();
        self.insert_raw(id.clone(), json);
        Ok(id)
    }

    async fn load(&self, id: &DocumentId) -> CanvasResult<Document> {
        let json = {
            let documents = self
                .documents
                .read()
                .unwrap_or_else(PoisonError::into_inner);
            documents
                .get(id)
                .cloned()
                .ok_or_else(|| PersistenceError::NotFound(id.to_string()))?
        };
        Document::from_json(&json)
    }

    async fn list(&self) -> CanvasResult<Vec<DocumentId>> {
        let documents = self
            .documents
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        let mut ids: Vec<_> = documents.keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }
}

/// Repository writing one JSON file per document under a data directory.
#[derive(Debug, Clone)]
pub struct FileRepository {
    data_dir: PathBuf,
}

impl FileRepository {
    /// Create a repository rooted at `data_dir`, creating the directory if
    /// it doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError::Io`] if the directory cannot be created.
    pub fn new(data_dir: impl Into<PathBuf>) -> CanvasResult<Self> {
        let data_dir = data_dir.into();
        std::fs::create_dir_all(&data_dir).map_err(PersistenceError::Io)?;
        Ok(Self { data_dir })
    }

    /// Directory documents are written to.
    #[must_use]
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    fn path_for(&self, id: &DocumentId) -> PathBuf {
        self.data_dir
            .join(format!("{}.json", sanitize_filename(id.as_str())))
    }
}

#[async_trait]
impl DocumentRepository for FileRepository {
    async fn save(&self, document: &Document) -> CanvasResult<DocumentId> {
        let json = serde_json::to_string_pretty(document)
            .map_err(|e| PersistenceError::Serialization(e.to_string()))?;
        let id = DocumentId::new();
        let path = self.path_for(&id);
        // Write then rename so a crash never leaves a truncated document.
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json)
            .await
            .map_err(PersistenceError::Io)?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(PersistenceError::Io)?;
        tracing::info!("Saved document {id} to {}", path.display());
        Ok(id)
    }

    async fn load(&self, id: &DocumentId) -> CanvasResult<Document> {
        let path = self.path_for(id);
        let json = match tokio::fs::read_to_string(&path).await {
            Ok(json) => json,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(PersistenceError::NotFound(id.to_string()).into());
            }
            Err(e) => return Err(PersistenceError::Io(e).into()),
        };
        Document::from_json(&json)
    }

    async fn list(&self) -> CanvasResult<Vec<DocumentId>> {
        let mut entries = tokio::fs::read_dir(&self.data_dir)
            .await
            .map_err(PersistenceError::Io)?;
        let mut ids = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(PersistenceError::Io)? {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    ids.push(DocumentId::from(stem));
                }
            }
        }
        ids.sort();
        Ok(ids)
    }
}

/// Sanitize a document ID for use as a filename.
///
/// Replaces any character that is not alphanumeric, `-`, or `_` with `_`.
fn sanitize_filename(id: &str) -> String {
    id.chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}
