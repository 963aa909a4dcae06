//! Document store on the local filesystem.
//!
//! Each document is a JSON file at `{root}/{collection}/{id}.json`. Writes
//! go to a temp file and are renamed into place.

use serde_json::Value as JsonValue;
use std::path::{Path, PathBuf};
use temario_error::{PersistenceError, PersistenceErrorKind, TemarioResult};
use temario_interface::{DocumentStore, StoredDocument, WriteMode, merge_documents};
use tokio::sync::Mutex;
use uuid::Uuid;

const EXTENSION: &str = "json";

/// JSON-file document store.
#[derive(Debug)]
pub struct FileSystemDocumentStore {
    root: PathBuf,
    // Serializes read-modify-write merges within this process.
    merge_lock: Mutex<()>,
}

impl FileSystemDocumentStore {
    /// Open a store rooted at `root`, creating the directory if needed.
    #[tracing::instrument(skip(root))]
    pub fn new(root: impl Into<PathBuf>) -> TemarioResult<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root).map_err(|e| {
            PersistenceError::new(PersistenceErrorKind::Write(format!(
                "{}: {}",
                root.display(),
                e
            )))
        })?;
        tracing::info!(path = %root.display(), "Opened filesystem document store");
        Ok(Self {
            root,
            merge_lock: Mutex::new(()),
        })
    }

    fn collection_dir(&self, collection: &str) -> TemarioResult<PathBuf> {
        check_segments(collection)?;
        Ok(self.root.join(collection))
    }

    fn document_path(&self, collection: &str, id: &str) -> TemarioResult<PathBuf> {
        if id.contains('/') {
            return Err(invalid_path(id));
        }
        check_segments(id)?;
        Ok(self
            .collection_dir(collection)?
            .join(format!("{}.{}", id, EXTENSION)))
    }

    async fn read(path: &Path) -> TemarioResult<Option<JsonValue>> {
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(PersistenceError::new(PersistenceErrorKind::Read(format!(
                    "{}: {}",
                    path.display(),
                    e
                )))
                .into());
            }
        };
        let value = serde_json::from_slice(&bytes).map_err(|e| {
            PersistenceError::new(PersistenceErrorKind::Serialization {
                path: path.display().to_string(),
                message: e.to_string(),
            })
        })?;
        Ok(Some(value))
    }

    async fn write(path: &Path, document: &JsonValue) -> TemarioResult<()> {
        let write_err = |e: std::io::Error| {
            PersistenceError::new(PersistenceErrorKind::Write(format!(
                "{}: {}",
                path.display(),
                e
            )))
        };

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
        }
        let bytes = serde_json::to_vec_pretty(document).map_err(|e| {
            PersistenceError::new(PersistenceErrorKind::Serialization {
                path: path.display().to_string(),
                message: e.to_string(),
            })
        })?;

        let temp_path = path.with_extension(format!("{}.tmp", Uuid::new_v4()));
        tokio::fs::write(&temp_path, bytes).await.map_err(write_err)?;
        if let Err(e) = tokio::fs::rename(&temp_path, path).await {
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(write_err(e).into());
        }
        Ok(())
    }
}

fn invalid_path(path: &str) -> temario_error::TemarioError {
    PersistenceError::new(PersistenceErrorKind::Write(format!(
        "invalid document path '{}'",
        path
    )))
    .into()
}

fn check_segments(path: &str) -> TemarioResult<()> {
    let bad = path.is_empty()
        || path.contains('\\')
        || path
            .split('/')
            .any(|segment| segment.is_empty() || segment == "." || segment == "..");
    if bad {
        return Err(invalid_path(path));
    }
    Ok(())
}

#[async_trait::async_trait]
impl DocumentStore for FileSystemDocumentStore {
    #[tracing::instrument(skip(self))]
    async fn get(&self, collection: &str, id: &str) -> TemarioResult<Option<JsonValue>> {
        let path = self.document_path(collection, id)?;
        Self::read(&path).await
    }

    #[tracing::instrument(skip(self))]
    async fn list(&self, collection: &str) -> TemarioResult<Vec<StoredDocument>> {
        let dir = self.collection_dir(collection)?;
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(PersistenceError::new(PersistenceErrorKind::Read(format!(
                    "{}: {}",
                    dir.display(),
                    e
                )))
                .into());
            }
        };

        let mut documents = Vec::new();
        loop {
            let entry = entries.next_entry().await.map_err(|e| {
                PersistenceError::new(PersistenceErrorKind::Read(format!(
                    "{}: {}",
                    dir.display(),
                    e
                )))
            })?;
            let Some(entry) = entry else { break };
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(EXTENSION) {
                continue;
            }
            let Some(id) = path.file_stem().and_then(|stem| stem.to_str()) else {
                continue;
            };
            if let Some(data) = Self::read(&path).await? {
                documents.push(StoredDocument {
                    id: id.to_string(),
                    data,
                });
            }
        }
        documents.sort_by(|a, b| a.id.cmp(&b.id));
        tracing::debug!(count = documents.len(), "Listed documents");
        Ok(documents)
    }

    #[tracing::instrument(skip(self, document))]
    async fn set(
        &self,
        collection: &str,
        id: &str,
        document: JsonValue,
        mode: WriteMode,
    ) -> TemarioResult<()> {
        let path = self.document_path(collection, id)?;
        match mode {
            WriteMode::Overwrite => Self::write(&path, &document).await,
            WriteMode::Merge => {
                let _guard = self.merge_lock.lock().await;
                let merged = match Self::read(&path).await? {
                    Some(mut existing) => {
                        merge_documents(&mut existing, document);
                        existing
                    }
                    None => document,
                };
                Self::write(&path, &merged).await
            }
        }
    }

    #[tracing::instrument(skip(self))]
    async fn delete(&self, collection: &str, id: &str) -> TemarioResult<()> {
        let path = self.document_path(collection, id)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(PersistenceError::new(PersistenceErrorKind::Delete(format!(
                "{}: {}",
                path.display(),
                e
            )))
            .into()),
        }
    }

    fn backend_name(&self) -> &'static str {
        "filesystem"
    }
}
