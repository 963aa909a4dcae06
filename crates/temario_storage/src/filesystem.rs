//! Filesystem object storage.
//!
//! Objects live at `{base_path}/{key}`. Writes go to a uniquely named temp
//! file next to the target and are renamed into place, so a reader never sees
//! a half-written PDF and a failed upload leaves the previous object intact.

use crate::{content_hash, validate_key};
use std::path::PathBuf;
use temario_error::{StorageError, StorageErrorKind, TemarioResult};
use temario_interface::{ObjectStorage, StoredObject};
use uuid::Uuid;

/// Filesystem storage backend.
///
/// Public URLs are `{public_base_url}/{key}` when a base URL is configured
/// (a static file server in front of `base_path`), or `file://` URLs of the
/// canonical path otherwise.
#[derive(Debug, Clone)]
pub struct FileSystemObjectStorage {
    base_path: PathBuf,
    public_base_url: Option<String>,
}

impl FileSystemObjectStorage {
    /// Create a new filesystem storage backend.
    ///
    /// Creates the base directory if it doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns error if the directory cannot be created or resolved.
    #[tracing::instrument(skip_all)]
    pub fn new(
        base_path: impl Into<PathBuf>,
        public_base_url: Option<String>,
    ) -> TemarioResult<Self> {
        let base_path = base_path.into();

        std::fs::create_dir_all(&base_path).map_err(|e| {
            StorageError::new(StorageErrorKind::DirectoryCreation(format!(
                "{}: {}",
                base_path.display(),
                e
            )))
        })?;
        let base_path = std::fs::canonicalize(&base_path).map_err(|e| {
            StorageError::new(StorageErrorKind::DirectoryCreation(format!(
                "{}: {}",
                base_path.display(),
                e
            )))
        })?;

        let public_base_url = public_base_url.map(|url| url.trim_end_matches('/').to_string());

        tracing::info!(
            path = %base_path.display(),
            public_base_url = public_base_url.as_deref().unwrap_or("file://"),
            "Created filesystem object storage"
        );
        Ok(Self {
            base_path,
            public_base_url,
        })
    }

    /// Filesystem path of a key.
    pub fn path_for(&self, key: &str) -> TemarioResult<PathBuf> {
        validate_key(key)?;
        Ok(self.base_path.join(key))
    }

    /// Public URL of a key.
    pub fn url_for(&self, key: &str) -> TemarioResult<String> {
        let path = self.path_for(key)?;
        Ok(match &self.public_base_url {
            Some(base) => format!("{}/{}", base, key),
            None => format!("file://{}", path.display()),
        })
    }
}

#[async_trait::async_trait]
impl ObjectStorage for FileSystemObjectStorage {
    #[tracing::instrument(skip(self, data), fields(size = data.len()))]
    async fn upload(
        &self,
        key: &str,
        data: &[u8],
        content_type: &str,
    ) -> TemarioResult<StoredObject> {
        let path = self.path_for(key)?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                StorageError::new(StorageErrorKind::DirectoryCreation(format!(
                    "{}: {}",
                    parent.display(),
                    e
                )))
            })?;
        }

        let temp_path = path.with_extension(format!("{}.tmp", Uuid::new_v4()));
        tokio::fs::write(&temp_path, data).await.map_err(|e| {
            StorageError::new(StorageErrorKind::FileWrite(format!(
                "{}: {}",
                temp_path.display(),
                e
            )))
        })?;

        if let Err(e) = tokio::fs::rename(&temp_path, &path).await {
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(StorageError::new(StorageErrorKind::FileWrite(format!(
                "rename {} to {}: {}",
                temp_path.display(),
                path.display(),
                e
            )))
            .into());
        }

        let hash = content_hash(data);
        tracing::info!(
            key,
            hash = %hash,
            path = %path.display(),
            size = data.len(),
            "Stored object"
        );

        Ok(StoredObject {
            key: key.to_string(),
            url: self.url_for(key)?,
            size_bytes: data.len(),
            content_hash: hash,
        })
    }

    #[tracing::instrument(skip(self))]
    async fn delete(&self, key: &str) -> TemarioResult<()> {
        let path = self.path_for(key)?;

        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                tracing::info!(key, path = %path.display(), "Deleted object");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(key, "Object already absent");
                Ok(())
            }
            Err(e) => Err(StorageError::new(StorageErrorKind::FileWrite(format!(
                "delete {}: {}",
                path.display(),
                e
            )))
            .into()),
        }
    }

    #[tracing::instrument(skip(self))]
    async fn exists(&self, key: &str) -> TemarioResult<bool> {
        let path = self.path_for(key)?;
        tokio::fs::try_exists(&path).await.map_err(|e| {
            StorageError::new(StorageErrorKind::FileRead(format!(
                "{}: {}",
                path.display(),
                e
            )))
            .into()
        })
    }

    fn backend_name(&self) -> &'static str {
        "filesystem"
    }
}
