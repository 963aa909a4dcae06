//! In-memory object storage for tests and dry runs.

use crate::{content_hash, validate_key};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use temario_error::TemarioResult;
use temario_interface::{ObjectStorage, ProbeOutcome, StoredObject, UrlProbe};
use tokio::sync::RwLock;

const URL_SCHEME: &str = "memory://";

/// Object storage held in a map.
///
/// Also implements [`UrlProbe`]: a `memory://` URL is reachable while its
/// object is stored, which lets the repair sweeper run end to end without a
/// network.
#[derive(Debug, Clone, Default)]
pub struct InMemoryObjectStorage {
    objects: Arc<RwLock<HashMap<String, Vec<u8>>>>,
}

impl InMemoryObjectStorage {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes stored under `key`.
    pub async fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.objects.read().await.get(key).cloned()
    }

    /// Stored keys, sorted.
    pub async fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.objects.read().await.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// URL handed out for `key`.
    pub fn url_for(key: &str) -> String {
        format!("{}{}", URL_SCHEME, key)
    }
}

#[async_trait::async_trait]
impl ObjectStorage for InMemoryObjectStorage {
    async fn upload(
        &self,
        key: &str,
        data: &[u8],
        _content_type: &str,
    ) -> TemarioResult<StoredObject> {
        validate_key(key)?;
        self.objects
            .write()
            .await
            .insert(key.to_string(), data.to_vec());
        tracing::debug!(key, size = data.len(), "Stored object in memory");
        Ok(StoredObject {
            key: key.to_string(),
            url: Self::url_for(key),
            size_bytes: data.len(),
            content_hash: content_hash(data),
        })
    }

    async fn delete(&self, key: &str) -> TemarioResult<()> {
        validate_key(key)?;
        self.objects.write().await.remove(key);
        Ok(())
    }

    async fn exists(&self, key: &str) -> TemarioResult<bool> {
        validate_key(key)?;
        Ok(self.objects.read().await.contains_key(key))
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[async_trait::async_trait]
impl UrlProbe for InMemoryObjectStorage {
    async fn probe(&self, url: &str, _timeout: Duration) -> ProbeOutcome {
        match url.strip_prefix(URL_SCHEME) {
            Some(key) if self.objects.read().await.contains_key(key) => ProbeOutcome::Reachable,
            Some(key) => ProbeOutcome::Unreachable(format!("no object under {}", key)),
            None => ProbeOutcome::Unreachable(format!("not a {} URL", URL_SCHEME)),
        }
    }
}
