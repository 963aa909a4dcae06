//! In-memory document store.

use serde_json::Value as JsonValue;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use temario_error::TemarioResult;
use temario_interface::{DocumentStore, StoredDocument, WriteMode, merge_documents};
use tokio::sync::RwLock;

type Collections = HashMap<String, BTreeMap<String, JsonValue>>;

/// Document store held in memory.
///
/// Clones share the same documents. Counts writes and deletes so callers can
/// assert that a pass over healthy data touched nothing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDocumentStore {
    collections: Arc<RwLock<Collections>>,
    mutations: Arc<AtomicUsize>,
}

impl InMemoryDocumentStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `set` and `delete` calls served so far.
    pub fn mutation_count(&self) -> usize {
        self.mutations.load(Ordering::SeqCst)
    }

    /// Number of documents in a collection.
    pub async fn count(&self, collection: &str) -> usize {
        self.collections
            .read()
            .await
            .get(collection)
            .map_or(0, BTreeMap::len)
    }
}

#[async_trait::async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn get(&self, collection: &str, id: &str) -> TemarioResult<Option<JsonValue>> {
        Ok(self
            .collections
            .read()
            .await
            .get(collection)
            .and_then(|docs| docs.get(id))
            .cloned())
    }

    async fn list(&self, collection: &str) -> TemarioResult<Vec<StoredDocument>> {
        Ok(self
            .collections
            .read()
            .await
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .map(|(id, data)| StoredDocument {
                        id: id.clone(),
                        data: data.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn set(
        &self,
        collection: &str,
        id: &str,
        document: JsonValue,
        mode: WriteMode,
    ) -> TemarioResult<()> {
        self.mutations.fetch_add(1, Ordering::SeqCst);
        let mut collections = self.collections.write().await;
        let docs = collections.entry(collection.to_string()).or_default();
        match (mode, docs.get_mut(id)) {
            (WriteMode::Merge, Some(existing)) => merge_documents(existing, document),
            _ => {
                docs.insert(id.to_string(), document);
            }
        }
        tracing::trace!(collection, id, %mode, "Stored document in memory");
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> TemarioResult<()> {
        self.mutations.fetch_add(1, Ordering::SeqCst);
        let mut collections = self.collections.write().await;
        if let Some(docs) = collections.get_mut(collection) {
            docs.remove(id);
            if docs.is_empty() {
                collections.remove(collection);
            }
        }
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
