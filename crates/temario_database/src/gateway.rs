//! The pipeline's single entry point to the document store.

use chrono::Utc;
use futures::future::join_all;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use std::collections::HashSet;
use std::sync::Arc;
use temario_core::{
    Flashcard, Question, TopicPatch, TopicRecord, TopicStatus, dedup_flashcards, flashcard_id,
    flashcards_collection, question_id, syllabus_collection, tests_collection,
};
use temario_error::{PersistenceError, PersistenceErrorKind, TemarioResult};
use temario_interface::{DocumentStore, WriteMode};
use tracing::{debug, info, instrument, warn};

/// Documents removed by [`PersistenceGateway::purge_topic`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PurgeReport {
    /// Question documents deleted
    pub tests_deleted: usize,
    /// Flashcard documents deleted
    pub flashcards_deleted: usize,
    /// Whether a topic record existed
    pub topic_deleted: bool,
}

/// Typed access to topics, test sets and flashcard sets.
///
/// Count invariants are enforced here: a test set is written with exactly the
/// expected number of questions or not at all, and a flashcard set is
/// de-duplicated before its size is checked.
#[derive(Clone)]
pub struct PersistenceGateway {
    store: Arc<dyn DocumentStore>,
}

impl std::fmt::Debug for PersistenceGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistenceGateway")
            .field("backend", &self.store.backend_name())
            .finish()
    }
}

impl PersistenceGateway {
    /// Wrap a document store.
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Name of the underlying backend.
    pub fn backend_name(&self) -> &'static str {
        self.store.backend_name()
    }

    /// Create or overwrite a topic record, stamping `updated_at`.
    #[instrument(skip(self, record), fields(slug = %record.slug, status = %record.status))]
    pub async fn save_topic(&self, assistant_id: &str, record: &TopicRecord) -> TemarioResult<()> {
        require_slug(&record.slug)?;
        let collection = syllabus_collection(assistant_id);
        let mut record = record.clone();
        record.updated_at = Some(Utc::now());
        let document = to_document(&collection, &record.slug, &record)?;
        self.store
            .set(&collection, &record.slug, document, WriteMode::Overwrite)
            .await?;
        debug!(version = record.version, "Saved topic");
        Ok(())
    }

    /// Write exactly `expected` questions for a topic.
    ///
    /// Fewer than `expected` supplied is an error and nothing is written.
    /// Extra questions are ignored, and documents left over from a larger
    /// earlier set are deleted.
    #[instrument(skip(self, questions), fields(supplied = questions.len()))]
    pub async fn save_tests(
        &self,
        assistant_id: &str,
        slug: &str,
        questions: &[Question],
        expected: usize,
    ) -> TemarioResult<usize> {
        require_slug(slug)?;
        let collection = tests_collection(assistant_id, slug);
        if questions.len() < expected {
            return Err(PersistenceError::new(PersistenceErrorKind::CountMismatch {
                collection,
                expected,
                actual: questions.len(),
            })
            .into());
        }

        let kept = &questions[..expected];
        self.write_numbered(&collection, kept, question_id).await?;
        info!(count = kept.len(), "Saved test set");
        Ok(kept.len())
    }

    /// De-duplicate and write exactly `minimum` flashcards for a topic.
    ///
    /// Fewer than `minimum` unique cards is an error and nothing is written.
    #[instrument(skip(self, cards), fields(supplied = cards.len()))]
    pub async fn save_flashcards(
        &self,
        assistant_id: &str,
        slug: &str,
        cards: Vec<Flashcard>,
        minimum: usize,
    ) -> TemarioResult<usize> {
        require_slug(slug)?;
        let collection = flashcards_collection(assistant_id, slug);
        let mut unique = dedup_flashcards(cards);
        if unique.len() < minimum {
            return Err(PersistenceError::new(PersistenceErrorKind::CountMismatch {
                collection,
                expected: minimum,
                actual: unique.len(),
            })
            .into());
        }

        unique.truncate(minimum);
        self.write_numbered(&collection, &unique, flashcard_id)
            .await?;
        info!(count = unique.len(), "Saved flashcards");
        Ok(unique.len())
    }

    /// Merge a partial update into an existing topic record.
    #[instrument(skip(self, patch))]
    pub async fn update_topic_metadata(
        &self,
        assistant_id: &str,
        slug: &str,
        patch: &TopicPatch,
    ) -> TemarioResult<()> {
        let collection = syllabus_collection(assistant_id);
        if self.store.get(&collection, slug).await?.is_none() {
            return Err(PersistenceError::new(PersistenceErrorKind::NotFound(format!(
                "{}/{}",
                collection, slug
            )))
            .into());
        }

        let mut patch = patch.clone();
        patch.updated_at = Some(Utc::now());
        let document = to_document(&collection, slug, &patch)?;
        self.store
            .set(&collection, slug, document, WriteMode::Merge)
            .await
    }

    /// Mark a topic as in flight, creating a bare record if none exists yet.
    ///
    /// Returns the record as it was before the mark.
    #[instrument(skip(self))]
    pub async fn mark_generating(
        &self,
        assistant_id: &str,
        slug: &str,
        title: &str,
        order: u32,
    ) -> TemarioResult<Option<TopicRecord>> {
        let previous = self.load_topic(assistant_id, slug).await?;
        if previous.is_some() {
            self.update_topic_metadata(assistant_id, slug, &TopicPatch::generating())
                .await?;
        } else {
            let record = TopicRecord {
                slug: slug.to_string(),
                title: title.to_string(),
                order,
                status: TopicStatus::Generating,
                ..Default::default()
            };
            self.save_topic(assistant_id, &record).await?;
        }
        Ok(previous)
    }

    /// Mark a topic as failed, creating a bare record if none exists yet.
    ///
    /// Version, PDF fields and whatever content is stored are kept. Text
    /// saved by the failing attempt itself is not rolled back.
    #[instrument(skip(self, message))]
    pub async fn record_failure(
        &self,
        assistant_id: &str,
        slug: &str,
        title: &str,
        order: u32,
        message: &str,
    ) -> TemarioResult<()> {
        if self.load_topic(assistant_id, slug).await?.is_some() {
            return self
                .update_topic_metadata(assistant_id, slug, &TopicPatch::failed(message))
                .await;
        }
        let record = TopicRecord {
            slug: slug.to_string(),
            title: title.to_string(),
            order,
            status: TopicStatus::Error,
            last_error: Some(message.to_string()),
            ..Default::default()
        };
        self.save_topic(assistant_id, &record).await
    }

    /// Read one topic record.
    #[instrument(skip(self))]
    pub async fn load_topic(
        &self,
        assistant_id: &str,
        slug: &str,
    ) -> TemarioResult<Option<TopicRecord>> {
        let collection = syllabus_collection(assistant_id);
        match self.store.get(&collection, slug).await? {
            Some(data) => Ok(Some(from_document(&collection, slug, data)?)),
            None => Ok(None),
        }
    }

    /// Every topic of an assistant, ordered by `order` then slug.
    #[instrument(skip(self))]
    pub async fn list_topics(&self, assistant_id: &str) -> TemarioResult<Vec<TopicRecord>> {
        let collection = syllabus_collection(assistant_id);
        let mut topics = self
            .store
            .list(&collection)
            .await?
            .into_iter()
            .map(|doc| from_document::<TopicRecord>(&collection, &doc.id, doc.data))
            .collect::<TemarioResult<Vec<_>>>()?;
        topics.sort_by(|a, b| a.order.cmp(&b.order).then_with(|| a.slug.cmp(&b.slug)));
        debug!(count = topics.len(), "Listed topics");
        Ok(topics)
    }

    /// Stored questions of a topic, in id order.
    pub async fn load_tests(&self, assistant_id: &str, slug: &str) -> TemarioResult<Vec<Question>> {
        self.load_children(&tests_collection(assistant_id, slug))
            .await
    }

    /// Stored flashcards of a topic, in id order.
    pub async fn load_flashcards(
        &self,
        assistant_id: &str,
        slug: &str,
    ) -> TemarioResult<Vec<Flashcard>> {
        self.load_children(&flashcards_collection(assistant_id, slug))
            .await
    }

    /// Delete a topic and all of its questions and flashcards.
    ///
    /// Children are deleted concurrently, then the topic record.
    #[instrument(skip(self))]
    pub async fn purge_topic(&self, assistant_id: &str, slug: &str) -> TemarioResult<PurgeReport> {
        require_slug(slug)?;
        let tests = tests_collection(assistant_id, slug);
        let flashcards = flashcards_collection(assistant_id, slug);

        let test_ids = self.child_ids(&tests).await?;
        let flashcard_ids = self.child_ids(&flashcards).await?;

        let deletes = test_ids
            .iter()
            .map(|id| self.store.delete(&tests, id))
            .chain(flashcard_ids.iter().map(|id| self.store.delete(&flashcards, id)));
        for result in join_all(deletes).await {
            result?;
        }

        let collection = syllabus_collection(assistant_id);
        let topic_deleted = self.store.get(&collection, slug).await?.is_some();
        self.store.delete(&collection, slug).await?;

        let report = PurgeReport {
            tests_deleted: test_ids.len(),
            flashcards_deleted: flashcard_ids.len(),
            topic_deleted,
        };
        info!(
            tests = report.tests_deleted,
            flashcards = report.flashcards_deleted,
            topic = report.topic_deleted,
            "Purged topic"
        );
        Ok(report)
    }

    async fn write_numbered<T: Serialize>(
        &self,
        collection: &str,
        items: &[T],
        id_for: fn(usize) -> String,
    ) -> TemarioResult<()> {
        let mut written = HashSet::with_capacity(items.len());
        for (index, item) in items.iter().enumerate() {
            let id = id_for(index);
            let document = to_document(collection, &id, item)?;
            self.store
                .set(collection, &id, document, WriteMode::Overwrite)
                .await?;
            written.insert(id);
        }

        let stale: Vec<String> = self
            .child_ids(collection)
            .await?
            .into_iter()
            .filter(|id| !written.contains(id))
            .collect();
        if !stale.is_empty() {
            warn!(collection, count = stale.len(), "Removing stale documents");
            for result in join_all(stale.iter().map(|id| self.store.delete(collection, id))).await
            {
                result?;
            }
        }
        Ok(())
    }

    async fn child_ids(&self, collection: &str) -> TemarioResult<Vec<String>> {
        Ok(self
            .store
            .list(collection)
            .await?
            .into_iter()
            .map(|doc| doc.id)
            .collect())
    }

    async fn load_children<T: DeserializeOwned>(&self, collection: &str) -> TemarioResult<Vec<T>> {
        self.store
            .list(collection)
            .await?
            .into_iter()
            .map(|doc| from_document(collection, &doc.id, doc.data))
            .collect()
    }
}

fn require_slug(slug: &str) -> TemarioResult<()> {
    if slug.is_empty() {
        return Err(PersistenceError::new(PersistenceErrorKind::Write(
            "topic slug is empty".to_string(),
        ))
        .into());
    }
    Ok(())
}

fn to_document<T: Serialize>(collection: &str, id: &str, value: &T) -> TemarioResult<JsonValue> {
    serde_json::to_value(value).map_err(|e| {
        PersistenceError::new(PersistenceErrorKind::Serialization {
            path: format!("{}/{}", collection, id),
            message: e.to_string(),
        })
        .into()
    })
}

fn from_document<T: DeserializeOwned>(
    collection: &str,
    id: &str,
    data: JsonValue,
) -> TemarioResult<T> {
    serde_json::from_value(data).map_err(|e| {
        PersistenceError::new(PersistenceErrorKind::Serialization {
            path: format!("{}/{}", collection, id),
            message: e.to_string(),
        })
        .into()
    })
}
