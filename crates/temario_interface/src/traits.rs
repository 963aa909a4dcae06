//! Trait definitions for the external collaborators of the pipeline.

use crate::{ProbeOutcome, RenderRequest, StoredDocument, StoredObject, WriteMode};
use async_trait::async_trait;
use serde_json::Value as JsonValue;
use std::time::Duration;
use temario_core::{Flashcard, GeneratedBody, Question};
use temario_error::TemarioResult;

/// Large-language-model capability that writes syllabus content.
///
/// Implementations are pure with respect to the pipeline: they never touch
/// the stores. Any error is a generation failure for the topic at hand.
#[async_trait]
pub trait ContentGenerator: Send + Sync {
    /// Write the long-form body of a topic.
    async fn generate_body(
        &self,
        assistant_name: &str,
        topic_title: &str,
        min_words: usize,
    ) -> TemarioResult<GeneratedBody>;

    /// Derive quiz questions from a validated body.
    ///
    /// `requested` is a hint; the caller enforces the exact count.
    async fn derive_tests(
        &self,
        topic_title: &str,
        text: &str,
        requested: usize,
    ) -> TemarioResult<Vec<Question>>;

    /// Derive flashcards from a validated body.
    async fn derive_flashcards(
        &self,
        topic_title: &str,
        text: &str,
        requested: usize,
    ) -> TemarioResult<Vec<Flashcard>>;

    /// Provider name for logs (e.g. "openai-compatible").
    fn provider_name(&self) -> &'static str;
}

/// Hierarchical document database.
///
/// Collections are slash-separated paths (`assistants/a/syllabus`); documents
/// are JSON objects addressed by id inside a collection. Writes are
/// last-writer-wins per document and there is no cross-document transaction.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetch one document.
    async fn get(&self, collection: &str, id: &str) -> TemarioResult<Option<JsonValue>>;

    /// List the documents directly inside a collection, ordered by id.
    async fn list(&self, collection: &str) -> TemarioResult<Vec<StoredDocument>>;

    /// Create or replace a document, or merge top-level fields into it.
    async fn set(
        &self,
        collection: &str,
        id: &str,
        document: JsonValue,
        mode: WriteMode,
    ) -> TemarioResult<()>;

    /// Delete a document. Deleting a missing document is not an error.
    async fn delete(&self, collection: &str, id: &str) -> TemarioResult<()>;

    /// Backend name for logs.
    fn backend_name(&self) -> &'static str;
}

/// Binary object storage with public download URLs.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Store bytes under `key`, replacing any previous object.
    async fn upload(
        &self,
        key: &str,
        data: &[u8],
        content_type: &str,
    ) -> TemarioResult<StoredObject>;

    /// Remove an object. Removing a missing object is not an error.
    async fn delete(&self, key: &str) -> TemarioResult<()>;

    /// Check whether an object exists under `key`.
    async fn exists(&self, key: &str) -> TemarioResult<bool>;

    /// Backend name for logs.
    fn backend_name(&self) -> &'static str;
}

/// HTTP endpoint that turns markdown into a PDF.
#[async_trait]
pub trait PdfRenderer: Send + Sync {
    /// Render a document. Returns the decoded PDF bytes.
    async fn render(&self, assistant_id: &str, request: &RenderRequest) -> TemarioResult<Vec<u8>>;
}

/// Reachability check for a stored PDF URL.
#[async_trait]
pub trait UrlProbe: Send + Sync {
    /// Probe `url` within `timeout`. Timeouts and non-2xx are unreachable.
    async fn probe(&self, url: &str, timeout: Duration) -> ProbeOutcome;
}
