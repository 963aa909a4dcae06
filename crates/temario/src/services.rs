//! Wiring of configuration, backends and pipeline stages.

use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use temario_core::{
    Flashcard, GeneratedBody, Question, TopicRecord, TopicStatus, pdf_object_key,
};
use temario_database::{
    FileSystemDocumentStore, GenerationLease, PersistenceGateway, PurgeReport,
};
use temario_error::{ConfigError, TemarioResult};
use temario_interface::{ContentGenerator, DocumentStore, ObjectStorage, PdfRenderer, UrlProbe};
use temario_models::{ChatCompletionGenerator, HttpPdfRenderer};
use temario_pipeline::{BatchOrchestrator, PdfPipeline, RepairSweeper, TopicPipeline};
use temario_policy::{Assistant, TemarioConfig};
use temario_storage::{FileSystemObjectStorage, HttpUrlProbe};
use tracing::{info, instrument, warn};

/// Everything a command needs, built once from configuration.
#[derive(Clone)]
pub struct Services {
    config: TemarioConfig,
    documents: Arc<dyn DocumentStore>,
    objects: Arc<dyn ObjectStorage>,
    probe: Arc<dyn UrlProbe>,
    gateway: PersistenceGateway,
    topics: TopicPipeline,
    generator_error: Option<String>,
}

impl std::fmt::Debug for Services {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Services")
            .field("documents", &self.documents.backend_name())
            .field("objects", &self.objects.backend_name())
            .field("topics", &self.topics)
            .finish_non_exhaustive()
    }
}

/// One row of `temario status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopicStatusRow {
    /// Display position
    pub order: u32,
    /// Topic slug
    pub slug: String,
    /// Topic title
    pub title: String,
    /// Lifecycle state
    pub status: TopicStatus,
    /// Current version
    pub version: u32,
    /// Words in the body
    pub word_count: usize,
    /// PDF state: "ok", "content-only", "failed" or "missing"
    pub pdf: &'static str,
    /// Last stage or PDF error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<&TopicRecord> for TopicStatusRow {
    fn from(record: &TopicRecord) -> Self {
        let pdf = if record.is_content_only() {
            "content-only"
        } else if record.pdf_generation_failed {
            "failed"
        } else if record.pdf_url.is_some() {
            "ok"
        } else {
            "missing"
        };
        Self {
            order: record.order,
            slug: record.slug.clone(),
            title: record.title.clone(),
            status: record.status,
            version: record.version,
            word_count: record.word_count,
            pdf,
            error: record
                .last_error
                .clone()
                .or_else(|| record.last_pdf_error.clone()),
        }
    }
}

/// Removal report of `temario purge`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PurgeOutcome {
    /// Documents removed
    #[serde(flatten)]
    pub documents: PurgeReport,
    /// PDF object keys removed
    pub pdf_objects: Vec<String>,
}

impl Services {
    /// Production wiring: filesystem stores, HTTP probe, chat-completion
    /// generator and HTTP renderer.
    #[instrument(skip_all)]
    pub fn from_config(config: TemarioConfig) -> TemarioResult<Self> {
        config.validate()?;
        let documents: Arc<dyn DocumentStore> =
            Arc::new(FileSystemDocumentStore::new(&config.storage.documents_path)?);
        let objects: Arc<dyn ObjectStorage> = Arc::new(FileSystemObjectStorage::new(
            &config.storage.objects_path,
            config.storage.public_base_url.clone(),
        )?);
        let (generator, generator_error): (Arc<dyn ContentGenerator>, Option<String>) =
            match ChatCompletionGenerator::from_config(&config.generator) {
                Ok(generator) => (Arc::new(generator), None),
                Err(err) => {
                    warn!(error = %err, "Content generator unavailable");
                    let reason = err.to_string();
                    (Arc::new(UnavailableGenerator(reason.clone())), Some(reason))
                }
            };
        let renderer: Arc<dyn PdfRenderer> =
            Arc::new(HttpPdfRenderer::new(config.renderer.base_url.clone()));

        info!(
            documents = %config.storage.documents_path.display(),
            objects = %config.storage.objects_path.display(),
            model = %config.generator.model,
            "Services configured"
        );
        let mut services = Self::assemble(
            config,
            documents,
            objects,
            Arc::new(HttpUrlProbe::new()),
            generator,
            renderer,
        );
        services.generator_error = generator_error;
        Ok(services)
    }

    /// Wire arbitrary collaborators under `config`.
    pub fn assemble(
        config: TemarioConfig,
        documents: Arc<dyn DocumentStore>,
        objects: Arc<dyn ObjectStorage>,
        probe: Arc<dyn UrlProbe>,
        generator: Arc<dyn ContentGenerator>,
        renderer: Arc<dyn PdfRenderer>,
    ) -> Self {
        let gateway = PersistenceGateway::new(documents.clone());
        let pdf = PdfPipeline::new(
            renderer,
            objects.clone(),
            gateway.clone(),
            config.pdf.clone(),
            config.retry.clone(),
        );
        let topics = TopicPipeline::new(generator, gateway.clone(), pdf);
        Self {
            config,
            documents,
            objects,
            probe,
            gateway,
            topics,
            generator_error: None,
        }
    }

    /// Fail unless a content generator is configured.
    pub fn require_generator(&self) -> TemarioResult<()> {
        match &self.generator_error {
            Some(reason) => Err(ConfigError::new(reason.clone()).into()),
            None => Ok(()),
        }
    }

    /// Loaded configuration.
    pub fn config(&self) -> &TemarioConfig {
        &self.config
    }

    /// Resolve an assistant id against the configuration.
    pub fn assistant(&self, id: &str) -> TemarioResult<Assistant> {
        self.config.assistant(id)
    }

    /// Typed document access.
    pub fn gateway(&self) -> &PersistenceGateway {
        &self.gateway
    }

    fn lease(&self) -> Option<GenerationLease> {
        self.config
            .lease
            .enabled
            .then(|| GenerationLease::new(self.documents.clone(), self.config.lease.ttl()))
    }

    /// Batch orchestrator, holding the generation lease when enabled.
    pub fn orchestrator(&self) -> BatchOrchestrator {
        let orchestrator = BatchOrchestrator::new(self.topics.clone(), self.config.run.clone());
        match self.lease() {
            Some(lease) => orchestrator.with_lease(lease),
            None => orchestrator,
        }
    }

    /// Repair sweeper, holding the generation lease when enabled.
    pub fn sweeper(&self) -> RepairSweeper {
        let sweeper = RepairSweeper::new(
            self.topics.clone(),
            self.probe.clone(),
            &self.config.probe,
            &self.config.sweep,
        );
        match self.lease() {
            Some(lease) => sweeper.with_lease(lease),
            None => sweeper,
        }
    }

    /// Status rows of every stored topic, in syllabus order.
    pub async fn status(&self, assistant_id: &str) -> TemarioResult<Vec<TopicStatusRow>> {
        let records = self.gateway.list_topics(assistant_id).await?;
        Ok(records.iter().map(TopicStatusRow::from).collect())
    }

    /// Delete a topic, its tests, its flashcards and every PDF version.
    #[instrument(skip(self))]
    pub async fn purge(&self, assistant_id: &str, slug: &str) -> TemarioResult<PurgeOutcome> {
        let record = self.gateway.load_topic(assistant_id, slug).await?;
        let documents = self.gateway.purge_topic(assistant_id, slug).await?;

        let mut pdf_objects = Vec::new();
        if let Some(record) = record {
            for version in 1..=record.version {
                let key = pdf_object_key(assistant_id, slug, version);
                match self.objects.exists(&key).await {
                    Ok(true) => {
                        self.objects.delete(&key).await?;
                        pdf_objects.push(key);
                    }
                    Ok(false) => {}
                    Err(err) => warn!(key = %key, error = %err, "Could not check PDF object"),
                }
            }
        }

        info!(
            tests = documents.tests_deleted,
            flashcards = documents.flashcards_deleted,
            pdfs = pdf_objects.len(),
            "Topic purged"
        );
        Ok(PurgeOutcome {
            documents,
            pdf_objects,
        })
    }
}

/// Stand-in when no API key is configured.
///
/// Commands that only read, purge or re-render still work; anything that
/// needs new text fails the topic with the configuration error.
struct UnavailableGenerator(String);

impl UnavailableGenerator {
    fn error<T>(&self) -> TemarioResult<T> {
        Err(ConfigError::new(format!("Content generator unavailable: {}", self.0)).into())
    }
}

#[async_trait]
impl ContentGenerator for UnavailableGenerator {
    async fn generate_body(
        &self,
        _assistant_name: &str,
        _topic_title: &str,
        _min_words: usize,
    ) -> TemarioResult<GeneratedBody> {
        self.error()
    }

    async fn derive_tests(
        &self,
        _topic_title: &str,
        _text: &str,
        _requested: usize,
    ) -> TemarioResult<Vec<Question>> {
        self.error()
    }

    async fn derive_flashcards(
        &self,
        _topic_title: &str,
        _text: &str,
        _requested: usize,
    ) -> TemarioResult<Vec<Flashcard>> {
        self.error()
    }

    fn provider_name(&self) -> &'static str {
        "unavailable"
    }
}
