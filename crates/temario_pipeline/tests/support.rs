//! Scripted collaborators shared by the pipeline tests.

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use temario_core::{ContentProfile, Difficulty, Flashcard, GeneratedBody, Question};
use temario_database::{InMemoryDocumentStore, PersistenceGateway};
use temario_error::{
    GenerationError, GenerationErrorKind, RenderError, RenderErrorKind, StorageError,
    StorageErrorKind, TemarioResult,
};
use temario_interface::{ContentGenerator, ObjectStorage, PdfRenderer, RenderRequest, StoredObject};
use temario_pipeline::{PdfPipeline, TopicPipeline};
use temario_policy::{Assistant, PdfPolicy, RetryPolicy, RetrySection};
use temario_storage::InMemoryObjectStorage;
use tokio::sync::Notify;

pub const MIN_WORDS: usize = 60;
pub const TESTS_PER_TOPIC: usize = 3;
pub const MIN_FLASHCARDS: usize = 4;
pub const RENDER_THRESHOLD: usize = 1_000;

pub fn assistant() -> Assistant {
    Assistant {
        id: "auxiliar".to_string(),
        name: "Auxiliar Administrativo".to_string(),
        profile: ContentProfile::builder()
            .name("test")
            .min_words(MIN_WORDS)
            .tests_per_topic(TESTS_PER_TOPIC)
            .min_flashcards(MIN_FLASHCARDS)
            .build()
            .unwrap(),
    }
}

/// Markdown body carrying every marker and roughly `words` words.
pub fn valid_body(title: &str, words: usize) -> String {
    let filler = vec!["normativa"; words].join(" ");
    format!(
        "# {title}\n\n## Objetivos\n\nConocer el tema.\n\n## 1. Marco general\n\n{filler}\n\n\
         ## Ejemplos\n\nUn ejemplo **resuelto**.\n\n## Datos clave\n\n- Artículo 1\n\n\
         ## Resumen\n\nIdeas finales.\n\n## Caso práctico\n\nSupuesto breve.\n\n\
         ## Esquema\n\n```mermaid\ngraph TD; A-->B\n```\n"
    )
}

pub fn questions(count: usize) -> Vec<Question> {
    (1..=count)
        .map(|i| Question {
            stem: format!("Pregunta {i}"),
            options: vec!["A".into(), "B".into(), "C".into(), "D".into()],
            correct_index: i % 4,
            rationale: "Por definición".to_string(),
            difficulty: Difficulty::Medium,
        })
        .collect()
}

/// `unique` distinct cards followed by `duplicates` re-cased copies of the first.
pub fn flashcards(unique: usize, duplicates: usize) -> Vec<Flashcard> {
    let mut cards: Vec<Flashcard> = (1..=unique)
        .map(|i| Flashcard {
            front: format!("Concepto {i}"),
            back: format!("Definición {i}"),
            tags: vec![],
        })
        .collect();
    for _ in 0..duplicates {
        cards.push(Flashcard {
            front: "CONCEPTO 1".to_string(),
            back: "  definición 1 ".to_string(),
            tags: vec![],
        });
    }
    cards
}

/// Generator with per-title failures and call counters.
pub struct ScriptedGenerator {
    pub failing_titles: Vec<String>,
    pub words: usize,
    pub questions: usize,
    pub malformed_questions: usize,
    pub unique_cards: usize,
    pub duplicate_cards: usize,
    /// First body call signals `entered` and waits for `release`
    pub hold_first: Option<(Arc<Notify>, Arc<Notify>)>,
    pub body_calls: AtomicUsize,
    pub test_calls: AtomicUsize,
    pub card_calls: AtomicUsize,
}

impl Default for ScriptedGenerator {
    fn default() -> Self {
        Self {
            failing_titles: vec![],
            words: MIN_WORDS * 2,
            questions: TESTS_PER_TOPIC + 2,
            malformed_questions: 0,
            unique_cards: MIN_FLASHCARDS + 1,
            duplicate_cards: 2,
            hold_first: None,
            body_calls: AtomicUsize::new(0),
            test_calls: AtomicUsize::new(0),
            card_calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl ContentGenerator for ScriptedGenerator {
    async fn generate_body(
        &self,
        _assistant_name: &str,
        topic_title: &str,
        _min_words: usize,
    ) -> TemarioResult<GeneratedBody> {
        let call = self.body_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if call == 1
            && let Some((entered, release)) = &self.hold_first
        {
            entered.notify_one();
            release.notified().await;
        }
        if self.failing_titles.iter().any(|t| t == topic_title) {
            return Err(GenerationError::new(GenerationErrorKind::Status {
                status_code: 500,
                message: "model overloaded".to_string(),
            })
            .into());
        }
        Ok(GeneratedBody::from_text(valid_body(topic_title, self.words)))
    }

    async fn derive_tests(
        &self,
        _topic_title: &str,
        _text: &str,
        _requested: usize,
    ) -> TemarioResult<Vec<Question>> {
        self.test_calls.fetch_add(1, Ordering::SeqCst);
        let mut set = questions(self.questions);
        for question in set.iter_mut().take(self.malformed_questions) {
            question.options.pop();
        }
        Ok(set)
    }

    async fn derive_flashcards(
        &self,
        _topic_title: &str,
        _text: &str,
        _requested: usize,
    ) -> TemarioResult<Vec<Flashcard>> {
        self.card_calls.fetch_add(1, Ordering::SeqCst);
        Ok(flashcards(self.unique_cards, self.duplicate_cards))
    }

    fn provider_name(&self) -> &'static str {
        "scripted"
    }
}

/// One scripted render answer.
#[derive(Debug, Clone, Copy)]
pub enum RenderStep {
    Bytes(usize),
    Fail,
}

/// Renderer that replays a script, then repeats `fallback`.
pub struct ScriptedRenderer {
    script: Mutex<VecDeque<RenderStep>>,
    fallback: RenderStep,
    pub requests: Mutex<Vec<RenderRequest>>,
}

impl ScriptedRenderer {
    pub fn always(step: RenderStep) -> Self {
        Self::script(vec![], step)
    }

    pub fn script(steps: Vec<RenderStep>, fallback: RenderStep) -> Self {
        Self {
            script: Mutex::new(steps.into()),
            fallback,
            requests: Mutex::new(vec![]),
        }
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl PdfRenderer for ScriptedRenderer {
    async fn render(&self, _assistant_id: &str, request: &RenderRequest) -> TemarioResult<Vec<u8>> {
        self.requests.lock().unwrap().push(request.clone());
        let step = self.script.lock().unwrap().pop_front().unwrap_or(self.fallback);
        match step {
            RenderStep::Bytes(size) => Ok(vec![b'%'; size]),
            RenderStep::Fail => Err(RenderError::new(RenderErrorKind::Status {
                status_code: 503,
                message: "renderer down".to_string(),
            })
            .into()),
        }
    }
}

/// Object storage whose uploads fail a set number of times.
pub struct FlakyStorage {
    pub inner: InMemoryObjectStorage,
    failures_left: AtomicUsize,
    pub attempts: AtomicUsize,
}

impl FlakyStorage {
    pub fn failing(times: usize) -> Self {
        Self {
            inner: InMemoryObjectStorage::new(),
            failures_left: AtomicUsize::new(times),
            attempts: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl ObjectStorage for FlakyStorage {
    async fn upload(&self, key: &str, data: &[u8], content_type: &str) -> TemarioResult<StoredObject> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let left = self.failures_left.load(Ordering::SeqCst);
        if left > 0 {
            self.failures_left.store(left - 1, Ordering::SeqCst);
            return Err(StorageError::new(StorageErrorKind::Unavailable("bucket offline".to_string())).into());
        }
        self.inner.upload(key, data, content_type).await
    }

    async fn delete(&self, key: &str) -> TemarioResult<()> {
        self.inner.delete(key).await
    }

    async fn exists(&self, key: &str) -> TemarioResult<bool> {
        self.inner.exists(key).await
    }

    fn backend_name(&self) -> &'static str {
        "flaky"
    }
}

/// Object storage whose first upload signals `entered` and waits for `release`.
pub struct HeldStorage {
    pub inner: InMemoryObjectStorage,
    held: AtomicUsize,
    entered: Arc<Notify>,
    release: Arc<Notify>,
}

impl HeldStorage {
    pub fn new(inner: InMemoryObjectStorage, entered: Arc<Notify>, release: Arc<Notify>) -> Self {
        Self {
            inner,
            held: AtomicUsize::new(0),
            entered,
            release,
        }
    }
}

#[async_trait]
impl ObjectStorage for HeldStorage {
    async fn upload(&self, key: &str, data: &[u8], content_type: &str) -> TemarioResult<StoredObject> {
        if self.held.fetch_add(1, Ordering::SeqCst) == 0 {
            self.entered.notify_one();
            self.release.notified().await;
        }
        self.inner.upload(key, data, content_type).await
    }

    async fn delete(&self, key: &str) -> TemarioResult<()> {
        self.inner.delete(key).await
    }

    async fn exists(&self, key: &str) -> TemarioResult<bool> {
        self.inner.exists(key).await
    }

    fn backend_name(&self) -> &'static str {
        "held"
    }
}

pub fn fast_retry() -> RetrySection {
    RetrySection {
        render: RetryPolicy {
            max_attempts: 2,
            base_delay_ms: 1,
            max_delay_ms: 1,
            ..RetryPolicy::render_default()
        },
        upload: RetryPolicy {
            max_attempts: 3,
            base_delay_ms: 1,
            max_delay_ms: 1,
            ..RetryPolicy::upload_default()
        },
    }
}

pub fn pdf_policy() -> PdfPolicy {
    PdfPolicy {
        render_threshold_bytes: RENDER_THRESHOLD,
        upload_limit_bytes: 50_000,
        reduced_char_cap: 2_000,
    }
}

/// Everything a pipeline test needs, wired to in-memory backends.
pub struct Harness {
    pub store: InMemoryDocumentStore,
    pub objects: InMemoryObjectStorage,
    pub gateway: PersistenceGateway,
    pub generator: Arc<ScriptedGenerator>,
    pub renderer: Arc<ScriptedRenderer>,
    pub topics: TopicPipeline,
}

impl Harness {
    pub fn new(generator: ScriptedGenerator, renderer: ScriptedRenderer) -> Self {
        let objects = InMemoryObjectStorage::new();
        Self::with_storage(generator, renderer, objects.clone(), Arc::new(objects))
    }

    pub fn with_storage(
        generator: ScriptedGenerator,
        renderer: ScriptedRenderer,
        objects: InMemoryObjectStorage,
        storage: Arc<dyn ObjectStorage>,
    ) -> Self {
        let store = InMemoryDocumentStore::new();
        let gateway = PersistenceGateway::new(Arc::new(store.clone()));
        let generator = Arc::new(generator);
        let renderer = Arc::new(renderer);
        let pdf = PdfPipeline::new(
            renderer.clone(),
            storage,
            gateway.clone(),
            pdf_policy(),
            fast_retry(),
        );
        let topics = TopicPipeline::new(generator.clone(), gateway.clone(), pdf);
        Self {
            store,
            objects,
            gateway,
            generator,
            renderer,
            topics,
        }
    }
}
