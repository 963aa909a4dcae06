//! The per-topic chain: generate, validate, persist, derive, render.

use crate::events::{StageHook, TopicStage};
use crate::pdf::{PdfOutcome, PdfPipeline};
use crate::validator::Validator;
use serde::Serialize;
use std::sync::Arc;
use temario_core::{TopicPatch, TopicRecord, TopicRequest, TopicStatus, slugify};
use temario_database::PersistenceGateway;
use temario_error::{TemarioResult, ValidationError, ValidationErrorKind};
use temario_interface::ContentGenerator;
use temario_policy::Assistant;
use tracing::{error, info, instrument};

/// How a topic ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum TopicResult {
    /// Text validated and persisted with its tests and flashcards
    Published {
        /// Version written
        version: u32,
        /// Words in the body
        word_count: usize,
        /// What happened to the PDF
        pdf: PdfOutcome,
    },
    /// A stage failed; the topic is marked `error`
    Failed {
        /// Stage that failed, if the chain got that far
        stage: Option<TopicStage>,
        /// Failure message
        error: String,
    },
}

/// Result of running the chain for one topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopicOutcome {
    /// Topic slug (empty when the title produced none)
    pub slug: String,
    /// Topic title
    pub title: String,
    /// Display position
    pub order: u32,
    /// Terminal state
    #[serde(flatten)]
    pub result: TopicResult,
}

impl TopicOutcome {
    /// The text was published.
    pub fn is_success(&self) -> bool {
        matches!(self.result, TopicResult::Published { .. })
    }

    /// Failure message, if the topic failed.
    pub fn error(&self) -> Option<&str> {
        match &self.result {
            TopicResult::Failed { error, .. } => Some(error),
            TopicResult::Published { .. } => None,
        }
    }

    /// One-line description for the operator log.
    pub fn summary(&self) -> String {
        match &self.result {
            TopicResult::Published {
                version,
                word_count,
                pdf,
            } => format!("v{}, {} words, {}", version, word_count, pdf.label()),
            TopicResult::Failed { stage: Some(stage), error } => format!("failed at {}: {}", stage, error),
            TopicResult::Failed { stage: None, error } => format!("failed: {}", error),
        }
    }
}

struct StageFailure {
    stage: TopicStage,
    message: String,
}

/// Runs the full chain for one topic of one assistant.
///
/// Stages run strictly in order and each one is announced to the
/// [`StageHook`] first. Any failure before the PDF stage marks the topic
/// `error` with the message and ends the chain; PDF problems never fail the
/// topic.
#[derive(Clone)]
pub struct TopicPipeline {
    generator: Arc<dyn ContentGenerator>,
    gateway: PersistenceGateway,
    pdf: PdfPipeline,
}

impl std::fmt::Debug for TopicPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TopicPipeline")
            .field("generator", &self.generator.provider_name())
            .field("pdf", &self.pdf)
            .finish_non_exhaustive()
    }
}

impl TopicPipeline {
    /// Assemble the chain.
    pub fn new(
        generator: Arc<dyn ContentGenerator>,
        gateway: PersistenceGateway,
        pdf: PdfPipeline,
    ) -> Self {
        Self {
            generator,
            gateway,
            pdf,
        }
    }

    /// The gateway every stage writes through.
    pub fn gateway(&self) -> &PersistenceGateway {
        &self.gateway
    }

    /// The PDF stage on its own.
    pub fn pdf(&self) -> &PdfPipeline {
        &self.pdf
    }

    /// Run the chain for a new topic, deriving its slug from the title.
    pub async fn run(
        &self,
        assistant: &Assistant,
        request: &TopicRequest,
        hook: &dyn StageHook,
    ) -> TopicOutcome {
        let slug = slugify(&request.title);
        if slug.is_empty() {
            let err = ValidationError::new(ValidationErrorKind::InvalidTitle(request.title.clone()));
            error!(title = %request.title, error = %err, "Topic skipped");
            return TopicOutcome {
                slug,
                title: request.title.clone(),
                order: request.order,
                result: TopicResult::Failed {
                    stage: None,
                    error: err.to_string(),
                },
            };
        }
        self.run_for_slug(assistant, &slug, request, hook).await
    }

    /// Run the chain for a topic stored under `slug`.
    #[instrument(skip(self, assistant, request, hook), fields(assistant = %assistant.id, title = %request.title))]
    pub async fn run_for_slug(
        &self,
        assistant: &Assistant,
        slug: &str,
        request: &TopicRequest,
        hook: &dyn StageHook,
    ) -> TopicOutcome {
        let result = match self.publish_text(assistant, slug, request, hook).await {
            Ok(record) => match self.pdf.produce(&assistant.id, &record, record.version, hook).await {
                Ok(pdf) => {
                    info!(version = record.version, pdf = pdf.label(), "Topic published");
                    TopicResult::Published {
                        version: record.version,
                        word_count: record.word_count,
                        pdf,
                    }
                }
                Err(err) => {
                    self.fail(assistant, slug, request, TopicStage::Uploading, err.to_string())
                        .await
                }
            },
            Err(failure) => {
                self.fail(assistant, slug, request, failure.stage, failure.message)
                    .await
            }
        };

        TopicOutcome {
            slug: slug.to_string(),
            title: request.title.clone(),
            order: request.order,
            result,
        }
    }

    async fn publish_text(
        &self,
        assistant: &Assistant,
        slug: &str,
        request: &TopicRequest,
        hook: &dyn StageHook,
    ) -> Result<TopicRecord, StageFailure> {
        let profile = &assistant.profile;
        let validator = Validator::new(profile);
        let title = request.title.as_str();

        hook.enter(slug, TopicStage::Generating).await;
        let previous = self
            .gateway
            .mark_generating(&assistant.id, slug, title, request.order)
            .await
            .map_err(at(TopicStage::Generating))?;
        let body = self
            .generator
            .generate_body(&assistant.name, title, *profile.min_words())
            .await
            .map_err(at(TopicStage::Generating))?;

        hook.enter(slug, TopicStage::Validating).await;
        validator
            .validate(&body.text, body.word_count)
            .map_err(at(TopicStage::Validating))?;

        hook.enter(slug, TopicStage::SavingTopic).await;
        let draft = self
            .save_draft(
                &assistant.id,
                slug,
                request,
                previous.as_ref(),
                body.text.clone(),
                body.word_count,
            )
            .await
            .map_err(at(TopicStage::SavingTopic))?;

        hook.enter(slug, TopicStage::DerivingTests).await;
        let questions = self
            .generator
            .derive_tests(title, &body.text, validator.tests_per_topic())
            .await
            .map_err(at(TopicStage::DerivingTests))?;
        let questions = validator
            .select_questions(questions)
            .map_err(at(TopicStage::DerivingTests))?;

        hook.enter(slug, TopicStage::SavingTests).await;
        self.gateway
            .save_tests(&assistant.id, slug, &questions, validator.tests_per_topic())
            .await
            .map_err(at(TopicStage::SavingTests))?;

        hook.enter(slug, TopicStage::DerivingFlashcards).await;
        let cards = self
            .generator
            .derive_flashcards(title, &body.text, *profile.min_flashcards())
            .await
            .map_err(at(TopicStage::DerivingFlashcards))?;

        hook.enter(slug, TopicStage::SavingFlashcards).await;
        self.gateway
            .save_flashcards(&assistant.id, slug, cards, *profile.min_flashcards())
            .await
            .map_err(at(TopicStage::SavingFlashcards))?;

        hook.enter(slug, TopicStage::Publishing).await;
        self.publish(&assistant.id, draft)
            .await
            .map_err(at(TopicStage::Publishing))
    }

    /// Write the validated text while the topic is still in flight.
    ///
    /// Version and PDF fields stay those of the previous record until
    /// [`Self::publish`] runs.
    async fn save_draft(
        &self,
        assistant_id: &str,
        slug: &str,
        request: &TopicRequest,
        previous: Option<&TopicRecord>,
        content: String,
        word_count: usize,
    ) -> TemarioResult<TopicRecord> {
        let record = TopicRecord {
            slug: slug.to_string(),
            title: request.title.clone(),
            order: request.order,
            status: TopicStatus::Generating,
            version: previous.map_or(0, |record| record.version),
            word_count,
            content: Some(content),
            pdf_url: previous.and_then(|record| record.pdf_url.clone()),
            pdf_generation_failed: previous.is_some_and(|record| record.pdf_generation_failed),
            pdf_too_large: previous.is_some_and(|record| record.pdf_too_large),
            last_pdf_error: previous.and_then(|record| record.last_pdf_error.clone()),
            last_error: None,
            updated_at: None,
        };
        self.gateway.save_topic(assistant_id, &record).await?;
        Ok(record)
    }

    /// Publish the draft as the next version.
    ///
    /// The previous PDF URL stays until a new PDF replaces it, and the PDF
    /// is flagged as pending so an interrupted run is picked up by repair.
    async fn publish(&self, assistant_id: &str, mut draft: TopicRecord) -> TemarioResult<TopicRecord> {
        let version = draft.version + 1;
        let patch = TopicPatch {
            status: Some(TopicStatus::Published),
            version: Some(version),
            pdf_generation_failed: Some(true),
            pdf_too_large: Some(false),
            last_pdf_error: Some(Some(format!("PDF pending for version {}", version))),
            last_error: Some(None),
            ..Default::default()
        };
        self.gateway
            .update_topic_metadata(assistant_id, &draft.slug, &patch)
            .await?;
        patch.apply_to(&mut draft);
        Ok(draft)
    }

    async fn fail(
        &self,
        assistant: &Assistant,
        slug: &str,
        request: &TopicRequest,
        stage: TopicStage,
        message: String,
    ) -> TopicResult {
        error!(slug, %stage, error = %message, "Topic failed");
        if let Err(err) = self
            .gateway
            .record_failure(&assistant.id, slug, &request.title, request.order, &message)
            .await
        {
            error!(slug, error = %err, "Could not record topic failure");
        }
        TopicResult::Failed {
            stage: Some(stage),
            error: message,
        }
    }
}

fn at<E: std::fmt::Display>(stage: TopicStage) -> impl Fn(E) -> StageFailure {
    move |err| StageFailure {
        stage,
        message: err.to_string(),
    }
}
