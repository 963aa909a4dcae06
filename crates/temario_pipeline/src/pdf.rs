//! Render, reduce and upload one topic's PDF.

use crate::events::{StageHook, TopicStage};
use crate::reduce::reduce_for_pdf;
use serde::Serialize;
use std::sync::Arc;
use temario_core::{TopicPatch, TopicRecord, TopicStatus, pdf_object_key};
use temario_database::PersistenceGateway;
use temario_error::{
    PersistenceError, PersistenceErrorKind, RenderError, RenderErrorKind, TemarioError,
    TemarioResult, UploadError, UploadErrorKind,
};
use temario_interface::{Compression, ObjectStorage, PdfRenderer, RenderRequest, StoredObject};
use temario_policy::{PdfPolicy, RetryPolicy, RetrySection, retry_with_backoff};
use tracing::{info, instrument, warn};

const PDF_CONTENT_TYPE: &str = "application/pdf";

/// Terminal state of one PDF attempt.
///
/// None of these fail the topic: the text stays published and the PDF
/// result is recorded in the topic's diagnostic fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PdfOutcome {
    /// PDF stored and linked from the topic
    Uploaded {
        /// Public URL of the new object
        url: String,
        /// The stored PDF came from the reduced content
        reduced: bool,
    },
    /// Even the reduced render was above the threshold; published without PDF
    ContentOnly,
    /// Render or upload failed; any earlier PDF URL is kept
    Partial {
        /// Last failure message
        error: String,
    },
}

impl PdfOutcome {
    /// Short label for logs and tables.
    pub fn label(&self) -> &'static str {
        match self {
            PdfOutcome::Uploaded { reduced: false, .. } => "pdf uploaded",
            PdfOutcome::Uploaded { reduced: true, .. } => "reduced pdf uploaded",
            PdfOutcome::ContentOnly => "content only",
            PdfOutcome::Partial { .. } => "pdf failed",
        }
    }

    fn patch(&self, version: u32) -> TopicPatch {
        match self {
            PdfOutcome::Uploaded { url, .. } => TopicPatch {
                status: Some(TopicStatus::Published),
                version: Some(version),
                pdf_url: Some(Some(url.clone())),
                pdf_generation_failed: Some(false),
                pdf_too_large: Some(false),
                last_pdf_error: Some(None),
                ..Default::default()
            },
            PdfOutcome::ContentOnly => TopicPatch {
                status: Some(TopicStatus::Published),
                version: Some(version),
                pdf_url: Some(None),
                pdf_generation_failed: Some(false),
                pdf_too_large: Some(true),
                last_pdf_error: Some(None),
                ..Default::default()
            },
            PdfOutcome::Partial { error } => TopicPatch {
                pdf_generation_failed: Some(true),
                last_pdf_error: Some(Some(error.clone())),
                ..Default::default()
            },
        }
    }
}

enum Rendered {
    Fits(Vec<u8>),
    TooLarge(usize),
    Failed(TemarioError),
}

/// Per-topic PDF state machine.
///
/// A render above the size threshold is retried once with reduced content
/// and aggressive compression; a render that fails outright gets the same
/// single reduced retry. Uploads above the hard limit are never attempted.
#[derive(Clone)]
pub struct PdfPipeline {
    renderer: Arc<dyn PdfRenderer>,
    storage: Arc<dyn ObjectStorage>,
    gateway: PersistenceGateway,
    policy: PdfPolicy,
    render_retry: RetryPolicy,
    upload_retry: RetryPolicy,
}

impl std::fmt::Debug for PdfPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PdfPipeline")
            .field("storage", &self.storage.backend_name())
            .field("gateway", &self.gateway)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl PdfPipeline {
    /// Assemble the pipeline from its collaborators and policies.
    pub fn new(
        renderer: Arc<dyn PdfRenderer>,
        storage: Arc<dyn ObjectStorage>,
        gateway: PersistenceGateway,
        policy: PdfPolicy,
        retry: RetrySection,
    ) -> Self {
        Self {
            renderer,
            storage,
            gateway,
            policy,
            render_retry: retry.render,
            upload_retry: retry.upload,
        }
    }

    /// Produce the PDF of a published topic and record the outcome.
    ///
    /// `version` is the version the PDF is stored under; it is written to the
    /// topic only when the topic ends up with a new PDF or deliberately
    /// without one. A partial failure leaves the version and the previous
    /// URL untouched. Only a failure to write the outcome is an error.
    #[instrument(skip(self, record, hook), fields(slug = %record.slug))]
    pub async fn produce(
        &self,
        assistant_id: &str,
        record: &TopicRecord,
        version: u32,
        hook: &dyn StageHook,
    ) -> TemarioResult<PdfOutcome> {
        let content = record
            .content
            .as_deref()
            .filter(|text| !text.trim().is_empty())
            .ok_or_else(|| {
                PersistenceError::new(PersistenceErrorKind::NotFound(format!(
                    "content of topic {}",
                    record.slug
                )))
            })?;

        let outcome = self
            .render_and_upload(assistant_id, record, content, version, hook)
            .await;

        match &outcome {
            PdfOutcome::Uploaded { url, reduced } => {
                info!(url = %url, reduced, version, "PDF published")
            }
            PdfOutcome::ContentOnly => warn!(version, "PDF too large, published content only"),
            PdfOutcome::Partial { error } => warn!(error = %error, "PDF failed, text stays published"),
        }

        self.gateway
            .update_topic_metadata(assistant_id, &record.slug, &outcome.patch(version))
            .await?;
        Ok(outcome)
    }

    async fn render_and_upload(
        &self,
        assistant_id: &str,
        record: &TopicRecord,
        content: &str,
        version: u32,
        hook: &dyn StageHook,
    ) -> PdfOutcome {
        hook.enter(&record.slug, TopicStage::Rendering).await;
        let full = self
            .render(assistant_id, &record.title, content.to_string(), None)
            .await;

        let (bytes, reduced) = match full {
            Rendered::Fits(bytes) => (bytes, false),
            Rendered::TooLarge(size) => {
                info!(
                    size,
                    threshold = self.policy.render_threshold_bytes,
                    "Render above threshold, reducing content"
                );
                match self.render_reduced(assistant_id, record, content, hook).await {
                    Ok(bytes) => (bytes, true),
                    Err(outcome) => return outcome,
                }
            }
            Rendered::Failed(err) => {
                warn!(error = %err, "Full render failed, retrying with reduced content");
                match self.render_reduced(assistant_id, record, content, hook).await {
                    Ok(bytes) => (bytes, true),
                    Err(outcome) => return outcome,
                }
            }
        };

        hook.enter(&record.slug, TopicStage::Uploading).await;
        let key = pdf_object_key(assistant_id, &record.slug, version);
        match self.upload(&key, &bytes).await {
            Ok(object) => PdfOutcome::Uploaded {
                url: object.url,
                reduced,
            },
            Err(err) => PdfOutcome::Partial {
                error: err.to_string(),
            },
        }
    }

    async fn render_reduced(
        &self,
        assistant_id: &str,
        record: &TopicRecord,
        content: &str,
        hook: &dyn StageHook,
    ) -> Result<Vec<u8>, PdfOutcome> {
        hook.enter(&record.slug, TopicStage::Reducing).await;
        let reduced_content = reduce_for_pdf(content, self.policy.reduced_char_cap);
        hook.enter(&record.slug, TopicStage::Rendering).await;
        match self
            .render(
                assistant_id,
                &record.title,
                reduced_content,
                Some(Compression::Aggressive),
            )
            .await
        {
            Rendered::Fits(bytes) => Ok(bytes),
            Rendered::TooLarge(_) => Err(PdfOutcome::ContentOnly),
            Rendered::Failed(err) => Err(PdfOutcome::Partial {
                error: err.to_string(),
            }),
        }
    }

    async fn render(
        &self,
        assistant_id: &str,
        title: &str,
        content_markdown: String,
        compression: Option<Compression>,
    ) -> Rendered {
        let request = RenderRequest {
            title: title.to_string(),
            content_markdown,
            compression,
        };
        let request = &request;
        let size_hint = request.content_markdown.len();

        let result = retry_with_backoff(
            &self.render_retry,
            size_hint,
            "render",
            |_| async move { self.renderer.render(assistant_id, request).await },
            |elapsed| RenderError::new(RenderErrorKind::Timeout(elapsed.as_millis() as u64)).into(),
        )
        .await;

        match result {
            Ok(bytes) if bytes.len() <= self.policy.render_threshold_bytes => Rendered::Fits(bytes),
            Ok(bytes) => Rendered::TooLarge(bytes.len()),
            Err(err) => Rendered::Failed(err),
        }
    }

    async fn upload(&self, key: &str, bytes: &[u8]) -> Result<StoredObject, UploadError> {
        if bytes.len() > self.policy.upload_limit_bytes {
            return Err(UploadError::new(UploadErrorKind::PayloadTooLarge {
                size: bytes.len(),
                limit: self.policy.upload_limit_bytes,
            }));
        }

        retry_with_backoff(
            &self.upload_retry,
            bytes.len(),
            "upload",
            |_| async move {
                self.storage
                    .upload(key, bytes, PDF_CONTENT_TYPE)
                    .await
                    .map_err(|err| UploadError::new(UploadErrorKind::Storage(err.to_string())))
            },
            |elapsed| UploadError::new(UploadErrorKind::Timeout(elapsed.as_millis() as u64)),
        )
        .await
    }
}
