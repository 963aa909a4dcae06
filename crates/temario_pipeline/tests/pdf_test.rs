mod support;

use std::sync::Arc;
use std::sync::atomic::Ordering;
use support::{
    FlakyStorage, Harness, RenderStep, ScriptedGenerator, ScriptedRenderer, assistant, fast_retry,
    valid_body,
};
use temario_core::{TopicRecord, TopicStatus, count_words};
use temario_interface::{Compression, ObjectStorage};
use temario_pipeline::{PdfOutcome, PdfPipeline, TracingHook};
use temario_policy::PdfPolicy;

const OLD_URL: &str = "memory://assistants/auxiliar/syllabus/tema-1/v1.pdf";

async fn seed(harness: &Harness) -> TopicRecord {
    let content = valid_body("Tema 1", 80);
    let record = TopicRecord {
        slug: "tema-1".to_string(),
        title: "Tema 1".to_string(),
        order: 1,
        status: TopicStatus::Published,
        version: 1,
        word_count: count_words(&content),
        content: Some(content),
        pdf_url: Some(OLD_URL.to_string()),
        ..Default::default()
    };
    harness.gateway.save_topic("auxiliar", &record).await.unwrap();
    record
}

async fn stored(harness: &Harness) -> TopicRecord {
    harness
        .gateway
        .load_topic("auxiliar", "tema-1")
        .await
        .unwrap()
        .unwrap()
}

#[tokio::test]
async fn test_small_render_is_uploaded_under_new_version() {
    let harness = Harness::new(
        ScriptedGenerator::default(),
        ScriptedRenderer::always(RenderStep::Bytes(500)),
    );
    let record = seed(&harness).await;

    let outcome = harness
        .topics
        .pdf()
        .produce("auxiliar", &record, 2, &TracingHook)
        .await
        .unwrap();

    let url = "memory://assistants/auxiliar/syllabus/tema-1/v2.pdf".to_string();
    assert_eq!(outcome, PdfOutcome::Uploaded { url: url.clone(), reduced: false });
    assert_eq!(harness.renderer.calls(), 1);

    let after = stored(&harness).await;
    assert_eq!(after.pdf_url, Some(url));
    assert_eq!(after.version, 2);
    assert!(!after.pdf_generation_failed);
    assert!(!after.pdf_too_large);
    assert!(after.last_pdf_error.is_none());
}

#[tokio::test]
async fn test_oversized_render_degrades_to_content_only() {
    let harness = Harness::new(
        ScriptedGenerator::default(),
        ScriptedRenderer::always(RenderStep::Bytes(5_000)),
    );
    let record = seed(&harness).await;

    let outcome = harness
        .topics
        .pdf()
        .produce("auxiliar", &record, 2, &TracingHook)
        .await
        .unwrap();

    assert_eq!(outcome, PdfOutcome::ContentOnly);
    let requests = harness.renderer.requests.lock().unwrap().clone();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].compression, None);
    assert_eq!(requests[1].compression, Some(Compression::Aggressive));
    assert!(!requests[1].content_markdown.contains("Un ejemplo"));

    let after = stored(&harness).await;
    assert_eq!(after.status, TopicStatus::Published);
    assert!(after.pdf_too_large);
    assert!(after.pdf_url.is_none());
    assert!(after.is_content_only());
    assert!(harness.objects.keys().await.is_empty());
}

#[tokio::test]
async fn test_reduced_render_that_fits_is_uploaded() {
    let harness = Harness::new(
        ScriptedGenerator::default(),
        ScriptedRenderer::script(vec![RenderStep::Bytes(5_000)], RenderStep::Bytes(400)),
    );
    let record = seed(&harness).await;

    let outcome = harness
        .topics
        .pdf()
        .produce("auxiliar", &record, 2, &TracingHook)
        .await
        .unwrap();

    assert!(matches!(outcome, PdfOutcome::Uploaded { reduced: true, .. }));
    let key = "assistants/auxiliar/syllabus/tema-1/v2.pdf";
    assert_eq!(harness.objects.get(key).await.map(|b| b.len()), Some(400));
}

#[tokio::test]
async fn test_render_failure_keeps_previous_pdf() {
    let harness = Harness::new(
        ScriptedGenerator::default(),
        ScriptedRenderer::always(RenderStep::Fail),
    );
    let record = seed(&harness).await;

    let outcome = harness
        .topics
        .pdf()
        .produce("auxiliar", &record, 2, &TracingHook)
        .await
        .unwrap();

    assert!(matches!(outcome, PdfOutcome::Partial { .. }));
    // Two attempts for the full render, two for the reduced one.
    assert_eq!(harness.renderer.calls(), 4);

    let after = stored(&harness).await;
    assert_eq!(after.status, TopicStatus::Published);
    assert_eq!(after.pdf_url.as_deref(), Some(OLD_URL));
    assert_eq!(after.version, 1);
    assert!(after.pdf_generation_failed);
    assert!(after.last_pdf_error.unwrap().contains("503"));
}

#[tokio::test]
async fn test_upload_recovers_within_retry_budget() {
    let storage = Arc::new(FlakyStorage::failing(2));
    let harness = Harness::with_storage(
        ScriptedGenerator::default(),
        ScriptedRenderer::always(RenderStep::Bytes(300)),
        storage.inner.clone(),
        storage.clone(),
    );
    let record = seed(&harness).await;

    let outcome = harness
        .topics
        .pdf()
        .produce("auxiliar", &record, 2, &TracingHook)
        .await
        .unwrap();

    assert!(matches!(outcome, PdfOutcome::Uploaded { reduced: false, .. }));
    assert_eq!(storage.attempts.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_exhausted_upload_ends_partial_with_old_url() {
    let storage = Arc::new(FlakyStorage::failing(10));
    let harness = Harness::with_storage(
        ScriptedGenerator::default(),
        ScriptedRenderer::always(RenderStep::Bytes(300)),
        storage.inner.clone(),
        storage.clone(),
    );
    let record = seed(&harness).await;

    let outcome = harness
        .topics
        .pdf()
        .produce("auxiliar", &record, 2, &TracingHook)
        .await
        .unwrap();

    let PdfOutcome::Partial { error } = outcome else {
        panic!("expected partial outcome, got {:?}", outcome);
    };
    assert!(error.contains("bucket offline"));
    assert_eq!(storage.attempts.load(Ordering::SeqCst), 3);

    let after = stored(&harness).await;
    assert_eq!(after.pdf_url.as_deref(), Some(OLD_URL));
    assert!(after.pdf_generation_failed);
}

#[tokio::test]
async fn test_payload_above_upload_limit_is_never_attempted() {
    let storage = Arc::new(FlakyStorage::failing(0));
    let harness = Harness::with_storage(
        ScriptedGenerator::default(),
        ScriptedRenderer::always(RenderStep::Bytes(300)),
        storage.inner.clone(),
        storage.clone(),
    );
    let record = seed(&harness).await;
    let pipeline = PdfPipeline::new(
        Arc::new(ScriptedRenderer::always(RenderStep::Bytes(60_000))),
        storage.clone() as Arc<dyn ObjectStorage>,
        harness.gateway.clone(),
        PdfPolicy {
            render_threshold_bytes: 100_000,
            upload_limit_bytes: 50_000,
            reduced_char_cap: 2_000,
        },
        fast_retry(),
    );

    let outcome = pipeline
        .produce(&assistant().id, &record, 2, &TracingHook)
        .await
        .unwrap();

    let PdfOutcome::Partial { error } = outcome else {
        panic!("expected partial outcome, got {:?}", outcome);
    };
    assert!(error.contains("exceeds upload limit"));
    assert_eq!(storage.attempts.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_topic_without_content_is_an_error() {
    let harness = Harness::new(
        ScriptedGenerator::default(),
        ScriptedRenderer::always(RenderStep::Bytes(300)),
    );
    let mut record = seed(&harness).await;
    record.content = None;

    let result = harness
        .topics
        .pdf()
        .produce("auxiliar", &record, 2, &TracingHook)
        .await;

    assert!(result.is_err());
    assert_eq!(harness.renderer.calls(), 0);
}
