//! Tests for the HTTP clients against a local one-shot server.

mod support;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde_json::json;
use support::serve_once;
use temario_error::{GenerationErrorKind, RenderErrorKind, TemarioErrorKind};
use temario_interface::{Compression, ContentGenerator, PdfRenderer, RenderRequest};
use temario_models::{ChatCompletionGenerator, HttpPdfRenderer};
use temario_policy::GeneratorConfig;

fn chat_reply(content: &str) -> String {
    json!({
        "choices": [{"message": {"role": "assistant", "content": content}, "finish_reason": "stop"}]
    })
    .to_string()
}

fn generator(base_url: String) -> ChatCompletionGenerator {
    let config = GeneratorConfig {
        base_url,
        ..Default::default()
    };
    ChatCompletionGenerator::with_api_key(&config, "test-key")
}

#[tokio::test]
async fn test_generate_body_counts_words_locally() {
    let (url, request) =
        serve_once(200, chat_reply("```markdown\n# Tema 1\n\n## Objetivos\nConocer la ley\n```")).await;

    let body = generator(url)
        .generate_body("Auxiliar", "Tema 1", 2500)
        .await
        .unwrap();

    assert_eq!(body.text, "# Tema 1\n\n## Objetivos\nConocer la ley");
    assert_eq!(body.word_count, 6);

    let raw = request.await.unwrap();
    assert!(raw.starts_with("POST /v1/chat/completions"));
    assert!(raw.to_lowercase().contains("authorization: bearer test-key"));
    assert!(raw.contains("2500"));
}

#[tokio::test]
async fn test_derive_tests_accepts_wrapped_listing() {
    let listing = json!({"questions": [{
        "stem": "¿Quién sanciona las leyes?",
        "options": ["El Rey", "Las Cortes", "El Gobierno", "El Senado"],
        "correct_index": 0,
        "rationale": "Artículo 91",
        "difficulty": "easy"
    }]});
    let reply = format!("Aquí están:\n```json\n{}\n```", listing);
    let (url, _request) = serve_once(200, chat_reply(&reply)).await;

    let questions = generator(url)
        .derive_tests("Tema 1", "texto", 1)
        .await
        .unwrap();
    assert_eq!(questions.len(), 1);
    assert!(questions[0].is_well_formed());
}

#[tokio::test]
async fn test_derive_flashcards_without_json_fails() {
    let (url, _request) = serve_once(200, chat_reply("Lo siento, no puedo.")).await;

    let err = generator(url)
        .derive_flashcards("Tema 1", "texto", 10)
        .await
        .unwrap_err();
    match err.kind() {
        TemarioErrorKind::Generation(e) => {
            assert!(matches!(e.kind, GenerationErrorKind::MissingStructuredOutput(_)))
        }
        other => panic!("unexpected error: {}", other),
    }
}

#[tokio::test]
async fn test_throttling_maps_to_retryable_status() {
    use temario_error::RetryableError;

    let (url, _request) = serve_once(429, json!({"error": "rate limited"}).to_string()).await;
    let err = generator(url)
        .generate_body("Auxiliar", "Tema 1", 10)
        .await
        .unwrap_err();
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_render_posts_contract_body() {
    let pdf = b"%PDF-1.7 contenido";
    let reply = json!({"ok": true, "pdfData": STANDARD.encode(pdf)}).to_string();
    let (url, request) = serve_once(200, reply).await;

    let renderer = HttpPdfRenderer::new(url);
    let bytes = renderer
        .render(
            "auxiliar-administrativo",
            &RenderRequest {
                title: "Tema 1".to_string(),
                content_markdown: "# Tema 1".to_string(),
                compression: Some(Compression::Aggressive),
            },
        )
        .await
        .unwrap();
    assert_eq!(bytes, pdf);

    let raw = request.await.unwrap();
    assert!(raw.starts_with("POST /api/syllabus/auxiliar-administrativo/pdf"));
    assert!(raw.contains("\"contentMarkdown\":\"# Tema 1\""));
    assert!(raw.contains("\"compression\":\"aggressive\""));
}

#[tokio::test]
async fn test_render_non_2xx_is_status_error() {
    let (url, _request) = serve_once(502, "{}".to_string()).await;

    let err = HttpPdfRenderer::new(url)
        .render(
            "a",
            &RenderRequest {
                title: "t".to_string(),
                content_markdown: "m".to_string(),
                compression: None,
            },
        )
        .await
        .unwrap_err();
    match err.kind() {
        TemarioErrorKind::Render(e) => assert!(matches!(
            e.kind,
            RenderErrorKind::Status {
                status_code: 502,
                ..
            }
        )),
        other => panic!("unexpected error: {}", other),
    }
}
