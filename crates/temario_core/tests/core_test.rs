use serde_json::json;
use temario_core::{
    ContentProfile, Difficulty, Flashcard, Question, SectionMarker, TopicPatch, TopicRecord,
    TopicStatus, dedup_flashcards, slugify,
};

fn card(front: &str, back: &str) -> Flashcard {
    Flashcard {
        front: front.to_string(),
        back: back.to_string(),
        tags: vec!["constitucion".to_string()],
    }
}

#[test]
fn slug_is_stable_for_the_same_title() {
    let title = "Tema 12: El Gobierno y la Administración";
    assert_eq!(slugify(title), slugify(title));
    assert_eq!(slugify(title), "tema-12-el-gobierno-y-la-administracion");
}

#[test]
fn slug_of_punctuation_only_title_is_empty() {
    assert_eq!(slugify(" -- ¿? "), "");
}

#[test]
fn topic_record_uses_camel_case_fields() {
    let record = TopicRecord::builder()
        .slug("tema-1")
        .title("Tema 1")
        .order(1_u32)
        .status(TopicStatus::Published)
        .version(2_u32)
        .word_count(2900_usize)
        .pdf_url(Some("https://cdn.example/v2.pdf".to_string()))
        .build()
        .unwrap();

    let value = serde_json::to_value(&record).unwrap();
    assert_eq!(value["wordCount"], json!(2900));
    assert_eq!(value["pdfUrl"], json!("https://cdn.example/v2.pdf"));
    assert_eq!(value["status"], json!("published"));
    assert_eq!(value["pdfTooLarge"], json!(false));
    assert!(value.get("content").is_none());
}

#[test]
fn topic_record_tolerates_missing_diagnostics() {
    let value = json!({
        "slug": "tema-2",
        "title": "Tema 2",
        "order": 2,
        "status": "error",
        "version": 1,
        "wordCount": 0
    });

    let record: TopicRecord = serde_json::from_value(value).unwrap();
    assert_eq!(record.status, TopicStatus::Error);
    assert!(!record.pdf_generation_failed);
    assert!(record.pdf_url.is_none());
}

#[test]
fn patch_clears_and_sets_fields() {
    let mut record = TopicRecord::builder()
        .slug("tema-3")
        .status(TopicStatus::Published)
        .pdf_generation_failed(true)
        .last_pdf_error(Some("upload timed out".to_string()))
        .pdf_url(Some("https://cdn.example/v1.pdf".to_string()))
        .build()
        .unwrap();

    let patch = TopicPatch {
        version: Some(2),
        pdf_url: Some(Some("https://cdn.example/v2.pdf".to_string())),
        pdf_generation_failed: Some(false),
        last_pdf_error: Some(None),
        ..Default::default()
    };
    patch.apply_to(&mut record);

    assert_eq!(record.version, 2);
    assert_eq!(record.pdf_url.as_deref(), Some("https://cdn.example/v2.pdf"));
    assert!(!record.pdf_generation_failed);
    assert!(record.last_pdf_error.is_none());

    let value = serde_json::to_value(&patch).unwrap();
    assert_eq!(value["lastPdfError"], serde_json::Value::Null);
    assert!(value.get("status").is_none());
}

#[test]
fn content_only_requires_published_without_url() {
    let record = TopicRecord::builder()
        .status(TopicStatus::Published)
        .pdf_too_large(true)
        .build()
        .unwrap();
    assert!(record.is_content_only());

    let failed = TopicRecord::builder()
        .status(TopicStatus::Error)
        .pdf_too_large(true)
        .build()
        .unwrap();
    assert!(!failed.is_content_only());
}

#[test]
fn dedup_removes_case_and_whitespace_variants() {
    let cards = vec![
        card("¿Qué es la soberanía?", "Reside en el pueblo español"),
        card("¿qué es la   soberanía?", "reside en el pueblo español"),
        card("  ¿QUÉ ES LA SOBERANÍA? ", "Reside en el pueblo\tespañol "),
        card("Artículo 2", "Unidad de la Nación"),
    ];

    let unique = dedup_flashcards(cards);
    assert_eq!(unique.len(), 2);
    assert_eq!(unique[0].front, "¿Qué es la soberanía?");
    assert_eq!(unique[1].front, "Artículo 2");
}

#[test]
fn dedup_is_idempotent() {
    let cards = vec![
        card("A", "B"),
        card("a", "b"),
        card("C", "D"),
        card("c ", " d"),
        card("E", "F"),
    ];

    let once = dedup_flashcards(cards);
    let twice = dedup_flashcards(once.clone());
    assert_eq!(once, twice);
}

#[test]
fn dedup_keeps_same_front_with_different_back() {
    let unique = dedup_flashcards(vec![card("Artículo 1", "Estado social"), card("Artículo 1", "Soberanía")]);
    assert_eq!(unique.len(), 2);
}

#[test]
fn question_accepts_spanish_aliases() {
    let question: Question = serde_json::from_value(json!({
        "question": "¿Quién sanciona las leyes?",
        "options": ["El Rey", "El Gobierno", "Las Cortes", "El Tribunal Constitucional"],
        "correct": 0,
        "explanation": "Artículo 91",
        "difficulty": "fácil"
    }))
    .unwrap();

    assert!(question.is_well_formed());
    assert_eq!(question.difficulty, Difficulty::Easy);
    assert_eq!(question.rationale, "Artículo 91");
}

#[test]
fn question_with_bad_index_is_rejected() {
    let question = Question {
        stem: "Pregunta".to_string(),
        options: vec!["a".into(), "b".into(), "c".into(), "d".into()],
        correct_index: 4,
        rationale: String::new(),
        difficulty: Difficulty::Medium,
    };
    assert_eq!(question.problems().len(), 1);
}

#[test]
fn profile_deserializes_with_default_markers() {
    let profile: ContentProfile = serde_json::from_value(json!({
        "name": "administrativo",
        "min_words": 2600,
        "tests_per_topic": 5,
        "min_flashcards": 10
    }))
    .unwrap();

    assert_eq!(*profile.tests_per_topic(), 5);
    assert_eq!(profile.required_markers()[0], SectionMarker::Header);
    assert_eq!(profile.required_markers().len(), 8);
}
