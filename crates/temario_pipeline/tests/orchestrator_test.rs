mod support;

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;
use support::{
    Harness, HeldStorage, MIN_FLASHCARDS, RenderStep, ScriptedGenerator, ScriptedRenderer,
    TESTS_PER_TOPIC, assistant, valid_body,
};
use temario_core::{
    TopicRecord, TopicRequest, TopicStatus, count_words, flashcards_collection, tests_collection,
};
use temario_database::GenerationLease;
use temario_pipeline::{
    BatchOrchestrator, PdfOutcome, RunEvent, TopicResult, TopicRunStatus, TopicStage,
};
use temario_policy::RunPolicy;
use temario_storage::InMemoryObjectStorage;
use tokio::sync::Notify;
use tokio_stream::StreamExt;

fn harness(generator: ScriptedGenerator) -> Harness {
    Harness::new(generator, ScriptedRenderer::always(RenderStep::Bytes(400)))
}

fn orchestrator(harness: &Harness) -> BatchOrchestrator {
    BatchOrchestrator::new(harness.topics.clone(), RunPolicy::default())
}

#[tokio::test]
async fn test_failed_topic_does_not_stop_the_batch() {
    let harness = harness(ScriptedGenerator {
        failing_titles: vec!["Tema 2".to_string()],
        ..Default::default()
    });
    let orchestrator = orchestrator(&harness);
    let requests = TopicRequest::from_titles(["Tema 1", "Tema 2", "Tema 3", "Tema 4"]);
    let handle = orchestrator.handle_for(&requests);

    let outcomes = orchestrator
        .run(&assistant(), &requests, &handle)
        .await
        .unwrap();

    assert_eq!(outcomes.len(), 4);
    assert_eq!(outcomes.iter().filter(|o| o.is_success()).count(), 3);
    assert!(outcomes[1].error().unwrap().contains("model overloaded"));
    assert!(matches!(
        outcomes[1].result,
        TopicResult::Failed { stage: Some(TopicStage::Generating), .. }
    ));

    let snapshot = handle.snapshot().await;
    assert_eq!(snapshot.completed, 4);
    assert_eq!(snapshot.percent, 100);
    assert!(snapshot.finished);
    assert!(matches!(snapshot.topics[1].status, TopicRunStatus::Failed { .. }));
    assert!(snapshot.log.iter().any(|line| line.contains("Tema 2") && line.contains("failed")));

    let failed = harness.gateway.load_topic("auxiliar", "tema-2").await.unwrap().unwrap();
    assert_eq!(failed.status, TopicStatus::Error);
    assert!(failed.last_error.unwrap().contains("model overloaded"));

    let later = harness.gateway.load_topic("auxiliar", "tema-4").await.unwrap().unwrap();
    assert_eq!(later.status, TopicStatus::Published);
}

#[tokio::test]
async fn test_published_topic_has_exact_counts_and_pdf() {
    let harness = harness(ScriptedGenerator::default());
    let orchestrator = orchestrator(&harness);
    let requests = TopicRequest::from_titles(["Tema 1"]);
    let handle = orchestrator.handle_for(&requests);

    let outcomes = orchestrator
        .run(&assistant(), &requests, &handle)
        .await
        .unwrap();

    let TopicResult::Published { version, pdf, .. } = &outcomes[0].result else {
        panic!("expected published topic, got {:?}", outcomes[0]);
    };
    assert_eq!(*version, 1);
    assert!(matches!(pdf, PdfOutcome::Uploaded { reduced: false, .. }));

    assert_eq!(
        harness.store.count(&tests_collection("auxiliar", "tema-1")).await,
        TESTS_PER_TOPIC
    );
    assert_eq!(
        harness.store.count(&flashcards_collection("auxiliar", "tema-1")).await,
        MIN_FLASHCARDS
    );

    let cards = harness.gateway.load_flashcards("auxiliar", "tema-1").await.unwrap();
    assert_eq!(temario_core::dedup_flashcards(cards.clone()), cards);

    let record = harness.gateway.load_topic("auxiliar", "tema-1").await.unwrap().unwrap();
    assert_eq!(record.status, TopicStatus::Published);
    assert!(record.pdf_url.unwrap().ends_with("tema-1/v1.pdf"));
    assert!(!record.pdf_generation_failed);
    assert!(record.last_pdf_error.is_none());
}

#[tokio::test]
async fn test_regeneration_bumps_version() {
    let harness = harness(ScriptedGenerator::default());
    let orchestrator = orchestrator(&harness);
    let requests = TopicRequest::from_titles(["Tema 1"]);

    for _ in 0..2 {
        let handle = orchestrator.handle_for(&requests);
        orchestrator.run(&assistant(), &requests, &handle).await.unwrap();
    }

    let record = harness.gateway.load_topic("auxiliar", "tema-1").await.unwrap().unwrap();
    assert_eq!(record.version, 2);
    assert!(record.pdf_url.unwrap().ends_with("v2.pdf"));
}

fn published_v1(slug: &str, title: &str) -> TopicRecord {
    let content = valid_body(title, 80);
    TopicRecord {
        slug: slug.to_string(),
        title: title.to_string(),
        order: 1,
        status: TopicStatus::Published,
        version: 1,
        word_count: count_words(&content),
        content: Some(content),
        pdf_url: Some(format!("mem://{}/v1.pdf", slug)),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_regenerating_topic_is_stored_as_generating_while_in_flight() {
    let entered = Arc::new(Notify::new());
    let release = Arc::new(Notify::new());
    let harness = harness(ScriptedGenerator {
        hold_first: Some((entered.clone(), release.clone())),
        ..Default::default()
    });
    let seeded = published_v1("tema-1", "Tema 1");
    harness.gateway.save_topic("auxiliar", &seeded).await.unwrap();
    let (_handle, task) = orchestrator(&harness).spawn(assistant(), TopicRequest::from_titles(["Tema 1"]));

    entered.notified().await;
    let in_flight = harness.gateway.load_topic("auxiliar", "tema-1").await.unwrap().unwrap();
    assert_eq!(in_flight.status, TopicStatus::Generating);
    assert_eq!(in_flight.version, 1);
    assert_eq!(in_flight.content, seeded.content);

    release.notify_one();
    let outcomes = task.await.unwrap().unwrap();

    assert!(outcomes[0].is_success());
    let done = harness.gateway.load_topic("auxiliar", "tema-1").await.unwrap().unwrap();
    assert_eq!(done.status, TopicStatus::Published);
    assert_eq!(done.version, 2);
}

#[tokio::test]
async fn test_new_topic_gets_a_bare_generating_record() {
    let entered = Arc::new(Notify::new());
    let release = Arc::new(Notify::new());
    let harness = harness(ScriptedGenerator {
        hold_first: Some((entered.clone(), release.clone())),
        ..Default::default()
    });
    let (_handle, task) = orchestrator(&harness).spawn(assistant(), TopicRequest::from_titles(["Tema 1"]));

    entered.notified().await;
    let in_flight = harness.gateway.load_topic("auxiliar", "tema-1").await.unwrap().unwrap();
    assert_eq!(in_flight.status, TopicStatus::Generating);
    assert_eq!(in_flight.version, 0);
    assert!(in_flight.content.is_none());

    release.notify_one();
    task.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_failed_regeneration_keeps_version_and_pdf() {
    let harness = harness(ScriptedGenerator {
        unique_cards: MIN_FLASHCARDS - 1,
        duplicate_cards: 0,
        ..Default::default()
    });
    let seeded = published_v1("tema-1", "Tema 1");
    harness.gateway.save_topic("auxiliar", &seeded).await.unwrap();
    let orchestrator = orchestrator(&harness);
    let requests = TopicRequest::from_titles(["Tema 1"]);
    let handle = orchestrator.handle_for(&requests);

    let outcomes = orchestrator
        .run(&assistant(), &requests, &handle)
        .await
        .unwrap();

    assert!(!outcomes[0].is_success());
    let record = harness.gateway.load_topic("auxiliar", "tema-1").await.unwrap().unwrap();
    assert_eq!(record.status, TopicStatus::Error);
    assert_eq!(record.version, 1);
    assert_eq!(record.pdf_url, seeded.pdf_url);
    assert!(!record.pdf_generation_failed);
    assert_eq!(harness.renderer.calls(), 0);
}

#[tokio::test]
async fn test_short_question_set_fails_topic_without_writing_tests() {
    let harness = harness(ScriptedGenerator {
        questions: TESTS_PER_TOPIC,
        malformed_questions: 1,
        ..Default::default()
    });
    let orchestrator = orchestrator(&harness);
    let requests = TopicRequest::from_titles(["Tema 1"]);
    let handle = orchestrator.handle_for(&requests);

    let outcomes = orchestrator
        .run(&assistant(), &requests, &handle)
        .await
        .unwrap();

    assert!(matches!(
        outcomes[0].result,
        TopicResult::Failed { stage: Some(TopicStage::DerivingTests), .. }
    ));
    assert_eq!(
        harness.store.count(&tests_collection("auxiliar", "tema-1")).await,
        0
    );
    assert_eq!(harness.generator.card_calls.load(Ordering::SeqCst), 0);

    let record = harness.gateway.load_topic("auxiliar", "tema-1").await.unwrap().unwrap();
    assert_eq!(record.status, TopicStatus::Error);
}

#[tokio::test]
async fn test_too_few_unique_flashcards_fails_topic() {
    let harness = harness(ScriptedGenerator {
        unique_cards: MIN_FLASHCARDS - 1,
        duplicate_cards: 5,
        ..Default::default()
    });
    let orchestrator = orchestrator(&harness);
    let requests = TopicRequest::from_titles(["Tema 1"]);
    let handle = orchestrator.handle_for(&requests);

    let outcomes = orchestrator
        .run(&assistant(), &requests, &handle)
        .await
        .unwrap();

    assert!(matches!(
        outcomes[0].result,
        TopicResult::Failed { stage: Some(TopicStage::SavingFlashcards), .. }
    ));
    assert_eq!(
        harness.store.count(&flashcards_collection("auxiliar", "tema-1")).await,
        0
    );
    assert_eq!(harness.renderer.calls(), 0);
}

#[tokio::test]
async fn test_untitled_topic_fails_without_writes() {
    let harness = harness(ScriptedGenerator::default());
    let orchestrator = orchestrator(&harness);
    let requests = TopicRequest::from_titles(["¿?", "Tema 2"]);
    let handle = orchestrator.handle_for(&requests);

    let outcomes = orchestrator
        .run(&assistant(), &requests, &handle)
        .await
        .unwrap();

    assert!(!outcomes[0].is_success());
    assert!(outcomes[1].is_success());
    assert_eq!(harness.generator.body_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_pause_holds_the_run_until_resume() {
    let entered = Arc::new(Notify::new());
    let release = Arc::new(Notify::new());
    let harness = harness(ScriptedGenerator {
        hold_first: Some((entered.clone(), release.clone())),
        ..Default::default()
    });
    let orchestrator = orchestrator(&harness);
    let (handle, task) =
        orchestrator.spawn(assistant(), TopicRequest::from_titles(["Tema 1", "Tema 2", "Tema 3"]));

    entered.notified().await;
    handle.pause().await;
    release.notify_one();
    tokio::time::sleep(Duration::from_secs(60)).await;

    assert_eq!(harness.generator.body_calls.load(Ordering::SeqCst), 1);
    assert_eq!(harness.generator.test_calls.load(Ordering::SeqCst), 0);
    let snapshot = handle.snapshot().await;
    assert!(snapshot.paused);
    assert_eq!(
        snapshot.topics[0].status,
        TopicRunStatus::Running { stage: Some(TopicStage::Validating) }
    );
    assert_eq!(snapshot.topics[1].status, TopicRunStatus::Pending);

    handle.resume().await;
    let outcomes = task.await.unwrap().unwrap();

    assert_eq!(outcomes.len(), 3);
    assert!(outcomes.iter().all(|o| o.is_success()));
    assert_eq!(harness.generator.body_calls.load(Ordering::SeqCst), 3);
}

#[tokio::test(start_paused = true)]
async fn test_pause_between_topics_starts_nothing_until_resume() {
    let entered = Arc::new(Notify::new());
    let release = Arc::new(Notify::new());
    let objects = InMemoryObjectStorage::new();
    let harness = Harness::with_storage(
        ScriptedGenerator::default(),
        ScriptedRenderer::always(RenderStep::Bytes(400)),
        objects.clone(),
        Arc::new(HeldStorage::new(objects, entered.clone(), release.clone())),
    );
    let orchestrator = orchestrator(&harness);
    let titles = ["Tema 1", "Tema 2", "Tema 3", "Tema 4", "Tema 5"];
    let (handle, task) = orchestrator.spawn(assistant(), TopicRequest::from_titles(titles));

    // Topic 1 is uploading its PDF, past its last stage checkpoint.
    entered.notified().await;
    handle.pause().await;
    release.notify_one();
    tokio::time::sleep(Duration::from_secs(60)).await;

    let snapshot = handle.snapshot().await;
    assert!(snapshot.paused);
    assert_eq!(snapshot.completed, 1);
    assert_eq!(snapshot.topics[0].status, TopicRunStatus::Published);
    for topic in &snapshot.topics[1..] {
        assert_eq!(topic.status, TopicRunStatus::Pending);
    }
    assert_eq!(harness.generator.body_calls.load(Ordering::SeqCst), 1);

    handle.resume().await;
    let outcomes = task.await.unwrap().unwrap();

    assert_eq!(outcomes.len(), 5);
    assert!(outcomes.iter().all(|o| o.is_success()));
    assert_eq!(harness.generator.body_calls.load(Ordering::SeqCst), 5);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_stops_after_current_topic() {
    let entered = Arc::new(Notify::new());
    let release = Arc::new(Notify::new());
    let harness = harness(ScriptedGenerator {
        hold_first: Some((entered.clone(), release.clone())),
        ..Default::default()
    });
    let orchestrator = orchestrator(&harness);
    let (handle, task) =
        orchestrator.spawn(assistant(), TopicRequest::from_titles(["Tema 1", "Tema 2", "Tema 3"]));

    entered.notified().await;
    handle.cancel().await;
    release.notify_one();
    let outcomes = task.await.unwrap().unwrap();

    assert_eq!(outcomes.len(), 1);
    assert!(outcomes[0].is_success());
    let snapshot = handle.snapshot().await;
    assert!(snapshot.cancelled);
    assert_eq!(snapshot.completed, 1);
    assert_eq!(snapshot.topics[2].status, TopicRunStatus::Skipped);
}

#[tokio::test]
async fn test_events_report_progress_after_every_topic() {
    let harness = harness(ScriptedGenerator {
        failing_titles: vec!["Tema 1".to_string()],
        ..Default::default()
    });
    let orchestrator = orchestrator(&harness);
    let (handle, task) = orchestrator.spawn(assistant(), TopicRequest::from_titles(["Tema 1", "Tema 2"]));
    let mut events = Box::pin(handle.subscribe());

    let mut progress = Vec::new();
    while let Some(event) = events.next().await {
        match event {
            RunEvent::Progress { percent, .. } => progress.push(percent),
            RunEvent::Finished { succeeded, failed, skipped } => {
                assert_eq!((succeeded, failed, skipped), (1, 1, 0));
                break;
            }
            _ => {}
        }
    }
    task.await.unwrap().unwrap();

    assert_eq!(progress, vec![50, 100]);
}

#[tokio::test]
async fn test_held_lease_blocks_the_run() {
    let harness = harness(ScriptedGenerator::default());
    let store = Arc::new(harness.store.clone());
    GenerationLease::with_holder(store.clone(), Duration::from_secs(600), "other-operator")
        .acquire("auxiliar")
        .await
        .unwrap();
    let orchestrator = orchestrator(&harness).with_lease(GenerationLease::with_holder(
        store,
        Duration::from_secs(600),
        "this-operator",
    ));
    let requests = TopicRequest::from_titles(["Tema 1"]);
    let handle = orchestrator.handle_for(&requests);

    let result = orchestrator.run(&assistant(), &requests, &handle).await;

    assert!(result.is_err());
    assert_eq!(harness.generator.body_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_lease_is_released_after_the_run() {
    let harness = harness(ScriptedGenerator::default());
    let lease = GenerationLease::with_holder(
        Arc::new(harness.store.clone()),
        Duration::from_secs(600),
        "this-operator",
    );
    let orchestrator = orchestrator(&harness).with_lease(lease.clone());
    let requests = TopicRequest::from_titles(["Tema 1"]);
    let handle = orchestrator.handle_for(&requests);

    orchestrator.run(&assistant(), &requests, &handle).await.unwrap();

    assert!(lease.current("auxiliar").await.unwrap().is_none());
}
