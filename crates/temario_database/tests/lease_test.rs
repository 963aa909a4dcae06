//! Tests for the generation lease.

use std::sync::Arc;
use std::time::Duration;
use temario_database::{GenerationLease, InMemoryDocumentStore};
use temario_error::{PersistenceErrorKind, TemarioErrorKind};

#[tokio::test]
async fn test_second_holder_is_refused() {
    let store = Arc::new(InMemoryDocumentStore::new());
    let first = GenerationLease::with_holder(store.clone(), Duration::from_secs(60), "uno");
    let second = GenerationLease::with_holder(store.clone(), Duration::from_secs(60), "dos");

    first.acquire("demo").await.unwrap();
    let err = second.acquire("demo").await.unwrap_err();
    match err.kind() {
        TemarioErrorKind::Persistence(e) => {
            assert!(matches!(&e.kind, PersistenceErrorKind::LeaseHeld { holder, .. } if holder == "uno"))
        }
        other => panic!("unexpected error: {}", other),
    }

    // Other assistants are independent
    second.acquire("otro").await.unwrap();
}

#[tokio::test]
async fn test_reacquire_and_release() {
    let store = Arc::new(InMemoryDocumentStore::new());
    let lease = GenerationLease::with_holder(store.clone(), Duration::from_secs(60), "uno");

    let first = lease.acquire("demo").await.unwrap();
    let renewed = lease.acquire("demo").await.unwrap();
    assert!(renewed.expires_at >= first.expires_at);

    lease.release("demo").await.unwrap();
    assert!(lease.current("demo").await.unwrap().is_none());

    let other = GenerationLease::with_holder(store, Duration::from_secs(60), "dos");
    other.acquire("demo").await.unwrap();
}

#[tokio::test]
async fn test_expired_lease_can_be_taken_over() {
    let store = Arc::new(InMemoryDocumentStore::new());
    let stale = GenerationLease::with_holder(store.clone(), Duration::ZERO, "uno");
    let fresh = GenerationLease::with_holder(store.clone(), Duration::from_secs(60), "dos");

    stale.acquire("demo").await.unwrap();
    tokio::time::sleep(Duration::from_millis(5)).await;
    let record = fresh.acquire("demo").await.unwrap();
    assert_eq!(record.holder, "dos");

    // Release by a non-owner leaves the lease alone
    stale.release("demo").await.unwrap();
    assert_eq!(fresh.current("demo").await.unwrap().unwrap().holder, "dos");
}
