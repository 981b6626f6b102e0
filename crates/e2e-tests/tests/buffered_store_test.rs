//! Buffered document store E2E tests.
//!
//! Store -> flush -> get/search on a Tantivy index, flush triggers,
//! lifecycle, and worker failure handling.

use std::time::Duration;

use pretty_assertions::assert_eq;

use catalog_search::{IndexError, MemoryBackend, WorkerHealth};
use catalog_types::Anime;
use e2e_tests::{create_test_anime, memory_anime_store, TestHarness};

const NO_AGE_FLUSH: Duration = Duration::from_secs(600);

/// Every stored record is retrievable after an explicit flush.
#[tokio::test]
async fn test_store_flush_get_all() {
    let harness = TestHarness::new();
    let store = harness.anime_store(1000, NO_AGE_FLUSH);

    let anime = create_test_anime(25, "Mobile Suit Gundam");
    for record in &anime {
        store.store(record).await.unwrap();
    }
    store.flush().await.unwrap();

    for record in &anime {
        let found = store.get(&record.id).await.unwrap();
        assert_eq!(&found, record);
    }
    assert_eq!(store.num_docs().await.unwrap(), 25);

    store.close().await.unwrap();
}

/// The threshold flush on the 2nd record makes records 1-2 visible before
/// the 3rd store returns; record 3 waits for the explicit flush.
#[tokio::test]
async fn test_threshold_flush_visibility() {
    let harness = TestHarness::new();
    let store = harness.anime_store(2, NO_AGE_FLUSH);

    let anime = create_test_anime(3, "Trigun");
    for record in &anime {
        store.store(record).await.unwrap();
    }

    assert_eq!(store.get("anidb-0").await.unwrap().title, "Trigun 0");
    assert_eq!(store.get("anidb-1").await.unwrap().title, "Trigun 1");
    assert!(store.get("anidb-2").await.unwrap_err().is_not_found());

    store.flush().await.unwrap();
    assert_eq!(store.get("anidb-2").await.unwrap().title, "Trigun 2");
}

/// A single record is committed by the age timer alone, and an already
/// open reader is refreshed.
#[tokio::test]
async fn test_age_flush_single_record() {
    let harness = TestHarness::new();
    let store = harness.anime_store(1000, Duration::from_millis(100));

    // Opens the reader before anything is committed
    assert!(store.get("anidb-23").await.unwrap_err().is_not_found());

    store
        .store(&Anime::new("anidb-23", "Cowboy Bebop"))
        .await
        .unwrap();

    let mut found = None;
    for _ in 0..50 {
        tokio::time::sleep(Duration::from_millis(50)).await;
        if let Ok(record) = store.get("anidb-23").await {
            found = Some(record);
            break;
        }
    }
    assert_eq!(found.map(|a| a.title), Some("Cowboy Bebop".to_string()));
    assert_eq!(store.health(), WorkerHealth::Running);

    store.close().await.unwrap();
}

/// Storing the same id again replaces the indexed record.
#[tokio::test]
async fn test_store_upserts_by_id() {
    let harness = TestHarness::new();
    let store = harness.anime_store(1000, NO_AGE_FLUSH);

    store.store(&Anime::new("anidb-1", "Kaubooi")).await.unwrap();
    store.flush().await.unwrap();
    store
        .store(&Anime::new("anidb-1", "Cowboy Bebop").with_year(1998))
        .await
        .unwrap();
    store.flush().await.unwrap();

    let found = store.get("anidb-1").await.unwrap();
    assert_eq!(found.title, "Cowboy Bebop");
    assert_eq!(found.year, Some(1998));
    assert_eq!(store.num_docs().await.unwrap(), 1);
    assert!(store.search("kaubooi", 5).await.unwrap().is_empty());
}

/// Flush with nothing running does nothing; repeated flushes are fine.
#[tokio::test]
async fn test_flush_is_idempotent() {
    let backend = MemoryBackend::new();
    let store = memory_anime_store(backend.clone(), 10, NO_AGE_FLUSH);

    store.flush().await.unwrap();
    store.store(&Anime::new("anidb-1", "Trigun")).await.unwrap();
    store.flush().await.unwrap();
    store.flush().await.unwrap();

    assert_eq!(backend.submits_started(), 1);
    assert_eq!(store.health(), WorkerHealth::Idle);
}

/// Data survives closing the store and opening the same path again.
#[tokio::test]
async fn test_close_then_reopen_path() {
    let harness = TestHarness::new();

    let store = harness.anime_store(1000, NO_AGE_FLUSH);
    store.store(&Anime::new("anidb-1", "Trigun")).await.unwrap();
    store.close().await.unwrap();
    assert!(matches!(store.get("anidb-1").await, Err(IndexError::Closed)));
    drop(store);

    let reopened = harness.anime_store(1000, NO_AGE_FLUSH);
    assert_eq!(reopened.get("anidb-1").await.unwrap().title, "Trigun");
}

/// A backend failure stops the worker; the owner recreates the store.
#[tokio::test]
async fn test_worker_failure_requires_recreate() {
    let backend = MemoryBackend::new();
    let store = memory_anime_store(backend.clone(), 1, NO_AGE_FLUSH);
    backend.fail_next_submit();

    store.store(&Anime::new("anidb-1", "Trigun")).await.unwrap();
    for _ in 0..100 {
        if store.health().is_failed() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(store.health().is_failed());

    let err = store.store(&Anime::new("anidb-2", "Monster")).await.unwrap_err();
    assert!(matches!(err, IndexError::WorkerFailed(_)));
    assert!(store.flush().await.is_err());
    drop(store);

    let recreated = memory_anime_store(backend.clone(), 1, NO_AGE_FLUSH);
    recreated.store(&Anime::new("anidb-2", "Monster")).await.unwrap();
    recreated.flush().await.unwrap();
    assert_eq!(recreated.get("anidb-2").await.unwrap().title, "Monster");
    assert!(recreated.get("anidb-1").await.unwrap_err().is_not_found());
}

/// Callers bound reads with a timeout of their own.
#[tokio::test]
async fn test_reads_under_caller_deadline() {
    let harness = TestHarness::new();
    let store = harness.anime_store(1000, NO_AGE_FLUSH);
    store.store(&Anime::new("anidb-1", "Trigun")).await.unwrap();
    store.flush().await.unwrap();

    let found = tokio::time::timeout(Duration::from_secs(5), store.get("anidb-1"))
        .await
        .expect("get timed out")
        .unwrap();
    assert_eq!(found.title, "Trigun");
}
