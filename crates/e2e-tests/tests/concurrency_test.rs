//! Reader isolation E2E tests.
//!
//! A slow in-memory backend applies a batch one document at a time. Queries
//! issued while such a flush is in flight must see the whole batch or none
//! of it.

use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;

use catalog_search::MemoryBackend;
use e2e_tests::{create_test_anime, memory_anime_store};

const BATCH: usize = 5;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_search_never_sees_partial_batch() {
    let backend = MemoryBackend::new().with_per_doc_delay(Duration::from_millis(100));
    let store = Arc::new(memory_anime_store(
        backend.clone(),
        BATCH,
        Duration::from_secs(600),
    ));

    // Open the reader on the empty index
    assert!(store.get("anidb-0").await.unwrap_err().is_not_found());

    // The last store fills the buffer and triggers the flush
    for record in create_test_anime(BATCH, "Gundam") {
        store.store(&record).await.unwrap();
    }
    backend.submit_started().await;

    // First document in, the rest still pending
    backend.doc_applied().await;
    let committed = backend.committed_len();
    assert!(committed > 0 && committed < BATCH, "committed {}", committed);

    let mut searches = Vec::new();
    for _ in 0..8 {
        let store = store.clone();
        searches.push(tokio::spawn(async move {
            store.search("gundam", 10).await.unwrap().len()
        }));
    }
    for search in searches {
        let seen = search.await.unwrap();
        assert!(seen == 0 || seen == BATCH, "saw partial batch of {}", seen);
    }

    assert_eq!(backend.submits_finished(), 1);
    assert_eq!(store.search("gundam", 10).await.unwrap().len(), BATCH);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_stores_all_land() {
    let backend = MemoryBackend::new();
    let store = Arc::new(memory_anime_store(backend.clone(), 7, Duration::from_secs(600)));

    let mut writers = Vec::new();
    for chunk in create_test_anime(40, "Macross").chunks(10) {
        let store = store.clone();
        let chunk = chunk.to_vec();
        writers.push(tokio::spawn(async move {
            for record in &chunk {
                store.store(record).await.unwrap();
            }
        }));
    }
    for writer in writers {
        writer.await.unwrap();
    }

    store.flush().await.unwrap();
    assert_eq!(store.num_docs().await.unwrap(), 40);
    assert_eq!(backend.committed_len(), 40);
}
