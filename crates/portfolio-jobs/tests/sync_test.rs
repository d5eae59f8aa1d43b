//! Synchronization pipeline against in-memory source, store and progress.

mod common;

use std::sync::Arc;

use chrono::Utc;
use common::{post, FakeProgress, FakeSource, FakeStore};
use portfolio_core::{chunk_content, Error, ProgressRepository, SyncStatus};
use portfolio_jobs::{JobContext, JobHandler, JobResult, PostSynchronizationHandler, PostSynchronizer};

const LONG: &str = "Rust is fast. Rust is safe. Rust has traits and enums. \
                    Ownership keeps memory in check. Lifetimes name borrows.";

struct Harness {
    store: Arc<FakeStore>,
    progress: Arc<FakeProgress>,
    sync: PostSynchronizer,
}

fn harness(source: FakeSource, store: FakeStore) -> Harness {
    let store = Arc::new(store);
    let progress = Arc::new(FakeProgress::default());
    let sync = PostSynchronizer::new(Arc::new(source), store.clone(), progress.clone())
        .with_max_words(5);
    Harness {
        store,
        progress,
        sync,
    }
}

async fn pending(progress: &FakeProgress) -> i64 {
    progress
        .create(SyncStatus::Pending, "Synchronization request queued")
        .await
        .unwrap()
        .id
}

#[tokio::test]
async fn test_replaces_stored_chunks_of_synchronized_posts() {
    let h = harness(
        FakeSource {
            posts: vec![post(1, LONG), post(2, "Short post.")],
            fail: false,
        },
        FakeStore::default(),
    );
    h.store.seed(1, 2);
    h.store.seed(3, 1);
    let old_ids = h.store.ids_for(1);
    let id = pending(&h.progress).await;

    let summary = h.sync.run(id, Utc::now()).await.unwrap();

    let expected_chunks = chunk_content(LONG, 5).len();
    assert!(expected_chunks > 1);
    assert_eq!(summary.fetched, 2);
    assert_eq!(summary.stale_deleted, 2);
    assert_eq!(summary.chunks_inserted, expected_chunks + 1);
    assert_eq!(summary.synchronized, 2);

    let new_ids = h.store.ids_for(1);
    assert!(new_ids.iter().all(|id| !old_ids.contains(id)));
    let sequences = h.store.sequences_for(1);
    assert_eq!(sequences, (1..=expected_chunks as u64).collect::<Vec<_>>());
    assert_eq!(h.store.ids_for(2).len(), 1);
    // Posts outside the run are untouched.
    assert_eq!(h.store.ids_for(3).len(), 1);

    let record = h.progress.record(id);
    assert_eq!(record.status, SyncStatus::Completed);
    assert_eq!(record.progress, 100);
    assert_eq!(record.message, "Successfully synchronized 2 posts");

    assert_eq!(
        h.progress.messages(),
        vec![
            "Synchronization started",
            "Fetching posts from Wordpress",
            "Updating the database with 2 new posts",
            "Fetching stale posts from the database",
            "Splitting post content into multiple chunks and updating the database. 0 out of 2 completed.",
            "Splitting post content into multiple chunks and updating the database. 1 out of 2 completed.",
            "Deleting stale posts",
            "Fetching new posts",
            "Successfully synchronized 2 posts",
        ]
    );
}

#[tokio::test]
async fn test_progress_percent_follows_steps() {
    let h = harness(
        FakeSource {
            posts: vec![post(1, "One.")],
            fail: false,
        },
        FakeStore::default(),
    );
    let id = pending(&h.progress).await;
    h.sync.run(id, Utc::now()).await.unwrap();

    let percents: Vec<i32> = h
        .progress
        .history
        .lock()
        .unwrap()
        .iter()
        .map(|(_, _, p)| *p)
        .collect();
    assert_eq!(percents, vec![10, 20, 30, 40, 50, 60, 70, 100]);
}

#[tokio::test]
async fn test_no_posts_completes_without_touching_store() {
    let h = harness(
        FakeSource {
            posts: vec![],
            fail: false,
        },
        FakeStore::default(),
    );
    h.store.seed(1, 1);
    let id = pending(&h.progress).await;

    let summary = h.sync.run(id, Utc::now()).await.unwrap();
    assert_eq!(summary.fetched, 0);
    assert_eq!(h.store.ids_for(1).len(), 1);

    let record = h.progress.record(id);
    assert_eq!(record.status, SyncStatus::Completed);
    assert_eq!(record.message, "No new posts to synchronize");
    assert_eq!(record.progress, 100);
}

#[tokio::test]
async fn test_missing_collection_fails_the_run() {
    let h = harness(
        FakeSource {
            posts: vec![post(1, LONG)],
            fail: false,
        },
        FakeStore {
            missing: true,
            ..Default::default()
        },
    );
    let id = pending(&h.progress).await;

    let err = h.sync.run(id, Utc::now()).await.unwrap_err();
    assert!(matches!(err, Error::CollectionNotFound(_)));

    let record = h.progress.record(id);
    assert_eq!(record.status, SyncStatus::Failed);
    assert_eq!(record.progress, 100);
    assert_eq!(
        record.message,
        "Unable to complete synchronization. Collection not found: Post"
    );
}

#[tokio::test]
async fn test_source_error_fails_the_run() {
    let h = harness(
        FakeSource {
            posts: vec![],
            fail: true,
        },
        FakeStore::default(),
    );
    let id = pending(&h.progress).await;

    assert!(h.sync.run(id, Utc::now()).await.is_err());
    let record = h.progress.record(id);
    assert_eq!(record.status, SyncStatus::Failed);
    assert!(record
        .message
        .starts_with("Unable to complete synchronization. Upstream error"));
}

#[tokio::test]
async fn test_rejected_chunks_do_not_abort() {
    let h = harness(
        FakeSource {
            posts: vec![post(1, LONG)],
            fail: false,
        },
        FakeStore {
            reject_sequence: Some(2),
            ..Default::default()
        },
    );
    let id = pending(&h.progress).await;

    let summary = h.sync.run(id, Utc::now()).await.unwrap();
    assert_eq!(summary.chunks_failed, 1);
    assert!(!h.store.sequences_for(1).contains(&2));
    assert_eq!(h.progress.record(id).status, SyncStatus::Completed);
}

#[tokio::test]
async fn test_failed_batch_keeps_that_posts_chunks_and_replaces_the_rest() {
    let h = harness(
        FakeSource {
            posts: vec![post(1, LONG), post(2, "Second post.")],
            fail: false,
        },
        FakeStore {
            fail_batch_for: Some(2),
            ..Default::default()
        },
    );
    h.store.seed(1, 1);
    h.store.seed(2, 1);
    let old_post_two = h.store.ids_for(2);
    let id = pending(&h.progress).await;

    let summary = h.sync.run(id, Utc::now()).await.unwrap();
    let expected_chunks = chunk_content(LONG, 5).len();
    assert_eq!(summary.chunks_inserted, expected_chunks);
    assert_eq!(summary.chunks_failed, 1);
    assert_eq!(summary.stale_deleted, 1);
    assert_eq!(summary.synchronized, 2);

    assert_eq!(
        h.store.sequences_for(1),
        (1..=expected_chunks as u64).collect::<Vec<_>>()
    );
    assert_eq!(h.store.ids_for(2), old_post_two);
    assert_eq!(h.progress.record(id).status, SyncStatus::Completed);
}

#[tokio::test]
async fn test_empty_post_is_fetched_but_not_synchronized() {
    let h = harness(
        FakeSource {
            posts: vec![post(1, "   "), post(2, "Kept.")],
            fail: false,
        },
        FakeStore::default(),
    );
    h.store.seed(1, 2);
    let id = pending(&h.progress).await;

    let summary = h.sync.run(id, Utc::now()).await.unwrap();
    assert_eq!(summary.fetched, 2);
    assert_eq!(summary.stale_deleted, 2);
    assert_eq!(summary.chunks_inserted, 1);
    assert_eq!(summary.synchronized, 1);
    assert!(h.store.ids_for(1).is_empty());

    let record = h.progress.record(id);
    assert_eq!(record.status, SyncStatus::Completed);
    assert_eq!(record.message, "Successfully synchronized 1 posts");
}

#[tokio::test]
async fn test_terminal_record_is_not_reopened() {
    let h = harness(
        FakeSource {
            posts: vec![post(1, LONG)],
            fail: false,
        },
        FakeStore::default(),
    );
    let id = pending(&h.progress).await;
    h.progress
        .update(id, SyncStatus::Completed, "done", -1)
        .await
        .unwrap();

    let err = h.sync.run(id, Utc::now()).await.unwrap_err();
    assert!(matches!(err, Error::InvalidTransition { .. }));
    let record = h.progress.record(id);
    assert_eq!(record.status, SyncStatus::Completed);
    assert_eq!(record.message, "done");
    assert!(h.store.ids_for(1).is_empty());
}

#[tokio::test]
async fn test_custom_collection_name() {
    let h = harness(
        FakeSource {
            posts: vec![],
            fail: false,
        },
        FakeStore::default(),
    );
    let sync = h.sync.with_collection("Article");
    assert_eq!(sync.collection(), "Article");
}

// =============================================================================
// HANDLER
// =============================================================================

fn job(payload: serde_json::Value) -> portfolio_core::Job {
    let now = Utc::now();
    portfolio_core::Job {
        id: uuid::Uuid::now_v7(),
        job_type: portfolio_core::JobType::PostSynchronization,
        status: portfolio_core::JobStatus::Running,
        payload: Some(payload),
        result: None,
        error_message: None,
        progress_percent: 0,
        progress_message: None,
        run_after: now,
        created_at: now,
        started_at: Some(now),
        completed_at: None,
    }
}

#[tokio::test]
async fn test_handler_runs_synchronization() {
    let h = harness(
        FakeSource {
            posts: vec![post(5, "Hello there.")],
            fail: false,
        },
        FakeStore::default(),
    );
    let id = pending(&h.progress).await;
    let progress = h.progress.clone();
    let handler = PostSynchronizationHandler::new(Arc::new(h.sync));

    let payload = serde_json::json!({
        "progress_id": id,
        "modified_after": "2024-01-01T00:00:00Z",
    });
    match handler.execute(JobContext::new(job(payload))).await {
        JobResult::Success(Some(summary)) => assert_eq!(summary["synchronized"], 1),
        other => panic!("unexpected result: {other:?}"),
    }
    assert_eq!(progress.record(id).status, SyncStatus::Completed);
}

#[tokio::test]
async fn test_handler_rejects_bad_payload() {
    let h = harness(
        FakeSource {
            posts: vec![],
            fail: false,
        },
        FakeStore::default(),
    );
    let handler = PostSynchronizationHandler::new(Arc::new(h.sync));
    let result = handler
        .execute(JobContext::new(job(serde_json::json!({"progress_id": "x"}))))
        .await;
    assert!(matches!(result, JobResult::Failed(_)));
}
