//! Post synchronization: WordPress posts into vector-store chunks.
//!
//! Each run reports its stage through a [`ProgressRepository`] record:
//!
//! | Step | Stage |
//! |------|-------|
//! | 1 | started |
//! | 2 | fetch posts from the source |
//! | 3 | posts found, store update begins |
//! | 4 | collect ids already stored for those posts |
//! | 5 | chunk and insert each post |
//! | 6 | delete the previously stored ids |
//! | 7 | re-read what is stored |
//!
//! Terminal updates use step `-1`, which always reports 100%.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use portfolio_core::{
    defaults, Error, Job, JobType, PostSource, ProgressRepository, Result, SyncPostsPayload,
    SyncStatus, VectorStore, WordChunker,
};

use crate::handler::{parse_payload, JobContext, JobHandler, JobResult};

const TERMINAL_STEP: i32 = -1;

/// Counters for one synchronization run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncSummary {
    /// Posts returned by the source.
    pub fetched: usize,
    /// Chunks accepted by the store.
    pub chunks_inserted: usize,
    /// Chunks the store refused.
    pub chunks_failed: usize,
    /// Previously stored objects removed.
    pub stale_deleted: usize,
    /// Posts that have at least one stored chunk after the run.
    pub synchronized: usize,
}

/// Message stored when a run fails.
pub fn failure_message(error: &Error) -> String {
    let preview: String = error
        .to_string()
        .chars()
        .take(defaults::SYNC_ERROR_PREVIEW_LEN)
        .collect();
    format!("Unable to complete synchronization. {preview}")
}

/// Runs the fetch → chunk → insert → delete pipeline.
pub struct PostSynchronizer {
    source: Arc<dyn PostSource>,
    store: Arc<dyn VectorStore>,
    progress: Arc<dyn ProgressRepository>,
    collection: String,
    chunker: WordChunker,
}

impl PostSynchronizer {
    pub fn new(
        source: Arc<dyn PostSource>,
        store: Arc<dyn VectorStore>,
        progress: Arc<dyn ProgressRepository>,
    ) -> Self {
        Self {
            source,
            store,
            progress,
            collection: defaults::POST_COLLECTION.to_string(),
            chunker: WordChunker::default(),
        }
    }

    pub fn with_collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = collection.into();
        self
    }

    pub fn with_max_words(mut self, max_words: usize) -> Self {
        self.chunker = WordChunker::new(max_words);
        self
    }

    /// Read `WEAVIATE_POST_COLLECTION` and `WEAVIATE_MAX_WORD_PER_POST`.
    pub fn configured_from_env(mut self) -> Self {
        if let Ok(collection) = std::env::var("WEAVIATE_POST_COLLECTION") {
            if !collection.is_empty() {
                self.collection = collection;
            }
        }
        if let Some(max_words) = std::env::var("WEAVIATE_MAX_WORD_PER_POST")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
        {
            self.chunker = WordChunker::new(max_words);
        }
        self
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Synchronize posts modified after `after`, reporting into the
    /// progress record `progress_id`. On error the record is marked failed
    /// and the error is returned.
    pub async fn run(&self, progress_id: i64, after: DateTime<Utc>) -> Result<SyncSummary> {
        let start = Instant::now();
        match self.synchronize(progress_id, after).await {
            Ok(summary) => {
                info!(
                    subsystem = "jobs",
                    component = "sync",
                    progress_id,
                    post_count = summary.fetched,
                    chunk_count = summary.chunks_inserted,
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Post synchronization finished"
                );
                Ok(summary)
            }
            Err(e) => {
                warn!(
                    subsystem = "jobs",
                    component = "sync",
                    progress_id,
                    error = %e,
                    "Post synchronization failed"
                );
                self.abandon(progress_id, &e).await;
                Err(e)
            }
        }
    }

    /// Mark `progress_id` failed with `error`. A record that is already
    /// terminal is left as it is.
    pub async fn abandon(&self, progress_id: i64, error: &Error) {
        let message = failure_message(error);
        if let Err(update_err) = self
            .progress
            .update(progress_id, SyncStatus::Failed, &message, TERMINAL_STEP)
            .await
        {
            warn!(
                progress_id,
                error = %update_err,
                "Could not record synchronization failure"
            );
        }
    }

    async fn step(&self, id: i64, message: &str, step: i32) -> Result<()> {
        self.progress
            .update(id, SyncStatus::InProgress, message, step)
            .await?;
        Ok(())
    }

    async fn synchronize(&self, id: i64, after: DateTime<Utc>) -> Result<SyncSummary> {
        let mut summary = SyncSummary::default();

        self.step(id, "Synchronization started", 1).await?;
        self.step(id, "Fetching posts from Wordpress", 2).await?;
        let posts = self.source.posts_modified_after(after).await?;
        summary.fetched = posts.len();

        if posts.is_empty() {
            self.progress
                .update(
                    id,
                    SyncStatus::Completed,
                    "No new posts to synchronize",
                    TERMINAL_STEP,
                )
                .await?;
            return Ok(summary);
        }

        self.step(
            id,
            &format!("Updating the database with {} new posts", posts.len()),
            3,
        )
        .await?;

        if !self.store.collection_exists(&self.collection).await? {
            return Err(Error::CollectionNotFound(self.collection.clone()));
        }

        // Ids stored before this run; they are replaced by the new chunks.
        self.step(id, "Fetching stale posts from the database", 4).await?;
        let post_ids: BTreeSet<i64> = posts.iter().map(|p| p.post_id).collect();
        let mut post_stale: BTreeMap<i64, Vec<String>> = BTreeMap::new();
        for post_id in &post_ids {
            let ids = self
                .store
                .object_ids_for_post(&self.collection, *post_id)
                .await?;
            post_stale.insert(*post_id, ids);
        }
        debug!(
            subsystem = "jobs",
            component = "sync",
            stale = post_stale.values().map(Vec::len).sum::<usize>(),
            "Collected stale objects"
        );
        // Stale ids of posts whose new chunks never reached the store.
        let mut kept: BTreeSet<String> = BTreeSet::new();

        let total = posts.len();
        for (i, post) in posts.iter().enumerate() {
            self.step(
                id,
                &format!(
                    "Splitting post content into multiple chunks and updating the database. {i} out of {total} completed."
                ),
                5,
            )
            .await?;

            let chunks = self.chunker.chunk(&post.content);
            let objects: Vec<_> = chunks.iter().map(|c| post.chunk_properties(c)).collect();
            let submitted = objects.len();
            if submitted == 0 {
                debug!(
                    subsystem = "jobs",
                    component = "sync",
                    post_id = post.post_id,
                    "Post has no content to store"
                );
                continue;
            }
            // A failed batch leaves this post's old chunks in place; the run
            // still replaces every other post.
            let failures = match self.store.insert_objects(&self.collection, objects).await {
                Ok(failures) => failures,
                Err(e) => {
                    warn!(
                        subsystem = "jobs",
                        component = "sync",
                        post_id = post.post_id,
                        chunk_count = submitted,
                        error = %e,
                        "Chunk batch insert failed"
                    );
                    summary.chunks_failed += submitted;
                    kept.extend(
                        post_stale
                            .get(&post.post_id)
                            .into_iter()
                            .flatten()
                            .cloned(),
                    );
                    continue;
                }
            };
            for failure in &failures {
                warn!(
                    subsystem = "jobs",
                    component = "sync",
                    post_id = post.post_id,
                    sequence = failure.index + 1,
                    error = %failure.message,
                    "Chunk insert failed"
                );
            }
            summary.chunks_failed += failures.len();
            summary.chunks_inserted += submitted - failures.len().min(submitted);
        }

        self.step(id, "Deleting stale posts", 6).await?;
        let stale: BTreeSet<String> = post_stale
            .into_values()
            .flatten()
            .filter(|id| !kept.contains(id))
            .collect();
        if !stale.is_empty() {
            let ids: Vec<String> = stale.into_iter().collect();
            summary.stale_deleted = self.store.delete_objects(&self.collection, &ids).await?;
        }

        self.step(id, "Fetching new posts", 7).await?;
        for post_id in &post_ids {
            if !self
                .store
                .object_ids_for_post(&self.collection, *post_id)
                .await?
                .is_empty()
            {
                summary.synchronized += 1;
            }
        }

        self.progress
            .update(
                id,
                SyncStatus::Completed,
                &format!("Successfully synchronized {} posts", summary.synchronized),
                TERMINAL_STEP,
            )
            .await?;
        Ok(summary)
    }
}

/// Runs [`PostSynchronizer`] for `post_synchronization` jobs.
pub struct PostSynchronizationHandler {
    synchronizer: Arc<PostSynchronizer>,
}

impl PostSynchronizationHandler {
    pub fn new(synchronizer: Arc<PostSynchronizer>) -> Self {
        Self { synchronizer }
    }
}

#[async_trait]
impl JobHandler for PostSynchronizationHandler {
    fn job_type(&self) -> JobType {
        JobType::PostSynchronization
    }

    async fn execute(&self, ctx: JobContext) -> JobResult {
        let payload: SyncPostsPayload = match ctx.parse_payload() {
            Ok(p) => p,
            Err(e) => return JobResult::Failed(e),
        };

        ctx.report_progress(0, Some("Synchronization started")).await;
        match self
            .synchronizer
            .run(payload.progress_id, payload.modified_after)
            .await
        {
            Ok(summary) => {
                ctx.report_progress(100, Some("Synchronization finished"))
                    .await;
                JobResult::Success(serde_json::to_value(summary).ok())
            }
            Err(e) => JobResult::Failed(e.to_string()),
        }
    }

    /// The run was cut off mid-pipeline; close its progress record.
    async fn on_abort(&self, job: &Job, reason: &str) {
        match parse_payload::<SyncPostsPayload>(job) {
            Ok(payload) => {
                self.synchronizer
                    .abandon(payload.progress_id, &Error::Job(reason.to_string()))
                    .await
            }
            Err(e) => warn!(job_id = %job.id, error = %e, "Aborted job has no progress record"),
        }
    }
}
