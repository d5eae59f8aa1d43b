//! Core traits for the portfolio backend.
//!
//! The synchronization pipeline and the API depend on these seams instead of
//! concrete clients and repositories so each side can be exercised with
//! in-memory implementations.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::error::Result;
use crate::models::*;

// =============================================================================
// CONTENT SOURCES
// =============================================================================

/// Source of blog posts (WordPress in production).
#[async_trait]
pub trait PostSource: Send + Sync {
    /// All posts modified after `after`, oldest first.
    async fn posts_modified_after(&self, after: DateTime<Utc>) -> Result<Vec<Post>>;
}

// =============================================================================
// VECTOR STORE
// =============================================================================

/// A single object that the vector store refused during a batch insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertFailure {
    /// Position of the object in the submitted batch.
    pub index: usize,
    pub message: String,
}

/// Object storage operations the post synchronization needs.
#[async_trait]
pub trait VectorStore: Send + Sync {
    async fn collection_exists(&self, collection: &str) -> Result<bool>;

    /// Ids of every stored object whose `postId` equals `post_id`.
    async fn object_ids_for_post(&self, collection: &str, post_id: i64) -> Result<Vec<String>>;

    /// Insert objects built from `properties`; per-object failures are
    /// returned instead of aborting the batch.
    async fn insert_objects(
        &self,
        collection: &str,
        properties: Vec<JsonValue>,
    ) -> Result<Vec<InsertFailure>>;

    /// Delete objects by id, returning how many were removed.
    async fn delete_objects(&self, collection: &str, ids: &[String]) -> Result<usize>;
}

// =============================================================================
// REPOSITORIES
// =============================================================================

/// Persistence for synchronization progress records.
#[async_trait]
pub trait ProgressRepository: Send + Sync {
    async fn create(&self, status: SyncStatus, message: &str) -> Result<SynchronizationProgress>;

    async fn get(&self, id: i64) -> Result<Option<SynchronizationProgress>>;

    /// Apply a status update. Fails with `InvalidTransition` when the stored
    /// record is terminal or the status would move backwards, and with
    /// `ProgressNotFound` when the record does not exist.
    async fn update(
        &self,
        id: i64,
        status: SyncStatus,
        message: &str,
        step: i32,
    ) -> Result<SynchronizationProgress>;
}

/// Background job queue.
#[async_trait]
pub trait JobRepository: Send + Sync {
    /// Queue a job that becomes claimable after `delay`.
    async fn queue(
        &self,
        job_type: JobType,
        payload: Option<JsonValue>,
        delay: Duration,
    ) -> Result<Uuid>;

    /// Claim the next due pending job whose type is in `job_types`.
    /// An empty slice means any type.
    async fn claim_next_for_types(&self, job_types: &[JobType]) -> Result<Option<Job>>;

    async fn update_progress(&self, job_id: Uuid, percent: i32, message: Option<&str>)
        -> Result<()>;

    async fn complete(&self, job_id: Uuid, result: Option<JsonValue>) -> Result<()>;

    async fn fail(&self, job_id: Uuid, error: &str) -> Result<()>;

    async fn get(&self, job_id: Uuid) -> Result<Option<Job>>;
}
