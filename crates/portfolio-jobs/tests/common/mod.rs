//! In-memory implementations of the pipeline seams.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use portfolio_core::{
    Error, InsertFailure, Job, JobRepository, JobStatus, JobType, Post, PostSource,
    ProgressRepository, Result, SyncStatus, SynchronizationProgress, VectorStore,
};

pub fn post(post_id: i64, content: &str) -> Post {
    Post {
        id: String::new(),
        post_id,
        title: format!("Post {post_id}"),
        excerpt: "excerpt".into(),
        content: content.into(),
        date: Utc::now(),
        author: "author".into(),
        categories: Some("Rust".into()),
        tags: None,
        url: Some(format!("https://blog.example.com/?p={post_id}")),
    }
}

// -----------------------------------------------------------------------------

pub struct FakeSource {
    pub posts: Vec<Post>,
    pub fail: bool,
}

#[async_trait]
impl PostSource for FakeSource {
    async fn posts_modified_after(&self, _after: DateTime<Utc>) -> Result<Vec<Post>> {
        if self.fail {
            return Err(Error::Upstream("wordpress unreachable".into()));
        }
        Ok(self.posts.clone())
    }
}

/// Answers only after `delay`.
pub struct SlowSource {
    pub delay: Duration,
}

#[async_trait]
impl PostSource for SlowSource {
    async fn posts_modified_after(&self, _after: DateTime<Utc>) -> Result<Vec<Post>> {
        tokio::time::sleep(self.delay).await;
        Ok(Vec::new())
    }
}

// -----------------------------------------------------------------------------

#[derive(Default)]
pub struct FakeStore {
    pub missing: bool,
    /// Reject chunks with this `postSequence`.
    pub reject_sequence: Option<u64>,
    /// Fail the whole batch request for this post.
    pub fail_batch_for: Option<i64>,
    pub objects: Mutex<Vec<(String, JsonValue)>>,
    pub next_id: Mutex<u64>,
}

impl FakeStore {
    pub fn seed(&self, post_id: i64, count: usize) {
        for _ in 0..count {
            let id = self.fresh_id();
            self.objects
                .lock()
                .unwrap()
                .push((id, serde_json::json!({"postId": post_id.to_string(), "postSequence": 1})));
        }
    }

    fn fresh_id(&self) -> String {
        let mut next = self.next_id.lock().unwrap();
        *next += 1;
        format!("obj-{next}")
    }

    pub fn ids_for(&self, post_id: i64) -> Vec<String> {
        let key = post_id.to_string();
        self.objects
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, p)| p["postId"] == key.as_str())
            .map(|(id, _)| id.clone())
            .collect()
    }

    pub fn sequences_for(&self, post_id: i64) -> Vec<u64> {
        let key = post_id.to_string();
        self.objects
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, p)| p["postId"] == key.as_str())
            .filter_map(|(_, p)| p["postSequence"].as_u64())
            .collect()
    }
}

#[async_trait]
impl VectorStore for FakeStore {
    async fn collection_exists(&self, _collection: &str) -> Result<bool> {
        Ok(!self.missing)
    }

    async fn object_ids_for_post(&self, _collection: &str, post_id: i64) -> Result<Vec<String>> {
        Ok(self.ids_for(post_id))
    }

    async fn insert_objects(
        &self,
        _collection: &str,
        properties: Vec<JsonValue>,
    ) -> Result<Vec<InsertFailure>> {
        if let Some(post_id) = self.fail_batch_for {
            let key = post_id.to_string();
            if properties.iter().any(|p| p["postId"] == key.as_str()) {
                return Err(Error::Upstream("batch request failed".into()));
            }
        }
        let mut failures = Vec::new();
        for (index, props) in properties.into_iter().enumerate() {
            if self.reject_sequence.is_some()
                && props["postSequence"].as_u64() == self.reject_sequence
            {
                failures.push(InsertFailure {
                    index,
                    message: "rejected".into(),
                });
                continue;
            }
            let id = self.fresh_id();
            self.objects.lock().unwrap().push((id, props));
        }
        Ok(failures)
    }

    async fn delete_objects(&self, _collection: &str, ids: &[String]) -> Result<usize> {
        let mut objects = self.objects.lock().unwrap();
        let before = objects.len();
        objects.retain(|(id, _)| !ids.contains(id));
        Ok(before - objects.len())
    }
}

// -----------------------------------------------------------------------------

#[derive(Default)]
pub struct FakeProgress {
    pub records: Mutex<HashMap<i64, SynchronizationProgress>>,
    pub history: Mutex<Vec<(SyncStatus, String, i32)>>,
}

impl FakeProgress {
    pub fn messages(&self) -> Vec<String> {
        self.history
            .lock()
            .unwrap()
            .iter()
            .map(|(_, m, _)| m.clone())
            .collect()
    }

    pub fn record(&self, id: i64) -> SynchronizationProgress {
        self.records.lock().unwrap()[&id].clone()
    }
}

#[async_trait]
impl ProgressRepository for FakeProgress {
    async fn create(&self, status: SyncStatus, message: &str) -> Result<SynchronizationProgress> {
        let mut records = self.records.lock().unwrap();
        let now = Utc::now();
        let record = SynchronizationProgress {
            id: records.len() as i64 + 1,
            status,
            progress: 0,
            message: SynchronizationProgress::truncate_message(message),
            created_at: now,
            updated_at: now,
        };
        records.insert(record.id, record.clone());
        Ok(record)
    }

    async fn get(&self, id: i64) -> Result<Option<SynchronizationProgress>> {
        Ok(self.records.lock().unwrap().get(&id).cloned())
    }

    async fn update(
        &self,
        id: i64,
        status: SyncStatus,
        message: &str,
        step: i32,
    ) -> Result<SynchronizationProgress> {
        let mut records = self.records.lock().unwrap();
        let record = records.get_mut(&id).ok_or(Error::ProgressNotFound(id))?;
        record.apply(status, message, step)?;
        self.history
            .lock()
            .unwrap()
            .push((record.status, record.message.clone(), record.progress));
        Ok(record.clone())
    }
}

// -----------------------------------------------------------------------------

#[derive(Default)]
pub struct FakeJobs {
    pub jobs: Mutex<Vec<Job>>,
}

#[async_trait]
impl JobRepository for FakeJobs {
    async fn queue(
        &self,
        job_type: JobType,
        payload: Option<JsonValue>,
        delay: Duration,
    ) -> Result<Uuid> {
        let now = Utc::now();
        let job = Job {
            id: Uuid::now_v7(),
            job_type,
            status: JobStatus::Pending,
            payload,
            result: None,
            error_message: None,
            progress_percent: 0,
            progress_message: None,
            run_after: now + chrono::Duration::from_std(delay).unwrap(),
            created_at: now,
            started_at: None,
            completed_at: None,
        };
        let id = job.id;
        self.jobs.lock().unwrap().push(job);
        Ok(id)
    }

    async fn claim_next_for_types(&self, job_types: &[JobType]) -> Result<Option<Job>> {
        let now = Utc::now();
        let mut jobs = self.jobs.lock().unwrap();
        let next = jobs.iter_mut().find(|j| {
            j.status == JobStatus::Pending
                && j.run_after <= now
                && (job_types.is_empty() || job_types.contains(&j.job_type))
        });
        Ok(next.map(|j| {
            j.status = JobStatus::Running;
            j.started_at = Some(now);
            j.clone()
        }))
    }

    async fn update_progress(
        &self,
        job_id: Uuid,
        percent: i32,
        message: Option<&str>,
    ) -> Result<()> {
        if let Some(j) = self.jobs.lock().unwrap().iter_mut().find(|j| j.id == job_id) {
            j.progress_percent = percent;
            j.progress_message = message.map(String::from);
        }
        Ok(())
    }

    async fn complete(&self, job_id: Uuid, result: Option<JsonValue>) -> Result<()> {
        if let Some(j) = self.jobs.lock().unwrap().iter_mut().find(|j| j.id == job_id) {
            j.status = JobStatus::Completed;
            j.result = result;
            j.completed_at = Some(Utc::now());
        }
        Ok(())
    }

    async fn fail(&self, job_id: Uuid, error: &str) -> Result<()> {
        if let Some(j) = self.jobs.lock().unwrap().iter_mut().find(|j| j.id == job_id) {
            j.status = JobStatus::Failed;
            j.error_message = Some(error.to_string());
            j.completed_at = Some(Utc::now());
        }
        Ok(())
    }

    async fn get(&self, job_id: Uuid) -> Result<Option<Job>> {
        Ok(self
            .jobs
            .lock()
            .unwrap()
            .iter()
            .find(|j| j.id == job_id)
            .cloned())
    }
}
