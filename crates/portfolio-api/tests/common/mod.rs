//! Router harness: lazy database pool, in-memory progress and job queue,
//! and one mock server standing in for WordPress, Weaviate and GitHub.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use chrono::Utc;
use serde_json::Value as JsonValue;
use tower::ServiceExt;
use uuid::Uuid;
use wiremock::MockServer;

use portfolio_api::{build_schema, router, ApiConfig, AppState, ResponseCache};
use portfolio_auth::{Algorithm, DeviceTokenService, JwtConfig, JwtService};
use portfolio_clients::{
    GithubClient, GithubConfig, WeaviateClient, WeaviateConfig, WordPressClient, WordPressConfig,
};
use portfolio_core::{
    Error, Job, JobRepository, JobStatus, JobType, ProgressRepository, Result, Role, SyncStatus,
    SynchronizationProgress,
};
use portfolio_db::{create_lazy_pool, Database, PoolConfig};

#[derive(Default)]
pub struct MemoryProgress {
    pub records: Mutex<HashMap<i64, SynchronizationProgress>>,
}

#[async_trait]
impl ProgressRepository for MemoryProgress {
    async fn create(&self, status: SyncStatus, message: &str) -> Result<SynchronizationProgress> {
        let mut records = self.records.lock().unwrap();
        let now = Utc::now();
        let record = SynchronizationProgress {
            id: records.len() as i64 + 1,
            status,
            progress: 0,
            message: message.to_string(),
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
        Ok(record.clone())
    }
}

#[derive(Default)]
pub struct MemoryJobs {
    pub queued: Mutex<Vec<(Job, Duration)>>,
}

#[async_trait]
impl JobRepository for MemoryJobs {
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
            run_after: now,
            created_at: now,
            started_at: None,
            completed_at: None,
        };
        let id = job.id;
        self.queued.lock().unwrap().push((job, delay));
        Ok(id)
    }

    async fn claim_next_for_types(&self, _job_types: &[JobType]) -> Result<Option<Job>> {
        Ok(None)
    }

    async fn update_progress(&self, _: Uuid, _: i32, _: Option<&str>) -> Result<()> {
        Ok(())
    }

    async fn complete(&self, _: Uuid, _: Option<JsonValue>) -> Result<()> {
        Ok(())
    }

    async fn fail(&self, _: Uuid, _: &str) -> Result<()> {
        Ok(())
    }

    async fn get(&self, job_id: Uuid) -> Result<Option<Job>> {
        Ok(self
            .queued
            .lock()
            .unwrap()
            .iter()
            .find(|(j, _)| j.id == job_id)
            .map(|(j, _)| j.clone()))
    }
}

pub struct TestApp {
    pub router: Router,
    pub jwt: Arc<JwtService>,
    pub progress: Arc<MemoryProgress>,
    pub jobs: Arc<MemoryJobs>,
    pub upstream: MockServer,
}

impl TestApp {
    pub async fn new() -> Self {
        let upstream = MockServer::start().await;
        let addr = upstream.address();

        let pool = create_lazy_pool("postgres://localhost:1/portfolio_test", PoolConfig::default())
            .expect("lazy pool");
        let jwt = Arc::new(JwtService::new(
            JwtConfig::new(b"router-test-secret".to_vec(), Algorithm::HS256).unwrap(),
        ));
        let devices = Arc::new(DeviceTokenService::new(b"router-device-key".to_vec()).unwrap());
        let wordpress = Arc::new(
            WordPressClient::new(WordPressConfig {
                base_url: format!("{}/wp-json/wp/v2", upstream.uri()),
                user: "editor".into(),
                key: "secret".into(),
                timeout_seconds: 5,
            })
            .unwrap(),
        );
        let weaviate = Arc::new(
            WeaviateClient::new(WeaviateConfig {
                host: addr.ip().to_string(),
                port: addr.port(),
                scheme: "http".into(),
                token: None,
                timeout_seconds: 5,
            })
            .unwrap(),
        );
        let github = Arc::new(
            GithubClient::new(GithubConfig {
                api_url: format!("{}/graphql", upstream.uri()),
                token: "pat".into(),
                owner: "zuhairmhtb".into(),
                timeout_seconds: 5,
            })
            .unwrap(),
        );
        let progress = Arc::new(MemoryProgress::default());
        let jobs = Arc::new(MemoryJobs::default());

        let state = AppState {
            db: Database::new(pool),
            jwt: jwt.clone(),
            devices,
            wordpress,
            weaviate,
            github,
            progress: progress.clone(),
            jobs: jobs.clone(),
            cache: ResponseCache::disabled(),
            config: Arc::new(ApiConfig::default()),
            schema: build_schema(),
        };

        Self {
            router: router(state, vec!["http://localhost:4200".parse().unwrap()]),
            jwt,
            progress,
            jobs,
            upstream,
        }
    }

    pub fn token(&self, roles: Vec<Role>) -> String {
        self.jwt.issue_access("tester", roles).unwrap()
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Vec<u8>) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, body.to_vec())
    }

    pub async fn get_json(&self, uri: &str, token: Option<&str>) -> (StatusCode, JsonValue) {
        let mut builder = Request::builder().uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let (status, body) = self.send(builder.body(Body::empty()).unwrap()).await;
        (status, serde_json::from_slice(&body).unwrap_or(JsonValue::Null))
    }

    pub async fn post_json(
        &self,
        uri: &str,
        token: Option<&str>,
        body: JsonValue,
    ) -> (StatusCode, JsonValue) {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let (status, body) = self
            .send(builder.body(Body::from(body.to_string())).unwrap())
            .await;
        (status, serde_json::from_slice(&body).unwrap_or(JsonValue::Null))
    }

    /// Run a GraphQL document and return the response body.
    pub async fn graphql(&self, token: Option<&str>, query: &str, variables: JsonValue) -> JsonValue {
        let (status, body) = self
            .post_json(
                "/graphql/v1",
                token,
                serde_json::json!({"query": query, "variables": variables}),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        body
    }
}
