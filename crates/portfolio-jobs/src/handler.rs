//! Job handlers and the context they run with.

use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use tokio::sync::broadcast;
use tracing::warn;

use portfolio_core::{Job, JobRepository, JobType};

use crate::worker::WorkerEvent;

/// What a handler gets for one claimed job.
///
/// Progress goes to the job row when a repository is attached and to the
/// worker's event channel when one is attached. A bare context drops it.
pub struct JobContext {
    pub job: Job,
    jobs: Option<Arc<dyn JobRepository>>,
    events: Option<broadcast::Sender<WorkerEvent>>,
}

impl JobContext {
    pub fn new(job: Job) -> Self {
        Self {
            job,
            jobs: None,
            events: None,
        }
    }

    pub fn with_jobs(mut self, jobs: Arc<dyn JobRepository>) -> Self {
        self.jobs = Some(jobs);
        self
    }

    pub fn with_events(mut self, events: broadcast::Sender<WorkerEvent>) -> Self {
        self.events = Some(events);
        self
    }

    /// Record `percent` (clamped to 0..=100) on the job row and announce it.
    /// A failed write is logged; the job keeps running.
    pub async fn report_progress(&self, percent: i32, message: Option<&str>) {
        let percent = percent.clamp(0, 100);
        if let Some(jobs) = &self.jobs {
            if let Err(e) = jobs.update_progress(self.job.id, percent, message).await {
                warn!(job_id = %self.job.id, error = %e, "Could not record job progress");
            }
        }
        if let Some(events) = &self.events {
            let _ = events.send(WorkerEvent::JobProgress {
                job_id: self.job.id,
                percent,
                message: message.map(String::from),
            });
        }
    }

    /// Deserialize the payload into `T`.
    pub fn parse_payload<T: DeserializeOwned>(&self) -> Result<T, String> {
        parse_payload(&self.job)
    }
}

/// Deserialize a job's payload into `T`.
pub fn parse_payload<T: DeserializeOwned>(job: &Job) -> Result<T, String> {
    let payload = job
        .payload
        .as_ref()
        .ok_or_else(|| "Job has no payload".to_string())?;
    serde_json::from_value(payload.clone()).map_err(|e| format!("Invalid job payload: {e}"))
}

/// Result of job execution.
#[derive(Debug)]
pub enum JobResult {
    /// Job completed successfully with optional result data.
    Success(Option<JsonValue>),
    /// Job failed with an error message.
    Failed(String),
}

#[async_trait]
pub trait JobHandler: Send + Sync {
    /// The job type this handler processes.
    fn job_type(&self) -> JobType;

    async fn execute(&self, ctx: JobContext) -> JobResult;

    /// Called after `execute` was cut short by the worker (timeout or
    /// panic). Anything the job owns outside the queue must be settled here.
    async fn on_abort(&self, _job: &Job, _reason: &str) {}
}
