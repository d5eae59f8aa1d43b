//! Queue worker: claims due jobs and runs each one on its own task.
//!
//! Every claimed job ends in `complete` or `fail` on the queue. A handler
//! that overruns `job_timeout_secs` or panics is cut off, then given
//! [`JobHandler::on_abort`] so the work it owns (the synchronization
//! progress record for post jobs) reaches a terminal state as well.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinSet;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use portfolio_core::{defaults, Error, Job, JobRepository, JobType, Result};

use crate::handler::{JobContext, JobHandler, JobResult};

type Handlers = Arc<HashMap<JobType, Arc<dyn JobHandler>>>;

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub poll_interval_ms: u64,
    pub max_concurrent_jobs: usize,
    pub job_timeout_secs: u64,
    pub enabled: bool,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: defaults::JOB_POLL_INTERVAL_MS,
            max_concurrent_jobs: defaults::JOB_MAX_CONCURRENT,
            job_timeout_secs: defaults::JOB_TIMEOUT_SECS,
            enabled: true,
        }
    }
}

impl WorkerConfig {
    /// | Variable | Default |
    /// |----------|---------|
    /// | `JOB_WORKER_ENABLED` | `true` |
    /// | `JOB_MAX_CONCURRENT` | `2` |
    /// | `JOB_POLL_INTERVAL_MS` | `1000` |
    /// | `JOB_TIMEOUT_SECS` | `1800` |
    pub fn from_env() -> Self {
        fn var<T: std::str::FromStr>(name: &str) -> Option<T> {
            std::env::var(name).ok().and_then(|v| v.parse().ok())
        }

        let base = Self::default();
        Self {
            enabled: std::env::var("JOB_WORKER_ENABLED")
                .map(|v| v != "false" && v != "0")
                .unwrap_or(true),
            max_concurrent_jobs: var::<usize>("JOB_MAX_CONCURRENT")
                .unwrap_or(base.max_concurrent_jobs)
                .max(1),
            poll_interval_ms: var("JOB_POLL_INTERVAL_MS").unwrap_or(base.poll_interval_ms),
            job_timeout_secs: var::<u64>("JOB_TIMEOUT_SECS")
                .filter(|s| *s > 0)
                .unwrap_or(base.job_timeout_secs),
        }
    }

    pub fn with_poll_interval(mut self, ms: u64) -> Self {
        self.poll_interval_ms = ms;
        self
    }

    pub fn with_max_concurrent(mut self, max: usize) -> Self {
        self.max_concurrent_jobs = max.max(1);
        self
    }

    pub fn with_job_timeout(mut self, secs: u64) -> Self {
        self.job_timeout_secs = secs;
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

#[derive(Debug, Clone)]
pub enum WorkerEvent {
    JobStarted { job_id: Uuid, job_type: JobType },
    JobProgress {
        job_id: Uuid,
        percent: i32,
        message: Option<String>,
    },
    JobCompleted { job_id: Uuid, job_type: JobType },
    JobFailed {
        job_id: Uuid,
        job_type: JobType,
        error: String,
    },
    WorkerStarted,
    WorkerStopped,
}

/// Returned by [`JobWorker::start`].
pub struct WorkerHandle {
    shutdown_tx: mpsc::Sender<()>,
    event_rx: broadcast::Receiver<WorkerEvent>,
}

impl WorkerHandle {
    /// Stop claiming; jobs already running are allowed to finish.
    pub async fn shutdown(&self) -> Result<()> {
        self.shutdown_tx
            .send(())
            .await
            .map_err(|_| Error::Internal("Job worker already stopped".into()))
    }

    pub fn events(&self) -> broadcast::Receiver<WorkerEvent> {
        self.event_rx.resubscribe()
    }
}

pub struct JobWorker {
    jobs: Arc<dyn JobRepository>,
    config: WorkerConfig,
    handlers: Handlers,
    event_tx: broadcast::Sender<WorkerEvent>,
}

impl JobWorker {
    pub fn events(&self) -> broadcast::Receiver<WorkerEvent> {
        self.event_tx.subscribe()
    }

    pub fn start(self) -> WorkerHandle {
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        let event_rx = self.event_tx.subscribe();
        tokio::spawn(self.run(shutdown_rx));
        WorkerHandle {
            shutdown_tx,
            event_rx,
        }
    }

    /// Keeps up to `max_concurrent_jobs` jobs in flight. A finished job
    /// frees its slot immediately; an empty queue is polled every
    /// `poll_interval_ms`.
    async fn run(self, mut shutdown_rx: mpsc::Receiver<()>) {
        if !self.config.enabled {
            info!(subsystem = "jobs", "Job worker is disabled, not starting");
            return;
        }

        let job_types: Vec<JobType> = self.handlers.keys().copied().collect();
        info!(
            subsystem = "jobs",
            poll_interval_ms = self.config.poll_interval_ms,
            max_concurrent = self.config.max_concurrent_jobs,
            job_types = ?job_types,
            "Job worker started"
        );
        let _ = self.event_tx.send(WorkerEvent::WorkerStarted);

        let poll_interval = Duration::from_millis(self.config.poll_interval_ms);
        let mut running: JoinSet<()> = JoinSet::new();

        loop {
            while running.len() < self.config.max_concurrent_jobs {
                let Some(job) = self.claim(&job_types).await else {
                    break;
                };
                running.spawn(self.runner().execute(job));
            }

            tokio::select! {
                Some(()) = shutdown_rx.recv() => {
                    info!(subsystem = "jobs", "Job worker received shutdown signal");
                    break;
                }
                Some(joined) = running.join_next(), if !running.is_empty() => {
                    if let Err(e) = joined {
                        error!(subsystem = "jobs", error = ?e, "Job runner task failed");
                    }
                }
                _ = sleep(poll_interval) => {}
            }
        }

        while let Some(joined) = running.join_next().await {
            if let Err(e) = joined {
                error!(subsystem = "jobs", error = ?e, "Job runner task failed");
            }
        }
        let _ = self.event_tx.send(WorkerEvent::WorkerStopped);
        info!(subsystem = "jobs", "Job worker stopped");
    }

    async fn claim(&self, job_types: &[JobType]) -> Option<Job> {
        if job_types.is_empty() {
            return None;
        }
        match self.jobs.claim_next_for_types(job_types).await {
            Ok(job) => job,
            Err(e) => {
                error!(subsystem = "jobs", error = %e, "Failed to claim job");
                None
            }
        }
    }

    fn runner(&self) -> JobRunner {
        JobRunner {
            jobs: self.jobs.clone(),
            handlers: self.handlers.clone(),
            event_tx: self.event_tx.clone(),
            timeout: Duration::from_secs(self.config.job_timeout_secs),
        }
    }
}

/// Runs one claimed job and settles it on the queue.
struct JobRunner {
    jobs: Arc<dyn JobRepository>,
    handlers: Handlers,
    event_tx: broadcast::Sender<WorkerEvent>,
    timeout: Duration,
}

impl JobRunner {
    async fn execute(self, job: Job) {
        let start = Instant::now();
        let job_id = job.id;
        let job_type = job.job_type;

        info!(
            subsystem = "jobs",
            job_id = %job_id,
            job_type = job_type.as_str(),
            "Processing job"
        );
        let _ = self
            .event_tx
            .send(WorkerEvent::JobStarted { job_id, job_type });

        let result = match self.handlers.get(&job_type).cloned() {
            Some(handler) => self.supervise(handler, job).await,
            None => {
                warn!(subsystem = "jobs", job_type = job_type.as_str(), "No handler registered for job type");
                JobResult::Failed(format!("No handler for job type: {}", job_type.as_str()))
            }
        };

        let duration_ms = start.elapsed().as_millis() as u64;
        match result {
            JobResult::Success(data) => match self.jobs.complete(job_id, data).await {
                Ok(()) => {
                    info!(subsystem = "jobs", job_id = %job_id, duration_ms, "Job completed");
                    let _ = self
                        .event_tx
                        .send(WorkerEvent::JobCompleted { job_id, job_type });
                }
                Err(e) => error!(job_id = %job_id, error = %e, "Failed to mark job as completed"),
            },
            JobResult::Failed(error) => match self.jobs.fail(job_id, &error).await {
                Ok(()) => {
                    warn!(subsystem = "jobs", job_id = %job_id, %error, duration_ms, "Job failed");
                    let _ = self.event_tx.send(WorkerEvent::JobFailed {
                        job_id,
                        job_type,
                        error,
                    });
                }
                Err(e) => error!(job_id = %job_id, error = %e, "Failed to mark job as failed"),
            },
        }
    }

    /// Run the handler on its own task so a timeout can cancel it and a
    /// panic stays contained. The task is fully stopped before `on_abort`.
    async fn supervise(&self, handler: Arc<dyn JobHandler>, job: Job) -> JobResult {
        let ctx = JobContext::new(job.clone())
            .with_jobs(self.jobs.clone())
            .with_events(self.event_tx.clone());
        let task_handler = handler.clone();
        let mut task = tokio::spawn(async move { task_handler.execute(ctx).await });

        let reason = match tokio::time::timeout(self.timeout, &mut task).await {
            Ok(Ok(result)) => return result,
            Ok(Err(e)) if e.is_panic() => "Job handler panicked".to_string(),
            Ok(Err(_)) => "Job handler was cancelled".to_string(),
            Err(_) => {
                task.abort();
                let _ = task.await;
                format!("Job exceeded timeout of {}s", self.timeout.as_secs())
            }
        };

        warn!(subsystem = "jobs", job_id = %job.id, %reason, "Aborting job");
        handler.on_abort(&job, &reason).await;
        JobResult::Failed(reason)
    }
}

pub struct WorkerBuilder {
    jobs: Arc<dyn JobRepository>,
    config: WorkerConfig,
    handlers: HashMap<JobType, Arc<dyn JobHandler>>,
}

impl WorkerBuilder {
    pub fn new(jobs: Arc<dyn JobRepository>) -> Self {
        Self {
            jobs,
            config: WorkerConfig::default(),
            handlers: HashMap::new(),
        }
    }

    pub fn with_config(mut self, config: WorkerConfig) -> Self {
        self.config = config;
        self
    }

    /// Register `handler` for its job type, replacing any earlier one.
    pub fn with_handler<H: JobHandler + 'static>(mut self, handler: H) -> Self {
        let job_type = handler.job_type();
        debug!(job_type = job_type.as_str(), "Registered job handler");
        self.handlers.insert(job_type, Arc::new(handler));
        self
    }

    pub fn build(self) -> JobWorker {
        let (event_tx, _) = broadcast::channel(defaults::JOB_EVENT_CAPACITY);
        JobWorker {
            jobs: self.jobs,
            config: self.config,
            handlers: Arc::new(self.handlers),
            event_tx,
        }
    }
}
