//! # portfolio-jobs
//!
//! Background job processing for the portfolio admin backend.
//!
//! - [`JobWorker`]: polls a [`JobRepository`] for due jobs and runs them
//!   through registered [`JobHandler`]s with bounded concurrency
//! - [`PostSynchronizer`]: the WordPress → vector store pipeline, driven by
//!   [`PostSynchronizationHandler`]
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use portfolio_jobs::{PostSynchronizationHandler, PostSynchronizer, WorkerBuilder, WorkerConfig};
//!
//! let sync = Arc::new(PostSynchronizer::new(wordpress, weaviate, progress));
//! let worker = WorkerBuilder::new(jobs)
//!     .with_config(WorkerConfig::from_env())
//!     .with_handler(PostSynchronizationHandler::new(sync))
//!     .build();
//! let handle = worker.start();
//! // ...
//! handle.shutdown().await?;
//! ```
//!
//! [`JobRepository`]: portfolio_core::JobRepository

pub mod handler;
pub mod sync;
pub mod worker;

pub use handler::{JobContext, JobHandler, JobResult};
pub use sync::{failure_message, PostSynchronizationHandler, PostSynchronizer, SyncSummary};
pub use worker::{JobWorker, WorkerBuilder, WorkerConfig, WorkerEvent, WorkerHandle};
