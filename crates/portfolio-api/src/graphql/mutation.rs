use async_graphql::{Context, Object, Result};
use tracing::{info, warn};

use portfolio_auth::WRITE_ROLES;
use portfolio_core::{
    Dataset, FlexibleDateTime, JobRepository, JobType, ProgressRepository, SyncPostsPayload,
    SyncStatus, INVALID_DATE_MESSAGE,
};
use portfolio_jobs::failure_message;

use super::require;
use super::types::{DatasetInput, DatasetObject, ProgressObject};
use crate::state::AppState;

/// Step value that reports 100% regardless of status.
const TERMINAL_STEP: i32 = -1;

pub struct MutationRoot;

#[Object]
impl MutationRoot {
    async fn dataset(&self) -> DatasetMutation {
        DatasetMutation
    }

    async fn posts(&self) -> PostMutation {
        PostMutation
    }
}

pub struct DatasetMutation;

#[Object]
impl DatasetMutation {
    /// Create a collection. Returns null when the store rejects the definition.
    async fn add(&self, ctx: &Context<'_>, dataset: DatasetInput) -> Result<Option<DatasetObject>> {
        require(ctx, WRITE_ROLES)?;
        let state = ctx.data::<AppState>()?;

        let dataset = Dataset::from(dataset);
        dataset.validate()?;
        let created = state.weaviate.create_collection(&dataset).await?;
        info!(
            subsystem = "api",
            component = "graphql",
            op = "dataset.add",
            collection = %dataset.name,
            success = created.is_some(),
            "Dataset add"
        );
        Ok(created.map(Into::into))
    }

    /// Delete a collection. Returns null when it did not exist.
    async fn delete(&self, ctx: &Context<'_>, name: String) -> Result<Option<DatasetObject>> {
        require(ctx, WRITE_ROLES)?;
        let state = ctx.data::<AppState>()?;

        let deleted = state.weaviate.delete_collection(&name).await?;
        info!(
            subsystem = "api",
            component = "graphql",
            op = "dataset.delete",
            collection = %name,
            success = deleted.is_some(),
            "Dataset delete"
        );
        Ok(deleted.map(Into::into))
    }
}

pub struct PostMutation;

#[Object]
impl PostMutation {
    /// Queue a synchronization of posts modified after `modifiedDate` and
    /// return its progress record for polling.
    async fn synchronize(&self, ctx: &Context<'_>, modified_date: String) -> Result<ProgressObject> {
        require(ctx, WRITE_ROLES)?;
        let state = ctx.data::<AppState>()?;

        let record = state.progress.create(SyncStatus::Pending, "").await?;

        let after = match FlexibleDateTime::parse(&modified_date) {
            Ok(after) => after,
            Err(_) => {
                let failed = state
                    .progress
                    .update(record.id, SyncStatus::Failed, INVALID_DATE_MESSAGE, TERMINAL_STEP)
                    .await?;
                return Ok(failed.into());
            }
        };

        let record = state
            .progress
            .update(
                record.id,
                SyncStatus::Pending,
                &format!("Starting synchronization of posts modified after {after}"),
                0,
            )
            .await?;

        let payload = serde_json::to_value(SyncPostsPayload {
            progress_id: record.id,
            modified_after: after.into_inner(),
        })?;
        match state
            .jobs
            .queue(
                JobType::PostSynchronization,
                Some(payload),
                state.config.sync_job_delay,
            )
            .await
        {
            Ok(job_id) => {
                info!(
                    subsystem = "api",
                    component = "graphql",
                    op = "posts.synchronize",
                    progress_id = record.id,
                    job_id = %job_id,
                    "Queued post synchronization"
                );
                Ok(record.into())
            }
            Err(e) => {
                warn!(progress_id = record.id, error = %e, "Could not queue post synchronization");
                let failed = state
                    .progress
                    .update(record.id, SyncStatus::Failed, &failure_message(&e), TERMINAL_STEP)
                    .await?;
                Ok(failed.into())
            }
        }
    }
}
