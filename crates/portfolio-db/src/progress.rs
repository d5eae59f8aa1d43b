//! Synchronization progress repository.

use async_trait::async_trait;
use sqlx::{Pool, Postgres, Row};
use tracing::debug;

use portfolio_core::{
    Error, ProgressRepository, Result, SyncStatus, SynchronizationProgress,
};

/// PostgreSQL implementation of ProgressRepository.
#[derive(Clone)]
pub struct PgProgressRepository {
    pool: Pool<Postgres>,
}

impl PgProgressRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    fn parse_row(row: sqlx::postgres::PgRow) -> Result<SynchronizationProgress> {
        let status: String = row.get("status");
        Ok(SynchronizationProgress {
            id: row.get("id"),
            status: status.parse()?,
            progress: row.get("progress"),
            message: row.get("message"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        })
    }
}

#[async_trait]
impl ProgressRepository for PgProgressRepository {
    async fn create(&self, status: SyncStatus, message: &str) -> Result<SynchronizationProgress> {
        let row = sqlx::query(
            "INSERT INTO sync_progress (status, progress, message)
             VALUES ($1, $2, $3)
             RETURNING id, status, progress, message, created_at, updated_at",
        )
        .bind(status.as_str())
        .bind(SynchronizationProgress::percent_for(status, 0))
        .bind(SynchronizationProgress::truncate_message(message))
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)?;

        Self::parse_row(row)
    }

    async fn get(&self, id: i64) -> Result<Option<SynchronizationProgress>> {
        let row = sqlx::query(
            "SELECT id, status, progress, message, created_at, updated_at
             FROM sync_progress WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        row.map(Self::parse_row).transpose()
    }

    async fn update(
        &self,
        id: i64,
        status: SyncStatus,
        message: &str,
        step: i32,
    ) -> Result<SynchronizationProgress> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        // Row lock serializes concurrent updates to the same record.
        let row = sqlx::query(
            "SELECT id, status, progress, message, created_at, updated_at
             FROM sync_progress WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(Error::Database)?
        .ok_or(Error::ProgressNotFound(id))?;

        let mut progress = Self::parse_row(row)?;
        progress.apply(status, message, step)?;

        sqlx::query(
            "UPDATE sync_progress
             SET status = $1, progress = $2, message = $3, updated_at = $4
             WHERE id = $5",
        )
        .bind(progress.status.as_str())
        .bind(progress.progress)
        .bind(&progress.message)
        .bind(progress.updated_at)
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(Error::Database)?;

        tx.commit().await.map_err(Error::Database)?;

        debug!(
            subsystem = "db",
            component = "sync_progress",
            op = "update",
            progress_id = id,
            status = progress.status.as_str(),
            progress = progress.progress,
            "Synchronization progress updated"
        );
        Ok(progress)
    }
}
