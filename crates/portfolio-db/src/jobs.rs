//! Job repository implementation.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value as JsonValue;
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use portfolio_core::{Error, Job, JobRepository, JobStatus, JobType, Result};

const JOB_COLUMNS: &str = "id, job_type::text, status::text, payload, result, error_message, \
     progress_percent, progress_message, run_after, created_at, started_at, completed_at";

/// PostgreSQL implementation of JobRepository.
#[derive(Clone)]
pub struct PgJobRepository {
    pool: Pool<Postgres>,
}

impl PgJobRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    fn job_type_to_str(job_type: JobType) -> &'static str {
        job_type.as_str()
    }

    fn str_to_job_type(s: &str) -> Result<JobType> {
        match s {
            "post_synchronization" => Ok(JobType::PostSynchronization),
            other => Err(Error::Job(format!("unknown job type: {other}"))),
        }
    }

    fn str_to_job_status(s: &str) -> JobStatus {
        match s {
            "running" => JobStatus::Running,
            "completed" => JobStatus::Completed,
            "failed" => JobStatus::Failed,
            _ => JobStatus::Pending,
        }
    }

    fn parse_job_row(row: sqlx::postgres::PgRow) -> Result<Job> {
        Ok(Job {
            id: row.get("id"),
            job_type: Self::str_to_job_type(row.get("job_type"))?,
            status: Self::str_to_job_status(row.get("status")),
            payload: row.get("payload"),
            result: row.get("result"),
            error_message: row.get("error_message"),
            progress_percent: row.get("progress_percent"),
            progress_message: row.get("progress_message"),
            run_after: row.get("run_after"),
            created_at: row.get("created_at"),
            started_at: row.get("started_at"),
            completed_at: row.get("completed_at"),
        })
    }
}

#[async_trait]
impl JobRepository for PgJobRepository {
    async fn queue(
        &self,
        job_type: JobType,
        payload: Option<JsonValue>,
        delay: Duration,
    ) -> Result<Uuid> {
        let job_id = Uuid::now_v7();
        let now = Utc::now();
        let delay = chrono::Duration::from_std(delay)
            .map_err(|e| Error::InvalidInput(format!("job delay out of range: {e}")))?;

        sqlx::query(
            "INSERT INTO job_queue (id, job_type, status, payload, run_after, created_at)
             VALUES ($1, $2::job_type, 'pending'::job_status, $3, $4, $5)",
        )
        .bind(job_id)
        .bind(Self::job_type_to_str(job_type))
        .bind(&payload)
        .bind(now + delay)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(job_id)
    }

    async fn claim_next_for_types(&self, job_types: &[JobType]) -> Result<Option<Job>> {
        let now = Utc::now();
        let type_strings: Vec<String> = job_types
            .iter()
            .map(|jt| Self::job_type_to_str(*jt).to_string())
            .collect();

        // SKIP LOCKED lets several workers poll the same queue.
        let row = sqlx::query(&format!(
            "UPDATE job_queue
             SET status = 'running'::job_status, started_at = $1
             WHERE id = (
                 SELECT id FROM job_queue
                 WHERE status = 'pending'::job_status
                   AND run_after <= $1
                   AND (cardinality($2::text[]) = 0 OR job_type::text = ANY($2))
                 ORDER BY run_after ASC, created_at ASC
                 LIMIT 1
                 FOR UPDATE SKIP LOCKED
             )
             RETURNING {JOB_COLUMNS}"
        ))
        .bind(now)
        .bind(&type_strings)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        row.map(Self::parse_job_row).transpose()
    }

    async fn update_progress(
        &self,
        job_id: Uuid,
        percent: i32,
        message: Option<&str>,
    ) -> Result<()> {
        sqlx::query(
            "UPDATE job_queue SET progress_percent = $1, progress_message = $2 WHERE id = $3",
        )
        .bind(percent.clamp(0, 100))
        .bind(message)
        .bind(job_id)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(())
    }

    async fn complete(&self, job_id: Uuid, result: Option<JsonValue>) -> Result<()> {
        sqlx::query(
            "UPDATE job_queue
             SET status = 'completed'::job_status, completed_at = $1, result = $2,
                 progress_percent = 100
             WHERE id = $3",
        )
        .bind(Utc::now())
        .bind(&result)
        .bind(job_id)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(())
    }

    async fn fail(&self, job_id: Uuid, error: &str) -> Result<()> {
        sqlx::query(
            "UPDATE job_queue
             SET status = 'failed'::job_status, completed_at = $1, error_message = $2
             WHERE id = $3",
        )
        .bind(Utc::now())
        .bind(error)
        .bind(job_id)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(())
    }

    async fn get(&self, job_id: Uuid) -> Result<Option<Job>> {
        let row = sqlx::query(&format!(
            "SELECT {JOB_COLUMNS} FROM job_queue WHERE id = $1"
        ))
        .bind(job_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        row.map(Self::parse_job_row).transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_type_round_trip() {
        let s = PgJobRepository::job_type_to_str(JobType::PostSynchronization);
        assert_eq!(s, "post_synchronization");
        assert_eq!(
            PgJobRepository::str_to_job_type(s).unwrap(),
            JobType::PostSynchronization
        );
    }

    #[test]
    fn test_unknown_job_type_is_an_error() {
        assert!(PgJobRepository::str_to_job_type("embedding").is_err());
    }

    #[test]
    fn test_str_to_job_status() {
        assert_eq!(PgJobRepository::str_to_job_status("pending"), JobStatus::Pending);
        assert_eq!(PgJobRepository::str_to_job_status("running"), JobStatus::Running);
        assert_eq!(
            PgJobRepository::str_to_job_status("completed"),
            JobStatus::Completed
        );
        assert_eq!(PgJobRepository::str_to_job_status("failed"), JobStatus::Failed);
        assert_eq!(PgJobRepository::str_to_job_status("bogus"), JobStatus::Pending);
    }

    #[test]
    fn test_job_type_matches_serde_name() {
        let serde_name = serde_json::to_value(JobType::PostSynchronization).unwrap();
        assert_eq!(
            serde_name,
            PgJobRepository::job_type_to_str(JobType::PostSynchronization)
        );
    }
}
