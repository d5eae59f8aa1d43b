//! Issued device tokens, kept so they can be listed and revoked.

use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use portfolio_core::{DeviceToken, Error, Result};

/// PostgreSQL repository for device tokens.
#[derive(Clone)]
pub struct PgDeviceTokenRepository {
    pool: Pool<Postgres>,
}

impl PgDeviceTokenRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    fn parse_row(row: sqlx::postgres::PgRow) -> DeviceToken {
        DeviceToken {
            id: row.get("id"),
            device_name: row.get("device_name"),
            issued_by: row.get("issued_by"),
            created_at: row.get("created_at"),
            expires_at: row.get("expires_at"),
            revoked: row.get("revoked"),
        }
    }

    pub async fn insert(&self, token: &DeviceToken) -> Result<()> {
        sqlx::query(
            "INSERT INTO device_token (id, device_name, issued_by, created_at, expires_at, revoked)
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(token.id)
        .bind(&token.device_name)
        .bind(&token.issued_by)
        .bind(token.created_at)
        .bind(token.expires_at)
        .bind(token.revoked)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(())
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<DeviceToken>> {
        let row = sqlx::query(
            "SELECT id, device_name, issued_by, created_at, expires_at, revoked
             FROM device_token WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(row.map(Self::parse_row))
    }

    /// Tokens that are neither revoked nor expired, newest first.
    pub async fn list_active(&self) -> Result<Vec<DeviceToken>> {
        let rows = sqlx::query(
            "SELECT id, device_name, issued_by, created_at, expires_at, revoked
             FROM device_token
             WHERE NOT revoked AND expires_at > now()
             ORDER BY created_at DESC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows.into_iter().map(Self::parse_row).collect())
    }

    /// Revoke a token; returns false if it was unknown or already revoked.
    pub async fn revoke(&self, id: Uuid) -> Result<bool> {
        let result =
            sqlx::query("UPDATE device_token SET revoked = TRUE WHERE id = $1 AND NOT revoked")
                .bind(id)
                .execute(&self.pool)
                .await
                .map_err(Error::Database)?;

        Ok(result.rows_affected() == 1)
    }
}
