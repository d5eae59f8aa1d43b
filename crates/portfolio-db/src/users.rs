//! User accounts and role assignments.

use chrono::Utc;
use sqlx::{Pool, Postgres, Row};
use tracing::{info, warn};
use uuid::Uuid;

use portfolio_core::{Error, Result, Role, User};

/// PostgreSQL repository for users and their roles.
#[derive(Clone)]
pub struct PgUserRepository {
    pool: Pool<Postgres>,
}

impl PgUserRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    fn parse_row(row: sqlx::postgres::PgRow) -> User {
        User {
            id: row.get("id"),
            username: row.get("username"),
            password_hash: row.get("password_hash"),
            is_active: row.get("is_active"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        }
    }

    /// Create a user with an already hashed password.
    pub async fn create(&self, username: &str, password_hash: &str) -> Result<User> {
        let username = username.trim();
        if username.is_empty() {
            return Err(Error::InvalidInput("username cannot be empty".into()));
        }

        let now = Utc::now();
        let row = sqlx::query(
            "INSERT INTO app_user (id, username, password_hash, is_active, created_at, updated_at)
             VALUES ($1, $2, $3, TRUE, $4, $4)
             RETURNING id, username, password_hash, is_active, created_at, updated_at",
        )
        .bind(Uuid::now_v7())
        .bind(username)
        .bind(password_hash)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                Error::Conflict(format!("user already exists: {username}"))
            }
            other => Error::Database(other),
        })?;

        info!(
            subsystem = "db",
            component = "users",
            op = "create",
            username,
            "User created"
        );
        Ok(Self::parse_row(row))
    }

    pub async fn get_by_username(&self, username: &str) -> Result<Option<User>> {
        let row = sqlx::query(
            "SELECT id, username, password_hash, is_active, created_at, updated_at
             FROM app_user WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(row.map(Self::parse_row))
    }

    pub async fn set_password(&self, user_id: Uuid, password_hash: &str) -> Result<()> {
        let result = sqlx::query(
            "UPDATE app_user SET password_hash = $1, updated_at = $2 WHERE id = $3",
        )
        .bind(password_hash)
        .bind(Utc::now())
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("user {user_id}")));
        }
        Ok(())
    }

    /// Stored roles for a user. Empty when nothing was granted.
    pub async fn roles(&self, user_id: Uuid) -> Result<Vec<Role>> {
        let rows: Vec<String> =
            sqlx::query_scalar("SELECT role FROM user_role WHERE user_id = $1 ORDER BY role")
                .bind(user_id)
                .fetch_all(&self.pool)
                .await
                .map_err(Error::Database)?;

        Ok(rows
            .into_iter()
            .filter_map(|r| match r.parse::<Role>() {
                Ok(role) => Some(role),
                Err(_) => {
                    warn!(subsystem = "db", component = "users", role = %r, "Ignoring unknown role");
                    None
                }
            })
            .collect())
    }

    /// Grant a role; returns false when the user already had it.
    pub async fn grant_role(&self, user_id: Uuid, role: Role) -> Result<bool> {
        let result = sqlx::query(
            "INSERT INTO user_role (user_id, role) VALUES ($1, $2)
             ON CONFLICT (user_id, role) DO NOTHING",
        )
        .bind(user_id)
        .bind(role.as_str())
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(result.rows_affected() == 1)
    }

    /// Revoke a role; returns false when the user did not have it.
    pub async fn revoke_role(&self, user_id: Uuid, role: Role) -> Result<bool> {
        let result = sqlx::query("DELETE FROM user_role WHERE user_id = $1 AND role = $2")
            .bind(user_id)
            .bind(role.as_str())
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;

        Ok(result.rows_affected() == 1)
    }
}
