//! # portfolio-db
//!
//! PostgreSQL persistence for the portfolio admin backend:
//! - Connection pool management
//! - Users and role assignments
//! - Device tokens
//! - Synchronization progress records
//! - The background job queue
//!
//! ## Example
//!
//! ```rust,ignore
//! use portfolio_db::{Database, ProgressRepository, SyncStatus};
//!
//! let db = Database::connect("postgres://localhost/portfolio").await?;
//! db.migrate().await?;
//! let record = db.progress.create(SyncStatus::Pending, "queued").await?;
//! ```

pub mod device_tokens;
pub mod jobs;
pub mod pool;
pub mod progress;
pub mod test_fixtures;
pub mod users;

// Re-export core types
pub use portfolio_core::*;

pub use device_tokens::PgDeviceTokenRepository;
pub use jobs::PgJobRepository;
pub use pool::{create_lazy_pool, create_pool, create_pool_with_config, log_pool_metrics, PoolConfig};
pub use progress::PgProgressRepository;
pub use users::PgUserRepository;

/// Combined database context with all repositories.
pub struct Database {
    /// The underlying connection pool.
    pub pool: sqlx::Pool<sqlx::Postgres>,
    /// User accounts and roles.
    pub users: PgUserRepository,
    /// Device token registry.
    pub device_tokens: PgDeviceTokenRepository,
    /// Synchronization progress records.
    pub progress: PgProgressRepository,
    /// Job repository for background processing.
    pub jobs: PgJobRepository,
}

impl Database {
    pub fn new(pool: sqlx::Pool<sqlx::Postgres>) -> Self {
        Self {
            users: PgUserRepository::new(pool.clone()),
            device_tokens: PgDeviceTokenRepository::new(pool.clone()),
            progress: PgProgressRepository::new(pool.clone()),
            jobs: PgJobRepository::new(pool.clone()),
            pool,
        }
    }

    /// Connect to the given URL with the default pool configuration.
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = create_pool(url).await?;
        Ok(Self::new(pool))
    }

    /// Connect with a custom pool configuration.
    pub async fn connect_with_config(url: &str, config: PoolConfig) -> Result<Self> {
        let pool = create_pool_with_config(url, config).await?;
        Ok(Self::new(pool))
    }

    /// Run pending migrations.
    #[cfg(feature = "migrations")]
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(|e| Error::Database(sqlx::Error::Migrate(Box::new(e))))?;
        Ok(())
    }

    pub fn pool(&self) -> &sqlx::Pool<sqlx::Postgres> {
        &self.pool
    }
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self::new(self.pool.clone())
    }
}
