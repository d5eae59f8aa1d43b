//! Server configuration read from the environment.

use std::time::Duration;

use axum::http::HeaderValue;

use portfolio_core::defaults;

const DEFAULT_ALLOWED_ORIGINS: &str = "http://localhost:4200,http://localhost:3000";

/// Settings the HTTP server needs beyond the per-client configs.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// Delay between queuing a synchronization job and its first claim.
    pub sync_job_delay: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: defaults::SERVER_HOST.to_string(),
            port: defaults::SERVER_PORT,
            database_url: "postgres://localhost/portfolio".to_string(),
            sync_job_delay: Duration::from_secs(defaults::SYNC_JOB_DELAY_SECS),
        }
    }
}

impl ApiConfig {
    /// Load from `HOST`, `PORT`, `DATABASE_URL` and `SYNC_JOB_DELAY_SECS`.
    pub fn from_env() -> Self {
        let base = Self::default();
        Self {
            host: std::env::var("HOST").unwrap_or(base.host),
            port: std::env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(base.port),
            database_url: std::env::var("DATABASE_URL").unwrap_or(base.database_url),
            sync_job_delay: std::env::var("SYNC_JOB_DELAY_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(base.sync_job_delay),
        }
    }

    pub fn with_sync_job_delay(mut self, delay: Duration) -> Self {
        self.sync_job_delay = delay;
        self
    }
}

/// CORS origins from `ALLOWED_ORIGINS` (comma separated).
pub fn parse_allowed_origins() -> Vec<HeaderValue> {
    let origins = std::env::var("ALLOWED_ORIGINS").unwrap_or_default();
    parse_origin_list(if origins.trim().is_empty() {
        DEFAULT_ALLOWED_ORIGINS
    } else {
        &origins
    })
}

fn parse_origin_list(origins: &str) -> Vec<HeaderValue> {
    origins
        .split(',')
        .filter_map(|s| {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return None;
            }
            match trimmed.parse::<HeaderValue>() {
                Ok(v) => Some(v),
                Err(e) => {
                    tracing::warn!("Invalid CORS origin '{}': {}", trimmed, e);
                    None
                }
            }
        })
        .collect()
}
