//! Redis-backed cache for GraphQL field results.
//!
//! ## Configuration
//!
//! Environment variables:
//! - `REDIS_ENABLED`: Set to "false" to disable caching (default: true)
//! - `REDIS_URL`: Redis connection URL (default: redis://localhost:6379)
//! - `REDIS_CACHE_TTL`: Cache TTL in seconds (default: 900)
//!
//! Keys are `gql_cache__{name}` when nothing varies, otherwise
//! `gql_cache__{name}__{hash}` where the hash covers the selected
//! [`VaryOn`] components of the request.

use std::sync::Arc;

use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use serde::{de::DeserializeOwned, Serialize};
use sha2::{Digest, Sha256};
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use portfolio_core::defaults;

/// Request component a cache entry is keyed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VaryOn {
    Args,
    UserAgent,
    Ip,
    User,
}

/// What the cache may vary on, captured from the HTTP request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestFacts {
    pub user_agent: Option<String>,
    pub ip: Option<String>,
    pub user: Option<String>,
}

/// Response cache backed by Redis.
#[derive(Clone)]
pub struct ResponseCache {
    inner: Arc<ResponseCacheInner>,
}

struct ResponseCacheInner {
    /// Redis connection manager (None if disabled).
    connection: RwLock<Option<ConnectionManager>>,
    ttl_seconds: u64,
    prefix: String,
}

impl ResponseCache {
    /// Create the cache from environment configuration. Connection failures
    /// leave the cache disabled.
    pub async fn from_env() -> Self {
        let enabled = std::env::var("REDIS_ENABLED")
            .map(|v| v != "false" && v != "0")
            .unwrap_or(true);

        let redis_url =
            std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string());

        let ttl_seconds: u64 = std::env::var("REDIS_CACHE_TTL")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults::GQL_CACHE_TTL_SECS);

        let connection = if enabled {
            match redis::Client::open(redis_url.as_str()) {
                Ok(client) => match ConnectionManager::new(client).await {
                    Ok(conn) => {
                        info!(
                            subsystem = "api",
                            component = "cache",
                            ttl_seconds,
                            "Redis response cache enabled"
                        );
                        Some(conn)
                    }
                    Err(e) => {
                        warn!("Failed to connect to Redis, cache disabled: {}", e);
                        None
                    }
                },
                Err(e) => {
                    warn!("Invalid Redis URL, cache disabled: {}", e);
                    None
                }
            }
        } else {
            info!("Redis response cache disabled via REDIS_ENABLED=false");
            None
        };

        Self::with_connection(connection, ttl_seconds)
    }

    /// A cache that never stores anything.
    pub fn disabled() -> Self {
        Self::with_connection(None, defaults::GQL_CACHE_TTL_SECS)
    }

    fn with_connection(connection: Option<ConnectionManager>, ttl_seconds: u64) -> Self {
        Self {
            inner: Arc::new(ResponseCacheInner {
                connection: RwLock::new(connection),
                ttl_seconds,
                prefix: defaults::GQL_CACHE_PREFIX.to_string(),
            }),
        }
    }

    /// Build the key for `name`. Only the components listed in `vary_on`
    /// contribute; missing request facts hash as empty strings.
    pub fn cache_key(
        &self,
        name: &str,
        args: &[String],
        facts: &RequestFacts,
        vary_on: &[VaryOn],
    ) -> String {
        let base = format!("{}{}", self.inner.prefix, name);
        if vary_on.is_empty() {
            return base;
        }

        let mut hasher = Sha256::new();
        for vary in vary_on {
            match vary {
                VaryOn::Args => {
                    for arg in args {
                        hasher.update(arg.as_bytes());
                        hasher.update([0u8]);
                    }
                }
                VaryOn::UserAgent => hasher.update(facts.user_agent.as_deref().unwrap_or("")),
                VaryOn::Ip => hasher.update(facts.ip.as_deref().unwrap_or("")),
                VaryOn::User => hasher.update(facts.user.as_deref().unwrap_or("")),
            }
            hasher.update([0xffu8]);
        }

        let hash = hex::encode(hasher.finalize());
        format!("{}__{}", base, &hash[..16])
    }

    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let mut conn_guard = self.inner.connection.write().await;
        let conn = conn_guard.as_mut()?;

        match conn.get::<_, Option<String>>(key).await {
            Ok(Some(data)) => match serde_json::from_str(&data) {
                Ok(result) => {
                    debug!("Cache HIT: {}", key);
                    Some(result)
                }
                Err(e) => {
                    warn!("Cache deserialization error: {}", e);
                    None
                }
            },
            Ok(None) => {
                debug!("Cache MISS: {}", key);
                None
            }
            Err(e) => {
                error!("Redis GET error: {}", e);
                None
            }
        }
    }

    /// Store `value` under `key` with the configured TTL.
    pub async fn set<T: Serialize>(&self, key: &str, value: &T) -> bool {
        let mut conn_guard = self.inner.connection.write().await;
        let Some(conn) = conn_guard.as_mut() else {
            return false;
        };

        let serialized = match serde_json::to_string(value) {
            Ok(s) => s,
            Err(e) => {
                error!("Cache serialization error: {}", e);
                return false;
            }
        };

        match conn
            .set_ex::<_, _, ()>(key, serialized, self.inner.ttl_seconds)
            .await
        {
            Ok(_) => {
                debug!("Cache SET: {} (TTL: {}s)", key, self.inner.ttl_seconds);
                true
            }
            Err(e) => {
                error!("Redis SET error: {}", e);
                false
            }
        }
    }
}
