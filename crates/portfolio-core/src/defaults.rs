//! Centralized default constants for the portfolio backend.
//!
//! Every crate reads shared defaults from here instead of repeating magic
//! numbers. Values may be overridden through the environment where the
//! owning `from_env` constructor says so.

// =============================================================================
// CHUNKING
// =============================================================================

/// Maximum words per stored post chunk (`WEAVIATE_MAX_WORD_PER_POST`).
pub const MAX_WORDS_PER_CHUNK: usize = 100;

/// Character that marks a sentence boundary for chunk cuts.
pub const SENTENCE_BOUNDARY: char = '.';

// =============================================================================
// SYNCHRONIZATION
// =============================================================================

/// Number of discrete steps used to compute progress percentages.
pub const SYNC_TOTAL_STEPS: i32 = 10;

/// Maximum stored length of a progress message, in characters.
pub const SYNC_MESSAGE_MAX_LEN: usize = 200;

/// Number of error characters kept in a failed-sync message.
pub const SYNC_ERROR_PREVIEW_LEN: usize = 50;

/// Delay before a queued synchronization job becomes claimable.
pub const SYNC_JOB_DELAY_SECS: u64 = 5;

/// Default vector-store collection for posts (`WEAVIATE_POST_COLLECTION`).
pub const POST_COLLECTION: &str = "Post";

// =============================================================================
// WORDPRESS
// =============================================================================

/// Page size used when fetching posts.
pub const WORDPRESS_PAGE_SIZE: u32 = 10;

/// Request timeout for WordPress calls.
pub const WORDPRESS_TIMEOUT_SECS: u64 = 30;

// =============================================================================
// WEAVIATE
// =============================================================================

/// Default Weaviate host.
pub const WEAVIATE_HOST: &str = "localhost";

/// Default Weaviate HTTP port.
pub const WEAVIATE_PORT: u16 = 8080;

/// Default Weaviate scheme.
pub const WEAVIATE_SCHEME: &str = "http";

/// Default Weaviate request timeout.
pub const WEAVIATE_TIMEOUT_SECS: u64 = 60;

/// Upper bound on object ids fetched per post when collecting stale chunks.
pub const WEAVIATE_QUERY_LIMIT: usize = 10_000;

// =============================================================================
// GITHUB
// =============================================================================

/// GitHub GraphQL endpoint.
pub const GITHUB_API_URL: &str = "https://api.github.com/graphql";

/// Owner of the portfolio repositories.
pub const GITHUB_REPOSITORY_OWNER: &str = "zuhairmhtb";

/// Request timeout for GitHub calls.
pub const GITHUB_TIMEOUT_SECS: u64 = 30;

// =============================================================================
// AUTH
// =============================================================================

/// Access-token lifetime (`JWT_ACCESS_TOKEN_EXPIRE_MINUTES`).
pub const JWT_ACCESS_TOKEN_EXPIRE_MINUTES: i64 = 30;

/// Refresh-token lifetime (`JWT_REFRESH_TOKEN_EXPIRE_MINUTES`), 7 days.
pub const JWT_REFRESH_TOKEN_EXPIRE_MINUTES: i64 = 7 * 24 * 60;

/// Default JWT signing algorithm.
pub const JWT_ALGORITHM: &str = "HS256";

/// Device-token lifetime (`DEVICE_TOKEN_EXPIRE_DAYS`).
pub const DEVICE_TOKEN_EXPIRE_DAYS: i64 = 365;

/// Error text returned when a principal lacks every required role.
pub const PERMISSION_DENIED_MESSAGE: &str = "You don't have permission to perform this action";

// =============================================================================
// CACHE
// =============================================================================

/// Key prefix for cached GraphQL responses.
pub const GQL_CACHE_PREFIX: &str = "gql_cache__";

/// Default cache TTL for GraphQL responses (15 minutes).
pub const GQL_CACHE_TTL_SECS: u64 = 15 * 60;

// =============================================================================
// JOB WORKER
// =============================================================================

/// Poll interval when the queue is empty.
pub const JOB_POLL_INTERVAL_MS: u64 = 1000;

/// Maximum concurrent jobs per worker.
pub const JOB_MAX_CONCURRENT: usize = 2;

/// Per-job timeout.
pub const JOB_TIMEOUT_SECS: u64 = 30 * 60;

/// Capacity of the worker event broadcast channel.
pub const JOB_EVENT_CAPACITY: usize = 256;

// =============================================================================
// SERVER
// =============================================================================

/// Default bind host.
pub const SERVER_HOST: &str = "0.0.0.0";

/// Default bind port.
pub const SERVER_PORT: u16 = 8000;

/// Default database pool size.
pub const DB_MAX_CONNECTIONS: u32 = 10;
