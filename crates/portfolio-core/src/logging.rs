//! Structured logging field names shared by every portfolio crate.
//!
//! Use these constants as tracing field keys so log aggregation can query
//! by the same names regardless of which subsystem emitted the event.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Degraded service, requires operator attention |
//! | WARN  | Recoverable issue, automatic fallback applied |
//! | INFO  | Lifecycle events (startup, shutdown), operation completions |
//! | DEBUG | Decision points, intermediate values, config choices |
//! | TRACE | Per-item iteration (chunks, pages) |

// ─── Identity fields ───────────────────────────────────────────────────────

/// Correlation ID propagated from the HTTP request.
pub const REQUEST_ID: &str = "request_id";

/// Subsystem originating the log event.
/// Values: "api", "db", "auth", "jobs", "wordpress", "weaviate", "github"
pub const SUBSYSTEM: &str = "subsystem";

/// Component within a subsystem.
/// Examples: "pool", "worker", "post_sync", "cache"
pub const COMPONENT: &str = "component";

/// Logical operation name.
/// Examples: "get_posts", "insert_objects", "claim_next"
pub const OPERATION: &str = "op";

// ─── Entity fields ─────────────────────────────────────────────────────────

/// Job UUID being processed.
pub const JOB_ID: &str = "job_id";

/// Job type being processed.
pub const JOB_TYPE: &str = "job_type";

/// Synchronization progress record id.
pub const PROGRESS_ID: &str = "progress_id";

/// WordPress post id.
pub const POST_ID: &str = "post_id";

/// Vector-store collection name.
pub const COLLECTION: &str = "collection";

/// Username of the authenticated principal.
pub const USERNAME: &str = "username";

// ─── Measurement fields ────────────────────────────────────────────────────

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Number of results returned by a query.
pub const RESULT_COUNT: &str = "result_count";

/// Number of chunks produced or inserted.
pub const CHUNK_COUNT: &str = "chunk_count";

/// Number of posts handled.
pub const POST_COUNT: &str = "post_count";

/// Page number in a paginated fetch.
pub const PAGE: &str = "page";

// ─── Database fields ───────────────────────────────────────────────────────

/// Maximum number of connections in the pool.
pub const POOL_SIZE: &str = "pool_size";

/// Database table affected.
pub const DB_TABLE: &str = "db_table";

// ─── Outcome fields ────────────────────────────────────────────────────────

/// Boolean success/failure indicator.
pub const SUCCESS: &str = "success";

/// Error message when an operation fails.
pub const ERROR_MSG: &str = "error";

/// HTTP status returned by an upstream service.
pub const STATUS: &str = "status";
