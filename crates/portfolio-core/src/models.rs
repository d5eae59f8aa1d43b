//! Domain models for posts, datasets, synchronization progress, identities and jobs.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};
use uuid::Uuid;

use crate::defaults;
use crate::error::{Error, Result};

// =============================================================================
// POSTS
// =============================================================================

/// Property names used when a post chunk is stored in the vector store.
pub mod post_fields {
    pub const POST_ID: &str = "postId";
    pub const TITLE: &str = "postTitle";
    pub const EXCERPT: &str = "postExcerpt";
    pub const CONTENT: &str = "postContent";
    pub const DATE: &str = "postDate";
    pub const AUTHOR: &str = "postAuthor";
    pub const CATEGORIES: &str = "postCategories";
    pub const TAGS: &str = "postTags";
    pub const URL: &str = "postUrl";
    pub const SEQUENCE: &str = "postSequence";
    pub const IS_DELETED: &str = "isDeleted";
}

/// A blog post as read from WordPress or stored in the vector store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    /// Vector-store object id. Empty for posts that come straight from WordPress.
    pub id: String,
    pub post_id: i64,
    pub title: String,
    pub excerpt: String,
    pub content: String,
    pub date: DateTime<Utc>,
    pub author: String,
    /// Comma-separated category names.
    pub categories: Option<String>,
    /// Comma-separated tag names.
    pub tags: Option<String>,
    pub url: Option<String>,
}

impl Post {
    /// Vector-store properties for one chunk of this post.
    ///
    /// Every property except the content is copied from the post; the
    /// content is replaced by the chunk text and tagged with its sequence.
    /// `postId` is stored as text.
    pub fn chunk_properties(&self, chunk: &Chunk) -> JsonValue {
        json!({
            (post_fields::POST_ID): self.post_id.to_string(),
            (post_fields::TITLE): self.title,
            (post_fields::EXCERPT): self.excerpt,
            (post_fields::CONTENT): chunk.text,
            (post_fields::DATE): self.date.to_rfc3339(),
            (post_fields::AUTHOR): self.author,
            (post_fields::CATEGORIES): self.categories,
            (post_fields::TAGS): self.tags,
            (post_fields::URL): self.url,
            (post_fields::SEQUENCE): chunk.sequence,
            (post_fields::IS_DELETED): false,
        })
    }
}

/// One bounded segment of a post's content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// 1-based position of the chunk within its post.
    pub sequence: u32,
    pub text: String,
}

// =============================================================================
// DATASETS
// =============================================================================

/// Data type of a dataset property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PropertyType {
    #[default]
    Text,
    Number,
    Integer,
    Date,
    Boolean,
    GeoCoordinates,
    PhoneNumber,
    Uuid,
    Blob,
    Object,
}

impl PropertyType {
    pub const ALL: [PropertyType; 10] = [
        PropertyType::Text,
        PropertyType::Number,
        PropertyType::Integer,
        PropertyType::Date,
        PropertyType::Boolean,
        PropertyType::GeoCoordinates,
        PropertyType::PhoneNumber,
        PropertyType::Uuid,
        PropertyType::Blob,
        PropertyType::Object,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PropertyType::Text => "text",
            PropertyType::Number => "number",
            PropertyType::Integer => "integer",
            PropertyType::Date => "date",
            PropertyType::Boolean => "boolean",
            PropertyType::GeoCoordinates => "geoCoordinates",
            PropertyType::PhoneNumber => "phoneNumber",
            PropertyType::Uuid => "uuid",
            PropertyType::Blob => "blob",
            PropertyType::Object => "object",
        }
    }

    /// Lenient parse: unknown names fall back to `Text`.
    pub fn parse_lenient(s: &str) -> Self {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .unwrap_or_default()
    }
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Schema descriptor for one property of a vector-store collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetProperty {
    pub name: String,
    #[serde(rename = "type")]
    pub property_type: PropertyType,
    pub description: Option<String>,
    #[serde(default)]
    pub is_vector: bool,
    #[serde(default)]
    pub is_indexed: bool,
}

impl DatasetProperty {
    /// Properties are identified by name.
    pub fn id(&self) -> &str {
        &self.name
    }

    /// Whether the vector store should build a keyword index for this property.
    pub fn is_searchable(&self) -> bool {
        self.is_indexed && self.property_type == PropertyType::Text
    }
}

/// Schema descriptor for a vector-store collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub properties: Vec<DatasetProperty>,
}

impl Dataset {
    /// Datasets are identified by name.
    pub fn id(&self) -> &str {
        &self.name
    }

    /// Placeholder returned after a collection is deleted.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            properties: Vec::new(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::InvalidInput("dataset name cannot be empty".into()));
        }
        let mut seen = std::collections::HashSet::new();
        for prop in &self.properties {
            if prop.name.trim().is_empty() {
                return Err(Error::InvalidInput("property name cannot be empty".into()));
            }
            if !seen.insert(prop.name.as_str()) {
                return Err(Error::InvalidInput(format!(
                    "duplicate property name: {}",
                    prop.name
                )));
            }
        }
        Ok(())
    }
}

// =============================================================================
// SYNCHRONIZATION PROGRESS
// =============================================================================

/// Lifecycle status of a synchronization run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
}

impl SyncStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncStatus::Pending => "pending",
            SyncStatus::InProgress => "in_progress",
            SyncStatus::Completed => "completed",
            SyncStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, SyncStatus::Completed | SyncStatus::Failed)
    }

    fn rank(&self) -> u8 {
        match self {
            SyncStatus::Pending => 0,
            SyncStatus::InProgress => 1,
            SyncStatus::Completed | SyncStatus::Failed => 2,
        }
    }

    /// Statuses only move forward; terminal statuses never change.
    pub fn can_transition_to(&self, next: SyncStatus) -> bool {
        if self.is_terminal() {
            return false;
        }
        next.rank() >= self.rank()
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SyncStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(SyncStatus::Pending),
            "in_progress" => Ok(SyncStatus::InProgress),
            "completed" => Ok(SyncStatus::Completed),
            "failed" => Ok(SyncStatus::Failed),
            other => Err(Error::InvalidInput(format!("unknown sync status: {other}"))),
        }
    }
}

/// Polled record describing one synchronization run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynchronizationProgress {
    pub id: i64,
    pub status: SyncStatus,
    /// Percentage, 0..=100.
    pub progress: i32,
    pub message: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SynchronizationProgress {
    /// Percentage for a step out of [`defaults::SYNC_TOTAL_STEPS`].
    ///
    /// Terminal statuses and out-of-range steps report 100.
    pub fn percent_for(status: SyncStatus, step: i32) -> i32 {
        if status.is_terminal() || !(0..=defaults::SYNC_TOTAL_STEPS).contains(&step) {
            return 100;
        }
        step * 100 / defaults::SYNC_TOTAL_STEPS
    }

    /// Cut a message to the stored maximum, respecting char boundaries.
    pub fn truncate_message(message: &str) -> String {
        message.chars().take(defaults::SYNC_MESSAGE_MAX_LEN).collect()
    }

    /// Apply a status update in memory, rejecting backwards transitions.
    pub fn apply(&mut self, status: SyncStatus, message: &str, step: i32) -> Result<()> {
        if !self.status.can_transition_to(status) {
            return Err(Error::InvalidTransition {
                from: self.status.to_string(),
                to: status.to_string(),
            });
        }
        self.status = status;
        self.progress = Self::percent_for(status, step);
        self.message = Self::truncate_message(message);
        self.updated_at = Utc::now();
        Ok(())
    }
}

// =============================================================================
// IDENTITY
// =============================================================================

/// Authorization role attached to a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    User,
    Guest,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::User => "user",
            Role::Guest => "guest",
        }
    }

    /// Users with no stored role are guests.
    pub fn effective(mut roles: Vec<Role>) -> Vec<Role> {
        if roles.is_empty() {
            roles.push(Role::Guest);
        }
        roles
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "user" => Ok(Role::User),
            "guest" => Ok(Role::Guest),
            other => Err(Error::InvalidInput(format!("unknown role: {other}"))),
        }
    }
}

/// An account that can log in to the admin API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A long-lived credential issued to a non-human client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceToken {
    /// Matches the `jti` claim of the issued token.
    pub id: Uuid,
    pub device_name: String,
    pub issued_by: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub revoked: bool,
}

impl DeviceToken {
    pub fn is_usable(&self, now: DateTime<Utc>) -> bool {
        !self.revoked && self.expires_at > now
    }
}

// =============================================================================
// GITHUB
// =============================================================================

/// A repository whose issue statistics are published.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GithubRepository {
    pub name: String,
    pub title: String,
    pub description: String,
    pub url: String,
    pub icon: String,
}

impl GithubRepository {
    pub fn new(name: &str, title: &str, description: &str, owner: &str) -> Self {
        Self {
            name: name.to_string(),
            title: title.to_string(),
            description: description.to_string(),
            url: format!("https://github.com/{owner}/{name}.git"),
            icon: String::new(),
        }
    }

    /// The repositories that make up the portfolio system.
    pub fn portfolio(owner: &str) -> Vec<Self> {
        vec![
            Self::new(
                "ThePortfolioFrontend",
                "The Angular Frontend",
                "The Angular Frontend for the system",
                owner,
            ),
            Self::new(
                "ThePortfolioCMS",
                "The WordPress Backend",
                "The WordPress CMS for the system",
                owner,
            ),
            Self::new(
                "ThePortfolioInfrastructure",
                "The Infrastructure",
                "The Infrastructure for the system",
                owner,
            ),
            Self::new(
                "ThePortfolioAdmin",
                "The Django Admin",
                "The Django Admin for the system",
                owner,
            ),
        ]
    }
}

/// Issue totals for one repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueCount {
    pub repository: String,
    pub url: String,
    pub title: String,
    pub description: String,
    pub icon: String,
    pub all: i64,
    pub open: i64,
    pub closed: i64,
}

// =============================================================================
// JOBS
// =============================================================================

/// Status of a job in the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

/// Type of job to process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobType {
    /// Pull posts from WordPress and replace their chunks in the vector store
    PostSynchronization,
}

impl JobType {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobType::PostSynchronization => "post_synchronization",
        }
    }
}

/// A job in the processing queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: Uuid,
    pub job_type: JobType,
    pub status: JobStatus,
    pub payload: Option<JsonValue>,
    pub result: Option<JsonValue>,
    pub error_message: Option<String>,
    pub progress_percent: i32,
    pub progress_message: Option<String>,
    /// Earliest time the job may be claimed.
    pub run_after: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Payload of a [`JobType::PostSynchronization`] job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncPostsPayload {
    pub progress_id: i64,
    pub modified_after: DateTime<Utc>,
}
