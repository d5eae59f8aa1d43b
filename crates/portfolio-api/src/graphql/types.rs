//! GraphQL object and input types.

use async_graphql::{InputObject, SimpleObject};
use chrono::{DateTime, Utc};

use portfolio_core::{
    Dataset, DatasetProperty, IssueCount, Post, PropertyType, SynchronizationProgress,
};

#[derive(Debug, Clone, SimpleObject)]
#[graphql(name = "DatasetProperty")]
pub struct DatasetPropertyObject {
    pub id: String,
    pub name: String,
    #[graphql(name = "type")]
    pub property_type: String,
    pub description: Option<String>,
    pub is_vector: bool,
    pub is_indexed: bool,
}

impl From<DatasetProperty> for DatasetPropertyObject {
    fn from(p: DatasetProperty) -> Self {
        Self {
            id: p.id().to_string(),
            property_type: p.property_type.as_str().to_string(),
            name: p.name,
            description: p.description,
            is_vector: p.is_vector,
            is_indexed: p.is_indexed,
        }
    }
}

#[derive(Debug, Clone, SimpleObject)]
#[graphql(name = "Dataset")]
pub struct DatasetObject {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub properties: Vec<DatasetPropertyObject>,
}

impl From<Dataset> for DatasetObject {
    fn from(d: Dataset) -> Self {
        Self {
            id: d.id().to_string(),
            name: d.name,
            description: d.description,
            properties: d.properties.into_iter().map(Into::into).collect(),
        }
    }
}

/// A WordPress post as exposed to API clients.
#[derive(Debug, Clone, SimpleObject)]
#[graphql(name = "Post")]
pub struct PostObject {
    pub id: String,
    pub post_id: String,
    pub post_title: String,
    pub post_excerpt: String,
    pub post_content: String,
    pub post_date: DateTime<Utc>,
    pub post_author: String,
    pub post_categories: Option<String>,
    pub post_tags: Option<String>,
    pub post_url: Option<String>,
}

impl From<Post> for PostObject {
    fn from(p: Post) -> Self {
        let post_id = p.post_id.to_string();
        Self {
            id: if p.id.is_empty() { post_id.clone() } else { p.id },
            post_id,
            post_title: p.title,
            post_excerpt: p.excerpt,
            post_content: p.content,
            post_date: p.date,
            post_author: p.author,
            post_categories: p.categories,
            post_tags: p.tags,
            post_url: p.url,
        }
    }
}

#[derive(Debug, Clone, SimpleObject)]
#[graphql(name = "PostSynchronizationProgress")]
pub struct ProgressObject {
    pub id: i64,
    /// `pending`, `in_progress`, `completed` or `failed`.
    pub status: String,
    pub progress: i32,
    pub message: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<SynchronizationProgress> for ProgressObject {
    fn from(p: SynchronizationProgress) -> Self {
        Self {
            id: p.id,
            status: p.status.as_str().to_string(),
            progress: p.progress,
            message: p.message,
            created_at: p.created_at,
            updated_at: p.updated_at,
        }
    }
}

#[derive(Debug, Clone, SimpleObject)]
#[graphql(name = "GithubIssueCount")]
pub struct IssueCountObject {
    pub repository: String,
    pub url: String,
    pub all: i64,
    pub closed: i64,
    pub open: i64,
    pub title: Option<String>,
    pub description: Option<String>,
    pub icon: Option<String>,
}

impl From<IssueCount> for IssueCountObject {
    fn from(c: IssueCount) -> Self {
        Self {
            repository: c.repository,
            url: c.url,
            all: c.all,
            closed: c.closed,
            open: c.open,
            title: Some(c.title),
            description: Some(c.description),
            icon: Some(c.icon),
        }
    }
}

#[derive(Debug, Clone, InputObject)]
pub struct DatasetPropertyInput {
    pub name: String,
    /// Unknown type names are stored as `text`.
    #[graphql(name = "type")]
    pub property_type: String,
    pub description: Option<String>,
    #[graphql(default)]
    pub is_vector: bool,
    #[graphql(default)]
    pub is_indexed: bool,
}

#[derive(Debug, Clone, InputObject)]
pub struct DatasetInput {
    pub name: String,
    pub description: Option<String>,
    pub properties: Option<Vec<DatasetPropertyInput>>,
}

impl From<DatasetInput> for Dataset {
    fn from(input: DatasetInput) -> Self {
        Dataset {
            name: input.name,
            description: input.description,
            properties: input
                .properties
                .unwrap_or_default()
                .into_iter()
                .map(|p| DatasetProperty {
                    property_type: PropertyType::parse_lenient(&p.property_type),
                    name: p.name,
                    description: p.description,
                    is_vector: p.is_vector,
                    is_indexed: p.is_indexed,
                })
                .collect(),
        }
    }
}
