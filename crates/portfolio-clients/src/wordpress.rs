//! WordPress REST API (v2) client.
//!
//! Lists posts modified after a date and resolves their category, tag and
//! author ids to names. Name lookups are cached for the lifetime of the
//! client.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::Value as JsonValue;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use portfolio_core::{defaults, Error, FlexibleDateTime, Post, PostSource, Result};

use crate::html::clean_html;

/// Fields requested for each post.
pub const POST_FIELDS: &[&str] = &[
    "id",
    "title",
    "excerpt",
    "content",
    "date_gmt",
    "author",
    "categories",
    "tags",
    "link",
];

/// Concurrent post conversions (term lookups) per listing.
const CONVERSION_CONCURRENCY: usize = 8;

/// Resource collections the client reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Categories,
    Posts,
    Users,
    Tags,
}

impl Endpoint {
    pub fn path(&self) -> &'static str {
        match self {
            Endpoint::Categories => "categories",
            Endpoint::Posts => "posts",
            Endpoint::Users => "users",
            Endpoint::Tags => "tags",
        }
    }
}

/// One page of a list endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct PaginatedResponse {
    pub data: Vec<JsonValue>,
    pub total: u64,
    pub total_pages: u32,
    pub page: u32,
    pub per_page: u32,
}

impl PaginatedResponse {
    fn empty(page: u32, per_page: u32) -> Self {
        Self {
            data: Vec::new(),
            total: 0,
            total_pages: 1,
            page,
            per_page,
        }
    }
}

/// Configuration for the WordPress client.
#[derive(Debug, Clone)]
pub struct WordPressConfig {
    /// REST base, e.g. `https://blog.example.com/wp-json/wp/v2`.
    pub base_url: String,
    pub user: String,
    /// Application password.
    pub key: String,
    pub timeout_seconds: u64,
}

impl WordPressConfig {
    /// Load from `WORDPRESS_BACKEND`, `WORDPRESS_USER`, `WORDPRESS_KEY` and
    /// `WORDPRESS_TIMEOUT`.
    pub fn from_env() -> Result<Self> {
        let base_url = std::env::var("WORDPRESS_BACKEND")
            .map_err(|_| Error::Config("WORDPRESS_BACKEND is not set".into()))?;
        Ok(Self {
            base_url,
            user: std::env::var("WORDPRESS_USER").unwrap_or_default(),
            key: std::env::var("WORDPRESS_KEY").unwrap_or_default(),
            timeout_seconds: std::env::var("WORDPRESS_TIMEOUT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults::WORDPRESS_TIMEOUT_SECS),
        })
    }

    /// Value of the `Authorization` header.
    pub fn basic_auth(&self) -> String {
        let token = base64::engine::general_purpose::STANDARD
            .encode(format!("{}:{}", self.user, self.key));
        format!("Basic {token}")
    }
}

#[derive(Debug, Default, Deserialize)]
struct Rendered {
    #[serde(default)]
    rendered: String,
}

#[derive(Debug, Deserialize)]
struct WpPost {
    id: i64,
    #[serde(default)]
    title: Rendered,
    #[serde(default)]
    excerpt: Rendered,
    #[serde(default)]
    content: Rendered,
    #[serde(default)]
    date_gmt: Option<String>,
    #[serde(default)]
    author: i64,
    #[serde(default)]
    categories: Vec<i64>,
    #[serde(default)]
    tags: Vec<i64>,
    #[serde(default)]
    link: Option<String>,
}

/// WordPress REST client with per-client term name caches.
pub struct WordPressClient {
    client: Client,
    config: WordPressConfig,
    categories: RwLock<HashMap<i64, String>>,
    tags: RwLock<HashMap<i64, String>>,
    authors: RwLock<HashMap<i64, String>>,
}

impl WordPressClient {
    pub fn new(config: WordPressConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        let auth = HeaderValue::from_str(&config.basic_auth())
            .map_err(|e| Error::Config(format!("Invalid WordPress credentials: {}", e)))?;
        headers.insert(AUTHORIZATION, auth);

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .default_headers(headers)
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        info!(
            subsystem = "clients",
            component = "wordpress",
            base_url = %config.base_url,
            "Initializing WordPress client"
        );

        Ok(Self {
            client,
            config,
            categories: RwLock::new(HashMap::new()),
            tags: RwLock::new(HashMap::new()),
            authors: RwLock::new(HashMap::new()),
        })
    }

    pub fn from_env() -> Result<Self> {
        Self::new(WordPressConfig::from_env()?)
    }

    pub fn config(&self) -> &WordPressConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn field_params(fields: &[&str]) -> Vec<(String, String)> {
        fields
            .iter()
            .enumerate()
            .map(|(i, f)| (format!("_fields[{i}]"), f.to_string()))
            .collect()
    }

    /// Fetch one page of `endpoint`.
    ///
    /// A non-200 response or a body that is not a non-empty array yields an
    /// empty page. Transport failures are errors.
    pub async fn fetch_list(
        &self,
        endpoint: Endpoint,
        filters: &[(&str, String)],
        fields: &[&str],
        page: u32,
        per_page: u32,
    ) -> Result<PaginatedResponse> {
        let mut params: Vec<(String, String)> = vec![
            ("page".into(), page.to_string()),
            ("per_page".into(), per_page.to_string()),
        ];
        params.extend(filters.iter().map(|(k, v)| (k.to_string(), v.clone())));
        params.extend(Self::field_params(fields));

        let response = self
            .client
            .get(self.url(endpoint.path()))
            .query(&params)
            .send()
            .await
            .map_err(|e| Error::Upstream(format!("WordPress request failed: {}", e)))?;

        if response.status() != StatusCode::OK {
            warn!(
                subsystem = "clients",
                component = "wordpress",
                endpoint = endpoint.path(),
                page,
                status = response.status().as_u16(),
                "WordPress list request returned non-OK status"
            );
            return Ok(PaginatedResponse::empty(page, per_page));
        }

        let header_number = |name: &str| -> Option<u64> {
            response
                .headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse().ok())
        };
        let total = header_number("X-WP-Total");
        let total_pages = header_number("X-WP-TotalPages");

        let data = match response.json::<JsonValue>().await {
            Ok(JsonValue::Array(items)) if !items.is_empty() => items,
            _ => return Ok(PaginatedResponse::empty(page, per_page)),
        };

        Ok(PaginatedResponse {
            total: total.unwrap_or(data.len() as u64),
            total_pages: total_pages.map(|p| p as u32).unwrap_or(1),
            data,
            page,
            per_page,
        })
    }

    /// Fetch a single item. Non-200 responses yield `None`.
    pub async fn fetch_details(
        &self,
        endpoint: Endpoint,
        id: i64,
        fields: &[&str],
    ) -> Result<Option<JsonValue>> {
        let response = self
            .client
            .get(self.url(&format!("{}/{}", endpoint.path(), id)))
            .query(&Self::field_params(fields))
            .send()
            .await
            .map_err(|e| Error::Upstream(format!("WordPress request failed: {}", e)))?;

        if response.status() != StatusCode::OK {
            debug!(
                subsystem = "clients",
                component = "wordpress",
                endpoint = endpoint.path(),
                id,
                status = response.status().as_u16(),
                "WordPress item not available"
            );
            return Ok(None);
        }
        Ok(response.json::<JsonValue>().await.ok())
    }

    async fn term_name(
        &self,
        cache: &RwLock<HashMap<i64, String>>,
        endpoint: Endpoint,
        id: i64,
    ) -> Result<Option<String>> {
        if let Some(name) = cache.read().await.get(&id) {
            return Ok(Some(name.clone()));
        }
        let name = self
            .fetch_details(endpoint, id, &["name"])
            .await?
            .and_then(|v| v.get("name").and_then(|n| n.as_str()).map(str::to_string));
        if let Some(ref name) = name {
            cache.write().await.insert(id, name.clone());
        }
        Ok(name)
    }

    /// Names for `ids`, in order. Ids that cannot be resolved are skipped.
    pub async fn category_names(&self, ids: &[i64]) -> Result<Vec<String>> {
        let mut names = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(name) = self.term_name(&self.categories, Endpoint::Categories, *id).await? {
                names.push(name);
            }
        }
        Ok(names)
    }

    pub async fn tag_names(&self, ids: &[i64]) -> Result<Vec<String>> {
        let mut names = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(name) = self.term_name(&self.tags, Endpoint::Tags, *id).await? {
                names.push(name);
            }
        }
        Ok(names)
    }

    /// Author display name, or an empty string when it cannot be resolved.
    pub async fn author_name(&self, id: i64) -> Result<String> {
        if id == 0 {
            return Ok(String::new());
        }
        Ok(self
            .term_name(&self.authors, Endpoint::Users, id)
            .await?
            .unwrap_or_default())
    }

    /// Convert a raw WordPress post into a [`Post`]. Returns `None` for
    /// values that are not post objects.
    pub async fn to_post(&self, raw: JsonValue) -> Result<Option<Post>> {
        let wp: WpPost = match serde_json::from_value(raw) {
            Ok(wp) => wp,
            Err(e) => {
                warn!(
                    subsystem = "clients",
                    component = "wordpress",
                    error = %e,
                    "Skipping malformed WordPress post"
                );
                return Ok(None);
            }
        };

        let categories = self.category_names(&wp.categories).await?;
        let tags = self.tag_names(&wp.tags).await?;
        let author = self.author_name(wp.author).await?;

        let date = wp
            .date_gmt
            .as_deref()
            .and_then(|d| FlexibleDateTime::parse(d).ok())
            .map(|d| d.0)
            .unwrap_or_else(Utc::now);

        Ok(Some(Post {
            id: String::new(),
            post_id: wp.id,
            title: clean_html(&wp.title.rendered),
            excerpt: clean_html(&wp.excerpt.rendered),
            content: clean_html(&wp.content.rendered),
            date,
            author,
            categories: join_names(categories),
            tags: join_names(tags),
            url: wp.link,
        }))
    }

    /// Every post modified after `after`, oldest first.
    pub async fn get_posts(&self, after: DateTime<Utc>) -> Result<Vec<Post>> {
        let per_page = defaults::WORDPRESS_PAGE_SIZE;
        let filters = [
            ("orderby", "date".to_string()),
            ("order", "asc".to_string()),
            (
                "modified_after",
                after.format("%Y-%m-%dT%H:%M:%S").to_string(),
            ),
        ];

        let first = self
            .fetch_list(Endpoint::Posts, &filters, POST_FIELDS, 1, per_page)
            .await?;
        let total_pages = first.total_pages;
        let mut raw = first.data;

        if total_pages > 1 {
            let pages = futures::future::try_join_all((2..=total_pages).map(|page| {
                self.fetch_list(Endpoint::Posts, &filters, POST_FIELDS, page, per_page)
            }))
            .await?;
            for page in pages {
                raw.extend(page.data);
            }
        }

        debug!(
            subsystem = "clients",
            component = "wordpress",
            total_pages,
            post_count = raw.len(),
            "Fetched WordPress posts"
        );

        let converted: Vec<Result<Option<Post>>> = stream::iter(raw)
            .map(|value| self.to_post(value))
            .buffered(CONVERSION_CONCURRENCY)
            .collect()
            .await;

        let mut posts = Vec::with_capacity(converted.len());
        for post in converted {
            if let Some(post) = post? {
                posts.push(post);
            }
        }
        Ok(posts)
    }
}

fn join_names(names: Vec<String>) -> Option<String> {
    if names.is_empty() {
        None
    } else {
        Some(names.join(","))
    }
}

#[async_trait]
impl PostSource for WordPressClient {
    async fn posts_modified_after(&self, after: DateTime<Utc>) -> Result<Vec<Post>> {
        self.get_posts(after).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> WordPressConfig {
        WordPressConfig {
            base_url: "http://localhost/wp-json/wp/v2/".into(),
            user: "editor".into(),
            key: "app pass".into(),
            timeout_seconds: 5,
        }
    }

    #[test]
    fn test_basic_auth_header() {
        // base64("editor:app pass")
        assert_eq!(config().basic_auth(), "Basic ZWRpdG9yOmFwcCBwYXNz");
    }

    #[test]
    fn test_url_joins_without_double_slash() {
        let client = WordPressClient::new(config()).unwrap();
        assert_eq!(
            client.url("posts"),
            "http://localhost/wp-json/wp/v2/posts"
        );
    }

    #[test]
    fn test_field_params_are_indexed() {
        let params = WordPressClient::field_params(&["id", "title"]);
        assert_eq!(
            params,
            vec![
                ("_fields[0]".to_string(), "id".to_string()),
                ("_fields[1]".to_string(), "title".to_string()),
            ]
        );
    }

    #[test]
    fn test_join_names() {
        assert_eq!(join_names(vec![]), None);
        assert_eq!(
            join_names(vec!["Rust".into(), "Django".into()]),
            Some("Rust,Django".into())
        );
    }

    #[test]
    fn test_endpoint_paths() {
        assert_eq!(Endpoint::Categories.path(), "categories");
        assert_eq!(Endpoint::Users.path(), "users");
    }
}
