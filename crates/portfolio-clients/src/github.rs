//! GitHub GraphQL client for repository issue counts.

use std::time::Duration;

use reqwest::Client;
use serde_json::{json, Value as JsonValue};
use tracing::{debug, info};

use portfolio_core::{defaults, Error, GithubRepository, IssueCount, Result};

const ISSUE_COUNT_QUERY: &str = r#"query ($owner: String!, $name: String!) {
  repository(owner: $owner, name: $name) {
    all: issues { totalCount }
    closed: issues(states: CLOSED) { totalCount }
    open: issues(states: OPEN) { totalCount }
  }
}"#;

/// Configuration for the GitHub client.
#[derive(Debug, Clone)]
pub struct GithubConfig {
    pub api_url: String,
    /// Personal access token. Sent as `Authorization: token ...`.
    pub token: String,
    pub owner: String,
    pub timeout_seconds: u64,
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            api_url: defaults::GITHUB_API_URL.to_string(),
            token: String::new(),
            owner: defaults::GITHUB_REPOSITORY_OWNER.to_string(),
            timeout_seconds: defaults::GITHUB_TIMEOUT_SECS,
        }
    }
}

impl GithubConfig {
    /// Load from `GITHUB_API_URL`, `GITHUB_PAT` and `GITHUB_REPOSITORY_OWNER`.
    pub fn from_env() -> Self {
        Self {
            api_url: std::env::var("GITHUB_API_URL")
                .unwrap_or_else(|_| defaults::GITHUB_API_URL.to_string()),
            token: std::env::var("GITHUB_PAT").unwrap_or_default(),
            owner: std::env::var("GITHUB_REPOSITORY_OWNER")
                .unwrap_or_else(|_| defaults::GITHUB_REPOSITORY_OWNER.to_string()),
            ..Default::default()
        }
    }
}

pub struct GithubClient {
    client: Client,
    config: GithubConfig,
}

impl GithubClient {
    pub fn new(config: GithubConfig) -> Result<Self> {
        // GitHub rejects requests without a user agent.
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(concat!("portfolio-admin/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;
        info!(
            subsystem = "clients",
            component = "github",
            owner = %config.owner,
            "Initializing GitHub client"
        );
        Ok(Self { client, config })
    }

    pub fn from_env() -> Result<Self> {
        Self::new(GithubConfig::from_env())
    }

    /// The repositories whose issues are reported.
    pub fn repositories(&self) -> Vec<GithubRepository> {
        GithubRepository::portfolio(&self.config.owner)
    }

    /// Issue totals for `repository`. A response without a repository
    /// object (unknown repository, bad token) yields `None`.
    pub async fn issue_count(&self, repository: &GithubRepository) -> Result<Option<IssueCount>> {
        let body = json!({
            "query": ISSUE_COUNT_QUERY,
            "variables": { "owner": self.config.owner, "name": repository.name },
        });
        let mut req = self.client.post(&self.config.api_url).json(&body);
        if !self.config.token.is_empty() {
            req = req.header("Authorization", format!("token {}", self.config.token));
        }
        let response = req
            .send()
            .await
            .map_err(|e| Error::Upstream(format!("GitHub request failed: {}", e)))?;
        let status = response.status();
        let result: JsonValue = response.json().await.unwrap_or(JsonValue::Null);

        let Some(repo) = result.pointer("/data/repository").filter(|r| r.is_object()) else {
            debug!(
                subsystem = "clients",
                component = "github",
                repository = %repository.name,
                status = status.as_u16(),
                "No repository in GitHub response"
            );
            return Ok(None);
        };
        let total = |alias: &str| -> i64 {
            repo.pointer(&format!("/{alias}/totalCount"))
                .and_then(JsonValue::as_i64)
                .unwrap_or(0)
        };

        Ok(Some(IssueCount {
            repository: repository.name.clone(),
            url: repository.url.clone(),
            title: repository.title.clone(),
            description: repository.description.clone(),
            icon: repository.icon.clone(),
            all: total("all"),
            open: total("open"),
            closed: total("closed"),
        }))
    }

    /// Issue counts for every configured repository, skipping those GitHub
    /// does not report.
    pub async fn issue_counts(&self) -> Result<Vec<IssueCount>> {
        let repos = self.repositories();
        let counts =
            futures::future::try_join_all(repos.iter().map(|r| self.issue_count(r))).await?;
        Ok(counts.into_iter().flatten().collect())
    }
}
