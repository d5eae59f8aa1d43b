use async_graphql::{Context, Object, Result};
use tracing::debug;

use portfolio_auth::READ_ROLES;
use portfolio_core::{FlexibleDateTime, IssueCount, Post, PostSource, ProgressRepository};

use super::require;
use super::types::{DatasetObject, IssueCountObject, PostObject, ProgressObject};
use crate::services::{RequestFacts, ResponseCache, VaryOn};
use crate::state::AppState;

const ISSUE_COUNTS_CACHE_NAME: &str = "github_issue_counts";
const POSTS_CACHE_NAME: &str = "posts";

/// Posts are keyed on the parsed date, so equivalent spellings share an entry.
fn posts_cache_key(cache: &ResponseCache, after: &FlexibleDateTime, facts: &RequestFacts) -> String {
    cache.cache_key(POSTS_CACHE_NAME, &[after.to_string()], facts, &[VaryOn::Args])
}

pub struct QueryRoot;

#[Object]
impl QueryRoot {
    /// Every collection in the vector store, or only the one called `name`.
    async fn datasets(&self, ctx: &Context<'_>, name: Option<String>) -> Result<Vec<DatasetObject>> {
        require(ctx, READ_ROLES)?;
        let state = ctx.data::<AppState>()?;

        let datasets = match name.filter(|n| !n.trim().is_empty()) {
            None => state.weaviate.list_collections().await?,
            Some(name) => state.weaviate.get_collection(&name).await?.into_iter().collect(),
        };
        Ok(datasets.into_iter().map(Into::into).collect())
    }

    /// WordPress posts modified after `modifiedDate`, cached per date.
    async fn posts(&self, ctx: &Context<'_>, modified_date: String) -> Result<Vec<PostObject>> {
        require(ctx, READ_ROLES)?;
        let state = ctx.data::<AppState>()?;

        let after = FlexibleDateTime::parse(&modified_date)?;
        let facts = ctx.data_opt::<RequestFacts>().cloned().unwrap_or_default();
        let key = posts_cache_key(&state.cache, &after, &facts);

        let posts = match state.cache.get::<Vec<Post>>(&key).await {
            Some(posts) => posts,
            None => {
                let posts = state.wordpress.posts_modified_after(after.into_inner()).await?;
                state.cache.set(&key, &posts).await;
                posts
            }
        };
        Ok(posts.into_iter().map(Into::into).collect())
    }

    async fn post_synchronization_status(
        &self,
        ctx: &Context<'_>,
        task_id: i64,
    ) -> Result<Option<ProgressObject>> {
        require(ctx, READ_ROLES)?;
        let state = ctx.data::<AppState>()?;

        Ok(state.progress.get(task_id).await?.map(Into::into))
    }

    /// Issue totals for the portfolio repositories. Public and cached.
    async fn github_issue_counts(&self, ctx: &Context<'_>) -> Result<Vec<IssueCountObject>> {
        let state = ctx.data::<AppState>()?;
        let facts = ctx.data_opt::<RequestFacts>().cloned().unwrap_or_default();
        let key = state
            .cache
            .cache_key(ISSUE_COUNTS_CACHE_NAME, &[], &facts, &[]);

        let counts = match state.cache.get::<Vec<IssueCount>>(&key).await {
            Some(counts) => counts,
            None => {
                let counts = state.github.issue_counts().await?;
                debug!(
                    subsystem = "api",
                    component = "graphql",
                    result_count = counts.len(),
                    "Fetched GitHub issue counts"
                );
                state.cache.set(&key, &counts).await;
                counts
            }
        };
        Ok(counts.into_iter().map(Into::into).collect())
    }
}
