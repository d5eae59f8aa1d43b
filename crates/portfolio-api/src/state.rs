//! Shared application state.

use std::sync::Arc;

use portfolio_auth::{DeviceTokenService, JwtService};
use portfolio_clients::{GithubClient, WeaviateClient, WordPressClient};
use portfolio_core::{JobRepository, ProgressRepository};
use portfolio_db::Database;

use crate::config::ApiConfig;
use crate::graphql::ApiSchema;
use crate::services::ResponseCache;

/// Application state handed to every handler.
///
/// Progress records and the job queue are held as trait objects so the
/// GraphQL layer can run against in-memory repositories.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub jwt: Arc<JwtService>,
    pub devices: Arc<DeviceTokenService>,
    pub wordpress: Arc<WordPressClient>,
    pub weaviate: Arc<WeaviateClient>,
    pub github: Arc<GithubClient>,
    pub progress: Arc<dyn ProgressRepository>,
    pub jobs: Arc<dyn JobRepository>,
    pub cache: ResponseCache,
    pub config: Arc<ApiConfig>,
    pub schema: ApiSchema,
}
