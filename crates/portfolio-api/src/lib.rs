//! # portfolio-api
//!
//! HTTP surface of the portfolio admin backend:
//! - REST token endpoints under `/api/auth/v1` and `/api/device/v1`
//! - The GraphQL schema at `/graphql/v1` (datasets, posts, synchronization,
//!   GitHub issue counts)
//! - A Redis response cache for public GraphQL fields

pub mod auth;
pub mod config;
pub mod error;
pub mod graphql;
pub mod handlers;
pub mod services;
pub mod state;

use axum::http::{header, HeaderValue, Method};
use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::request_id::{
    MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer,
};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

pub use config::{parse_allowed_origins, ApiConfig};
pub use error::ApiError;
pub use graphql::{build_schema, ApiSchema};
pub use services::ResponseCache;
pub use state::AppState;

/// Request ids are UUIDv7 so they sort by arrival time in the logs.
#[derive(Clone, Default)]
pub struct MakeRequestUuidV7;

impl MakeRequestId for MakeRequestUuidV7 {
    fn make_request_id<B>(&mut self, _request: &axum::http::Request<B>) -> Option<RequestId> {
        let id = Uuid::now_v7().to_string().parse().ok()?;
        Some(RequestId::new(id))
    }
}

fn cors_layer(allowed_origins: Vec<HeaderValue>) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed_origins))
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
        .allow_credentials(true)
        .max_age(std::time::Duration::from_secs(3600))
}

/// Build the application router with tracing, request-id and CORS layers.
pub fn router(state: AppState, allowed_origins: Vec<HeaderValue>) -> Router {
    use handlers::auth as auth_handlers;

    Router::new()
        .route("/", get(handlers::index))
        .route("/health", get(handlers::health))
        .route("/api/auth/v1/token", post(auth_handlers::issue_token))
        .route("/api/auth/v1/refresh", post(auth_handlers::refresh_token))
        .route("/api/auth/v1/me", get(auth_handlers::me))
        .route(
            "/api/auth/v1/device-token",
            post(auth_handlers::create_device_token).get(auth_handlers::list_device_tokens),
        )
        .route(
            "/api/auth/v1/device-token/:id",
            delete(auth_handlers::revoke_device_token),
        )
        .route("/api/device/v1/me", get(auth_handlers::device_me))
        .route(
            handlers::graphql::GRAPHQL_PATH,
            get(handlers::graphql::graphiql).post(handlers::graphql::execute),
        )
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV7))
        .layer(cors_layer(allowed_origins))
        .with_state(state)
}
