//! `/graphql/v1` execution and the GraphiQL page.

use std::net::SocketAddr;

use async_graphql::http::GraphiQLSource;
use axum::extract::{ConnectInfo, State};
use axum::http::{header, HeaderMap};
use axum::response::Html;
use axum::Json;

use crate::auth::MaybeAuthUser;
use crate::services::RequestFacts;
use crate::state::AppState;

pub const GRAPHQL_PATH: &str = "/graphql/v1";

fn header_str(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Client address: first `X-Forwarded-For` hop, then `X-Real-IP`, then the peer.
fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> Option<String> {
    header_str(headers, "x-forwarded-for")
        .and_then(|v| v.split(',').next().map(|s| s.trim().to_string()))
        .filter(|v| !v.is_empty())
        .or_else(|| header_str(headers, "x-real-ip"))
        .or_else(|| peer.map(|p| p.ip().to_string()))
}

/// POST /graphql/v1
pub async fn execute(
    State(state): State<AppState>,
    viewer: MaybeAuthUser,
    peer: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    Json(request): Json<async_graphql::Request>,
) -> Json<async_graphql::Response> {
    let facts = RequestFacts {
        user_agent: header_str(&headers, header::USER_AGENT.as_str()),
        ip: client_ip(&headers, peer.map(|ConnectInfo(addr)| addr)),
        user: viewer.0.as_ref().map(|u| u.username.clone()),
    };

    let request = request.data(state.clone()).data(viewer).data(facts);
    Json(state.schema.execute(request).await)
}

/// GET /graphql/v1
pub async fn graphiql() -> Html<String> {
    Html(GraphiQLSource::build().endpoint(GRAPHQL_PATH).finish())
}
