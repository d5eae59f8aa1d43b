//! HTTP handlers.

pub mod auth;
pub mod graphql;

use axum::Json;
use serde::Serialize;

/// Plain-text banner served at `/`.
pub const BANNER: &str = "Rage against the dying of the light.";

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// GET /
pub async fn index() -> &'static str {
    BANNER
}

/// GET /health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}
