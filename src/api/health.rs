//! Health check endpoint
//!
//! - GET /api/health - Liveness plus a database ping

use axum::{extract::State, routing::get, Router};
use serde::Serialize;

use crate::api::common::ApiResponse;
use crate::api::middleware::AppState;

#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub database: &'static str,
    pub version: &'static str,
}

pub fn public_routes() -> Router<AppState> {
    Router::new().route("/health", get(health))
}

async fn health(State(state): State<AppState>) -> ApiResponse<HealthStatus> {
    let database = match state.pool.ping().await {
        Ok(()) => "ok",
        Err(e) => {
            tracing::warn!("Database ping failed: {}", e);
            "error"
        }
    };

    ApiResponse::data(HealthStatus {
        status: "ok",
        database,
        version: env!("CARGO_PKG_VERSION"),
    })
}
