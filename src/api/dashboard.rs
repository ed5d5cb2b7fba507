//! Dashboard API endpoint
//!
//! - GET /api/dashboard?period=N - Site snapshot over the last N days (auth)

use axum::{extract::State, routing::get, Router};
use serde::Deserialize;

use crate::api::common::{ApiQuery, ApiResponse};
use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::services::{Dashboard, DashboardService};

#[derive(Debug, Deserialize)]
pub struct DashboardQuery {
    pub period: Option<i64>,
}

pub fn protected_routes() -> Router<AppState> {
    Router::new().route("/dashboard", get(dashboard))
}

async fn dashboard(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    ApiQuery(query): ApiQuery<DashboardQuery>,
) -> Result<ApiResponse<Dashboard>, ApiError> {
    let days = DashboardService::clamp_period(query.period);
    Ok(ApiResponse::data(
        state.dashboard_service.snapshot(&user, days).await?,
    ))
}
