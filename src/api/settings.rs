//! Settings API endpoints
//!
//! - GET /api/settings/public - Site name, description, maintenance flag (public)
//! - GET /api/settings - All settings, or one with `?key=` (admin)
//! - POST /api/settings - Upsert a typed setting (admin)
//! - DELETE /api/settings/{key} - Remove a setting (admin)

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    routing::{delete, get},
    Router,
};
use serde::Deserialize;

use crate::api::common::{non_empty, ApiQuery, ApiResponse, ValidatedJson};
use crate::api::middleware::{ApiError, AppState};
use crate::models::{Setting, UpsertSettingInput};

#[derive(Debug, Deserialize)]
pub struct SettingsQuery {
    pub key: Option<String>,
}

pub fn public_routes() -> Router<AppState> {
    Router::new().route("/settings/public", get(public_settings))
}

pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/settings", get(get_settings).post(upsert_setting))
        .route("/settings/{key}", delete(delete_setting))
}

async fn public_settings(
    State(state): State<AppState>,
) -> Result<ApiResponse<serde_json::Map<String, serde_json::Value>>, ApiError> {
    Ok(ApiResponse::data(state.settings_service.public_settings().await?))
}

async fn get_settings(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<SettingsQuery>,
) -> Result<axum::response::Response, ApiError> {
    match non_empty(query.key) {
        Some(key) => {
            let setting = state.settings_service.get(&key).await?;
            Ok(ApiResponse::data(setting).into_response())
        }
        None => {
            let settings: Vec<Setting> = state.settings_service.list().await?;
            Ok(ApiResponse::data(settings).into_response())
        }
    }
}

async fn upsert_setting(
    State(state): State<AppState>,
    ValidatedJson(input): ValidatedJson<UpsertSettingInput>,
) -> Result<ApiResponse<Setting>, ApiError> {
    let setting = state.settings_service.upsert(input).await?;
    Ok(ApiResponse::data(setting).with_message("Setting saved successfully"))
}

async fn delete_setting(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<ApiResponse<()>, ApiError> {
    state.settings_service.delete(&key).await?;
    Ok(ApiResponse::message("Setting deleted successfully"))
}
