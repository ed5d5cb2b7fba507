//! Website preview API endpoints (all public)
//!
//! - GET|POST /api/website-preview - Metadata preview of a page on a device
//! - GET /api/website-preview/devices - Device and browser catalog
//! - GET|POST /api/website-preview/test - Self description / echo
//! - GET|POST /api/website-screenshot - Simulated screenshot

use axum::{
    extract::{rejection::JsonRejection, State},
    routing::get,
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use validator::Validate;

use crate::api::common::{json_rejection, non_empty, ApiQuery, ApiResponse, ValidatedJson};
use crate::api::middleware::{ApiError, AppState};
use crate::services::preview::{DevicesOverview, PreviewData, Screenshot, ScreenshotRequest};

const FEATURES: [&str; 6] = [
    "Website metadata extraction",
    "Device-specific previews",
    "Browser simulation",
    "Screenshot generation",
    "Multiple device categories",
    "Real-time preview updates",
];

/// Same shape for the query string and the JSON body
#[derive(Debug, Deserialize)]
pub struct PreviewRequest {
    pub url: Option<String>,
    pub device: Option<String>,
    pub browser: Option<String>,
}

pub fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/website-preview", get(preview_query).post(preview_body))
        .route("/website-preview/devices", get(devices))
        .route("/website-preview/test", get(self_test).post(echo))
        .route(
            "/website-screenshot",
            get(screenshot_query).post(screenshot_body),
        )
}

async fn run_preview(state: &AppState, request: PreviewRequest) -> Result<ApiResponse<PreviewData>, ApiError> {
    let url = non_empty(request.url).ok_or_else(|| ApiError::bad_request("URL is required"))?;
    let data = state
        .preview_service
        .preview(&url, request.device.as_deref(), request.browser.as_deref())
        .await?;
    Ok(ApiResponse::data(data))
}

/// GET /api/website-preview
async fn preview_query(
    State(state): State<AppState>,
    ApiQuery(request): ApiQuery<PreviewRequest>,
) -> Result<ApiResponse<PreviewData>, ApiError> {
    run_preview(&state, request).await
}

/// POST /api/website-preview
async fn preview_body(
    State(state): State<AppState>,
    body: Result<Json<PreviewRequest>, JsonRejection>,
) -> Result<ApiResponse<PreviewData>, ApiError> {
    let Json(request) = body.map_err(json_rejection)?;
    run_preview(&state, request).await
}

async fn devices(State(state): State<AppState>) -> ApiResponse<DevicesOverview> {
    ApiResponse::data(state.preview_service.devices_overview())
}

async fn self_test() -> ApiResponse<()> {
    ApiResponse::message("Website Preview API is working!")
        .with("timestamp", json!(Utc::now()))
        .with(
            "endpoints",
            json!({
                "preview": "/api/website-preview",
                "screenshot": "/api/website-screenshot",
                "devices": "/api/website-preview/devices",
                "test": "/api/website-preview/test",
            }),
        )
        .with("features", json!(FEATURES))
}

async fn echo(body: Result<Json<Value>, JsonRejection>) -> Result<ApiResponse<()>, ApiError> {
    let Json(received) = body.map_err(json_rejection)?;
    Ok(ApiResponse::message("Test POST request received")
        .with("receivedData", received)
        .with("timestamp", json!(Utc::now())))
}

/// GET /api/website-screenshot
async fn screenshot_query(
    State(state): State<AppState>,
    ApiQuery(request): ApiQuery<ScreenshotRequest>,
) -> Result<ApiResponse<Screenshot>, ApiError> {
    request
        .validate()
        .map_err(|e| ApiError::validation("Validation failed", &e))?;
    Ok(ApiResponse::data(state.preview_service.screenshot(&request)?))
}

/// POST /api/website-screenshot
async fn screenshot_body(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<ScreenshotRequest>,
) -> Result<ApiResponse<Screenshot>, ApiError> {
    Ok(ApiResponse::data(state.preview_service.screenshot(&request)?))
}
