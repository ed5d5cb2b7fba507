//! Tag API endpoints
//!
//! - GET /api/tags - List with post counts (public)
//! - POST /api/tags - Create (auth)
//! - PUT /api/tags/{id}, DELETE /api/tags/{id} - Admin only

use axum::{
    extract::{Path, State},
    routing::{get, post, put},
    Router,
};

use crate::api::categories::TaxonomyQuery;
use crate::api::common::{non_empty, ApiQuery, ApiResponse, ValidatedJson};
use crate::api::middleware::{ApiError, AppState};
use crate::models::{CreateTagInput, TagWithCount, UpdateTagInput};

pub fn public_routes() -> Router<AppState> {
    Router::new().route("/tags", get(list_tags))
}

pub fn protected_routes() -> Router<AppState> {
    Router::new().route("/tags", post(create_tag))
}

pub fn admin_routes() -> Router<AppState> {
    Router::new().route("/tags/{id}", put(update_tag).delete(delete_tag))
}

async fn list_tags(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<TaxonomyQuery>,
) -> Result<ApiResponse<Vec<TagWithCount>>, ApiError> {
    let search = non_empty(query.search);
    let tags = state
        .tag_service
        .list(search.as_deref(), query.include_posts.unwrap_or(false))
        .await?;
    Ok(ApiResponse::data(tags))
}

async fn create_tag(
    State(state): State<AppState>,
    ValidatedJson(input): ValidatedJson<CreateTagInput>,
) -> Result<ApiResponse<TagWithCount>, ApiError> {
    let tag = state.tag_service.create(input).await?;
    Ok(ApiResponse::data(tag).with_message("Tag created successfully"))
}

async fn update_tag(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    ValidatedJson(input): ValidatedJson<UpdateTagInput>,
) -> Result<ApiResponse<TagWithCount>, ApiError> {
    let tag = state.tag_service.update(id, input).await?;
    Ok(ApiResponse::data(tag).with_message("Tag updated successfully"))
}

async fn delete_tag(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<ApiResponse<()>, ApiError> {
    state.tag_service.delete(id).await?;
    Ok(ApiResponse::message("Tag deleted successfully"))
}
