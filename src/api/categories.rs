//! Category API endpoints
//!
//! - GET /api/categories - List with post counts (public)
//! - GET /api/categories/{id} - Single category (public)
//! - POST /api/categories - Create (auth)
//! - PUT /api/categories/{id}, DELETE /api/categories/{id} - Admin only

use axum::{
    extract::{Path, State},
    routing::{get, post, put},
    Router,
};
use serde::Deserialize;

use crate::api::common::{non_empty, ApiQuery, ApiResponse, ValidatedJson};
use crate::api::middleware::{ApiError, AppState};
use crate::models::{CategoryWithCount, CreateCategoryInput, UpdateCategoryInput};

/// `search` and `includePosts`, shared with the tag listing
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxonomyQuery {
    pub search: Option<String>,
    pub include_posts: Option<bool>,
}

pub fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/categories", get(list_categories))
        .route("/categories/{id}", get(get_category))
}

pub fn protected_routes() -> Router<AppState> {
    Router::new().route("/categories", post(create_category))
}

pub fn admin_routes() -> Router<AppState> {
    Router::new().route(
        "/categories/{id}",
        put(update_category).delete(delete_category),
    )
}

async fn list_categories(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<TaxonomyQuery>,
) -> Result<ApiResponse<Vec<CategoryWithCount>>, ApiError> {
    let search = non_empty(query.search);
    let categories = state
        .category_service
        .list(search.as_deref(), query.include_posts.unwrap_or(false))
        .await?;
    Ok(ApiResponse::data(categories))
}

async fn get_category(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<ApiResponse<CategoryWithCount>, ApiError> {
    Ok(ApiResponse::data(state.category_service.get(id).await?))
}

async fn create_category(
    State(state): State<AppState>,
    ValidatedJson(input): ValidatedJson<CreateCategoryInput>,
) -> Result<ApiResponse<CategoryWithCount>, ApiError> {
    let category = state.category_service.create(input).await?;
    Ok(ApiResponse::data(category).with_message("Category created successfully"))
}

async fn update_category(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    ValidatedJson(input): ValidatedJson<UpdateCategoryInput>,
) -> Result<ApiResponse<CategoryWithCount>, ApiError> {
    let category = state.category_service.update(id, input).await?;
    Ok(ApiResponse::data(category).with_message("Category updated successfully"))
}

async fn delete_category(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<ApiResponse<()>, ApiError> {
    state.category_service.delete(id).await?;
    Ok(ApiResponse::message("Category deleted successfully"))
}
