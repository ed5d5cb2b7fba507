//! Post API endpoints
//!
//! - GET /api/posts - List posts (public)
//! - GET /api/posts/{id} - Post with comments (public)
//! - POST /api/posts - Create (auth)
//! - PUT /api/posts/{id} - Update, author or admin (auth)
//! - DELETE /api/posts/{id} - Delete, author or admin (auth)

use axum::{
    extract::{Path, State},
    routing::get,
    Router,
};
use serde::Deserialize;

use crate::api::common::{non_empty, ApiQuery, ApiResponse, PaginationQuery, ValidatedJson};
use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::models::{CreatePostInput, PostDetail, PostFilter, PostStatus, UpdatePostInput};

const DEFAULT_LIMIT: i64 = 10;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListPostsQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub status: Option<String>,
    pub search: Option<String>,
    pub category_id: Option<i64>,
    pub tag_id: Option<i64>,
}

impl ListPostsQuery {
    fn filter(&self) -> Result<PostFilter, ApiError> {
        let status = non_empty(self.status.clone())
            .map(|s| s.parse::<PostStatus>())
            .transpose()
            .map_err(|_| ApiError::bad_request("Invalid status"))?;

        Ok(PostFilter {
            status,
            search: non_empty(self.search.clone()),
            category_id: self.category_id,
            tag_id: self.tag_id,
        })
    }
}

/// Routes readable without signing in
pub fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/posts", get(list_posts))
        .route("/posts/{id}", get(get_post))
}

/// Routes behind `require_auth`
pub fn protected_routes() -> Router<AppState> {
    Router::new()
        .route("/posts", axum::routing::post(create_post))
        .route("/posts/{id}", axum::routing::put(update_post).delete(delete_post))
}

/// GET /api/posts
async fn list_posts(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ListPostsQuery>,
) -> Result<ApiResponse<Vec<PostDetail>>, ApiError> {
    let filter = query.filter()?;
    let params = PaginationQuery {
        page: query.page,
        limit: query.limit,
    }
    .params(DEFAULT_LIMIT);

    let result = state.post_service.list(&filter, &params).await?;
    Ok(ApiResponse::paged(result))
}

/// GET /api/posts/{id}
async fn get_post(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<ApiResponse<PostDetail>, ApiError> {
    Ok(ApiResponse::data(state.post_service.get(id).await?))
}

/// POST /api/posts
async fn create_post(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    ValidatedJson(input): ValidatedJson<CreatePostInput>,
) -> Result<ApiResponse<PostDetail>, ApiError> {
    let post = state.post_service.create(input, &user).await?;
    Ok(ApiResponse::data(post).with_message("Post created successfully"))
}

/// PUT /api/posts/{id}
async fn update_post(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<i64>,
    ValidatedJson(input): ValidatedJson<UpdatePostInput>,
) -> Result<ApiResponse<PostDetail>, ApiError> {
    let post = state.post_service.update(id, input, &user).await?;
    Ok(ApiResponse::data(post).with_message("Post updated successfully"))
}

/// DELETE /api/posts/{id}
async fn delete_post(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<ApiResponse<()>, ApiError> {
    state.post_service.delete(id, &user).await?;
    Ok(ApiResponse::message("Post deleted successfully"))
}
