//! Comment API endpoints
//!
//! - GET /api/posts/{id}/comments - Comments on a post (public)
//! - POST /api/posts/{id}/comments - Comment on a post (auth)
//! - DELETE /api/comments/{id} - Comment author, post author or admin (auth)

use axum::{
    extract::{Path, State},
    routing::{delete, get, post},
    Router,
};

use crate::api::common::{ApiResponse, ValidatedJson};
use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::models::{CommentWithAuthor, CreateCommentInput};

pub fn public_routes() -> Router<AppState> {
    Router::new().route("/posts/{id}/comments", get(list_comments))
}

pub fn protected_routes() -> Router<AppState> {
    Router::new()
        .route("/posts/{id}/comments", post(create_comment))
        .route("/comments/{id}", delete(delete_comment))
}

async fn list_comments(
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
) -> Result<ApiResponse<Vec<CommentWithAuthor>>, ApiError> {
    Ok(ApiResponse::data(
        state.comment_service.list_for_post(post_id).await?,
    ))
}

async fn create_comment(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(post_id): Path<i64>,
    ValidatedJson(input): ValidatedJson<CreateCommentInput>,
) -> Result<ApiResponse<CommentWithAuthor>, ApiError> {
    let comment = state.comment_service.create(post_id, input, &user).await?;
    Ok(ApiResponse::data(comment).with_message("Comment created successfully"))
}

async fn delete_comment(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<ApiResponse<()>, ApiError> {
    state.comment_service.delete(id, &user).await?;
    Ok(ApiResponse::message("Comment deleted successfully"))
}
