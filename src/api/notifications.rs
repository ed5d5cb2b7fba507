//! Notification API endpoints
//!
//! Every route acts on the caller's own notifications except creation,
//! which is admin only.
//!
//! - GET /api/notifications - Own notifications plus `unreadCount`
//! - POST /api/notifications - Send to a user (admin)
//! - PATCH /api/notifications/{id} - Mark read
//! - DELETE /api/notifications/{id} - Delete
//! - POST /api/notifications/read-all - Mark all own notifications read

use axum::{
    extract::{Path, State},
    routing::{get, patch, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;

use crate::api::common::{non_empty, ApiQuery, ApiResponse, PaginationQuery, ValidatedJson};
use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::models::{CreateNotificationInput, Notification, NotificationFilter, NotificationType};

const DEFAULT_LIMIT: i64 = 20;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListNotificationsQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub unread_only: Option<bool>,
    #[serde(rename = "type")]
    pub notification_type: Option<String>,
}

pub fn protected_routes() -> Router<AppState> {
    Router::new()
        .route("/notifications", get(list_notifications))
        .route("/notifications/read-all", post(mark_all_read))
        .route(
            "/notifications/{id}",
            patch(mark_read).delete(delete_notification),
        )
}

pub fn admin_routes() -> Router<AppState> {
    Router::new().route("/notifications", post(create_notification))
}

async fn list_notifications(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    ApiQuery(query): ApiQuery<ListNotificationsQuery>,
) -> Result<ApiResponse<Vec<Notification>>, ApiError> {
    let notification_type = non_empty(query.notification_type)
        .map(|t| t.parse::<NotificationType>())
        .transpose()
        .map_err(|_| ApiError::bad_request("Invalid notification type"))?;
    let filter = NotificationFilter {
        unread_only: query.unread_only.unwrap_or(false),
        notification_type,
    };
    let params = PaginationQuery {
        page: query.page,
        limit: query.limit,
    }
    .params(DEFAULT_LIMIT);

    let result = state
        .notification_service
        .list(user.id, &filter, &params)
        .await?;

    Ok(ApiResponse::paged(result.page).with("unreadCount", json!(result.unread_count)))
}

async fn create_notification(
    State(state): State<AppState>,
    ValidatedJson(input): ValidatedJson<CreateNotificationInput>,
) -> Result<ApiResponse<Notification>, ApiError> {
    let notification = state.notification_service.create(input).await?;
    Ok(ApiResponse::data(notification).with_message("Notification created successfully"))
}

async fn mark_read(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<ApiResponse<Notification>, ApiError> {
    let notification = state.notification_service.mark_read(id, user.id).await?;
    Ok(ApiResponse::data(notification).with_message("Notification marked as read"))
}

async fn delete_notification(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<ApiResponse<()>, ApiError> {
    state.notification_service.delete(id, user.id).await?;
    Ok(ApiResponse::message("Notification deleted successfully"))
}

async fn mark_all_read(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<ApiResponse<serde_json::Value>, ApiError> {
    let updated = state.notification_service.mark_all_read(user.id).await?;
    Ok(ApiResponse::data(json!({ "updated": updated }))
        .with_message("All notifications marked as read"))
}
