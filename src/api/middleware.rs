//! API middleware
//!
//! Contains:
//! - Shared application state
//! - The error envelope every handler returns on failure
//! - Authentication (auth-token cookie or Bearer JWT)
//! - Authorization (admin flag)

use std::collections::BTreeMap;
use std::fmt::Display;
use std::sync::Arc;

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use validator::ValidationErrors;

use crate::config::Config;
use crate::db::repositories::{
    SqlxAnalyticsRepository, SqlxCategoryRepository, SqlxCommentRepository,
    SqlxNotificationRepository, SqlxPostRepository, SqlxSettingsRepository, SqlxTagRepository,
    SqlxUploadRepository, SqlxUserRepository,
};
use crate::db::DynDatabasePool;
use crate::models::User;
use crate::services::{
    AnalyticsService, AnalyticsServiceError, CategoryService, CategoryServiceError,
    CommentService, CommentServiceError, DashboardService, DashboardServiceError,
    DashboardSources, JwtManager, LoginRateLimiter, NotificationService,
    NotificationServiceError, PostService, PostServiceError, PreviewService, PreviewServiceError,
    SettingsService, SettingsServiceError, TagService, TagServiceError, UploadService,
    UploadServiceError, UserService, UserServiceError,
};

/// Name of the cookie carrying the auth token
pub const AUTH_COOKIE: &str = "auth-token";

/// Application state containing shared services
#[derive(Clone)]
pub struct AppState {
    pub pool: DynDatabasePool,
    pub config: Arc<Config>,
    pub jwt: Arc<JwtManager>,
    pub rate_limiter: Arc<LoginRateLimiter>,
    pub user_service: Arc<UserService>,
    pub post_service: Arc<PostService>,
    pub comment_service: Arc<CommentService>,
    pub category_service: Arc<CategoryService>,
    pub tag_service: Arc<TagService>,
    pub notification_service: Arc<NotificationService>,
    pub upload_service: Arc<UploadService>,
    pub settings_service: Arc<SettingsService>,
    pub analytics_service: Arc<AnalyticsService>,
    pub dashboard_service: Arc<DashboardService>,
    pub preview_service: Arc<PreviewService>,
}

impl AppState {
    /// Wire repositories and services over one pool
    pub fn new(pool: DynDatabasePool, config: Config) -> anyhow::Result<Self> {
        let users = SqlxUserRepository::boxed(pool.clone());
        let posts = SqlxPostRepository::boxed(pool.clone());
        let comments = SqlxCommentRepository::boxed(pool.clone());
        let categories = SqlxCategoryRepository::boxed(pool.clone());
        let tags = SqlxTagRepository::boxed(pool.clone());
        let notifications = SqlxNotificationRepository::boxed(pool.clone());
        let uploads = SqlxUploadRepository::boxed(pool.clone());
        let settings = SqlxSettingsRepository::boxed(pool.clone());
        let analytics = SqlxAnalyticsRepository::boxed(pool.clone());

        let post_service = Arc::new(PostService::new(
            posts.clone(),
            categories.clone(),
            tags.clone(),
            comments.clone(),
            users.clone(),
        ));
        let analytics_service = Arc::new(AnalyticsService::new(analytics.clone(), users.clone()));
        let dashboard_service = Arc::new(DashboardService::new(
            DashboardSources {
                users: users.clone(),
                posts: posts.clone(),
                categories: categories.clone(),
                tags: tags.clone(),
                uploads: uploads.clone(),
                notifications: notifications.clone(),
                analytics,
            },
            post_service.clone(),
            analytics_service.clone(),
        ));

        Ok(Self {
            jwt: Arc::new(JwtManager::from_config(&config.auth)),
            rate_limiter: Arc::new(LoginRateLimiter::new()),
            user_service: Arc::new(UserService::new(users.clone())),
            comment_service: Arc::new(CommentService::new(comments, posts, users.clone())),
            category_service: Arc::new(CategoryService::new(categories)),
            tag_service: Arc::new(TagService::new(tags)),
            notification_service: Arc::new(NotificationService::new(notifications, users.clone())),
            upload_service: Arc::new(UploadService::new(
                Arc::new(config.upload.clone()),
                uploads,
                users,
            )),
            settings_service: Arc::new(SettingsService::new(settings)),
            preview_service: Arc::new(PreviewService::new(&config.preview)?),
            post_service,
            analytics_service,
            dashboard_service,
            config: Arc::new(config),
            pool,
        })
    }
}

/// Authenticated user extracted from request
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub User);

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or_else(ApiError::unauthorized)
    }
}

/// Failure body: `{ success: false, message, errors? }`
#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    success: bool,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    errors: Option<&'a BTreeMap<String, String>>,
}

/// Error response for API errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
    /// Per-field messages for validation failures
    pub errors: Option<BTreeMap<String, String>>,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            errors: None,
        }
    }

    pub fn with_errors(mut self, errors: BTreeMap<String, String>) -> Self {
        self.errors = Some(errors);
        self
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "Unauthorized")
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn too_many_requests(message: impl Into<String>) -> Self {
        Self::new(StatusCode::TOO_MANY_REQUESTS, message)
    }

    /// Log the cause and answer with a fixed message
    pub fn internal_error(cause: impl Display) -> Self {
        tracing::error!(error = %cause, "Request failed");
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
    }

    /// 400 with `message` and the first message of every failing field
    pub fn validation(message: impl Into<String>, errors: &ValidationErrors) -> Self {
        Self::bad_request(message).with_errors(flatten_validation_errors(errors))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            success: false,
            message: &self.message,
            errors: self.errors.as_ref(),
        };
        (self.status, Json(body)).into_response()
    }
}

fn camel_case(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut upper = false;
    for c in field.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

/// `field → first message`, keyed by the JSON (camelCase) field name
pub fn flatten_validation_errors(errors: &ValidationErrors) -> BTreeMap<String, String> {
    errors
        .field_errors()
        .into_iter()
        .filter_map(|(field, errs)| {
            let first = errs.first()?;
            let message = first
                .message
                .as_ref()
                .map(|m| m.to_string())
                .unwrap_or_else(|| format!("Invalid {}", camel_case(&field)));
            Some((camel_case(&field), message))
        })
        .collect()
}

impl From<UserServiceError> for ApiError {
    fn from(e: UserServiceError) -> Self {
        match e {
            UserServiceError::UserExists => Self::bad_request(e.to_string()),
            UserServiceError::InvalidCredentials => Self::new(StatusCode::UNAUTHORIZED, e.to_string()),
            UserServiceError::NotFound => Self::not_found(e.to_string()),
            UserServiceError::InternalError(err) => Self::internal_error(err),
        }
    }
}

impl From<PostServiceError> for ApiError {
    fn from(e: PostServiceError) -> Self {
        match e {
            PostServiceError::NotFound => Self::not_found(e.to_string()),
            PostServiceError::Forbidden => Self::forbidden(e.to_string()),
            PostServiceError::SlugExists
            | PostServiceError::InvalidCategories
            | PostServiceError::InvalidTags => Self::bad_request(e.to_string()),
            PostServiceError::InternalError(err) => Self::internal_error(err),
        }
    }
}

impl From<CommentServiceError> for ApiError {
    fn from(e: CommentServiceError) -> Self {
        match e {
            CommentServiceError::PostNotFound | CommentServiceError::NotFound => {
                Self::not_found(e.to_string())
            }
            CommentServiceError::Forbidden => Self::forbidden(e.to_string()),
            CommentServiceError::InternalError(err) => Self::internal_error(err),
        }
    }
}

impl From<CategoryServiceError> for ApiError {
    fn from(e: CategoryServiceError) -> Self {
        match e {
            CategoryServiceError::NotFound => Self::not_found(e.to_string()),
            CategoryServiceError::Duplicate => Self::bad_request(e.to_string()),
            CategoryServiceError::InternalError(err) => Self::internal_error(err),
        }
    }
}

impl From<TagServiceError> for ApiError {
    fn from(e: TagServiceError) -> Self {
        match e {
            TagServiceError::NotFound => Self::not_found(e.to_string()),
            TagServiceError::Duplicate => Self::bad_request(e.to_string()),
            TagServiceError::InternalError(err) => Self::internal_error(err),
        }
    }
}

impl From<NotificationServiceError> for ApiError {
    fn from(e: NotificationServiceError) -> Self {
        match e {
            NotificationServiceError::NotFound | NotificationServiceError::UserNotFound => {
                Self::not_found(e.to_string())
            }
            NotificationServiceError::InternalError(err) => Self::internal_error(err),
        }
    }
}

impl From<UploadServiceError> for ApiError {
    fn from(e: UploadServiceError) -> Self {
        match e {
            UploadServiceError::TooLarge(_) | UploadServiceError::TypeNotAllowed => {
                Self::bad_request(e.to_string())
            }
            UploadServiceError::NotFound => Self::not_found(e.to_string()),
            UploadServiceError::Forbidden => Self::forbidden(e.to_string()),
            UploadServiceError::InternalError(err) => Self::internal_error(err),
        }
    }
}

impl From<SettingsServiceError> for ApiError {
    fn from(e: SettingsServiceError) -> Self {
        match e {
            SettingsServiceError::NotFound => Self::not_found(e.to_string()),
            SettingsServiceError::InvalidValue(_) => Self::bad_request(e.to_string()),
            SettingsServiceError::InternalError(err) => Self::internal_error(err),
        }
    }
}

impl From<AnalyticsServiceError> for ApiError {
    fn from(e: AnalyticsServiceError) -> Self {
        match e {
            AnalyticsServiceError::InternalError(err) => Self::internal_error(err),
        }
    }
}

impl From<DashboardServiceError> for ApiError {
    fn from(e: DashboardServiceError) -> Self {
        match e {
            DashboardServiceError::InternalError(err) => Self::internal_error(err),
        }
    }
}

impl From<PreviewServiceError> for ApiError {
    fn from(e: PreviewServiceError) -> Self {
        match e {
            PreviewServiceError::InvalidUrl => Self::bad_request(e.to_string()),
            PreviewServiceError::InternalError(err) => Self::internal_error(err),
        }
    }
}

/// Token from the auth cookie, else from `Authorization: Bearer`
pub fn extract_token(headers: &HeaderMap) -> Option<String> {
    let from_cookie = headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|cookies| cookies.split(';'))
        .find_map(|cookie| {
            cookie
                .trim()
                .strip_prefix(AUTH_COOKIE)
                .and_then(|rest| rest.strip_prefix('='))
                .map(str::to_string)
        })
        .filter(|token| !token.is_empty());

    from_cookie.or_else(|| {
        headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(|token| token.trim().to_string())
            .filter(|token| !token.is_empty())
    })
}

/// Resolve the request's token to a live user
pub async fn current_user(state: &AppState, headers: &HeaderMap) -> Option<User> {
    let token = extract_token(headers)?;
    let claims = state.jwt.verify(&token).ok()?;
    match state.user_service.get_by_id(claims.user_id).await {
        Ok(user) => Some(user),
        Err(UserServiceError::NotFound) => None,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to load token user");
            None
        }
    }
}

/// Authentication middleware
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let user = current_user(&state, request.headers())
        .await
        .ok_or_else(ApiError::unauthorized)?;

    request.extensions_mut().insert(AuthenticatedUser(user));
    Ok(next.run(request).await)
}

/// Admin authorization middleware; layered inside `require_auth`
pub async fn require_admin(request: Request, next: Next) -> Result<Response, ApiError> {
    let user = request
        .extensions()
        .get::<AuthenticatedUser>()
        .ok_or_else(ApiError::unauthorized)?;

    if !user.0.is_admin {
        return Err(ApiError::forbidden("Admin access required"));
    }

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use validator::Validate;

    fn headers(pairs: &[(header::HeaderName, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.append(name.clone(), HeaderValue::from_str(value).unwrap());
        }
        map
    }

    #[test]
    fn test_token_from_cookie() {
        let h = headers(&[(header::COOKIE, "theme=dark; auth-token=abc.def.ghi")]);
        assert_eq!(extract_token(&h), Some("abc.def.ghi".to_string()));
    }

    #[test]
    fn test_token_from_bearer() {
        let h = headers(&[(header::AUTHORIZATION, "Bearer xyz")]);
        assert_eq!(extract_token(&h), Some("xyz".to_string()));
    }

    #[test]
    fn test_cookie_wins_over_bearer() {
        let h = headers(&[
            (header::AUTHORIZATION, "Bearer from-header"),
            (header::COOKIE, "auth-token=from-cookie"),
        ]);
        assert_eq!(extract_token(&h), Some("from-cookie".to_string()));
    }

    #[test]
    fn test_no_token() {
        assert!(extract_token(&HeaderMap::new()).is_none());
        let h = headers(&[
            (header::COOKIE, "auth-token-old=1; auth-token="),
            (header::AUTHORIZATION, "Basic abc"),
        ]);
        assert!(extract_token(&h).is_none());
    }

    #[test]
    fn test_camel_case() {
        assert_eq!(camel_case("first_name"), "firstName");
        assert_eq!(camel_case("email"), "email");
        assert_eq!(camel_case("category_ids"), "categoryIds");
    }

    #[derive(Validate)]
    struct Form {
        #[validate(length(min = 1, message = "First name is required"))]
        first_name: String,
        #[validate(email)]
        email: String,
    }

    #[test]
    fn test_flatten_validation_errors() {
        let form = Form {
            first_name: String::new(),
            email: "nope".into(),
        };
        let errors = flatten_validation_errors(&form.validate().unwrap_err());
        assert_eq!(errors["firstName"], "First name is required");
        assert_eq!(errors["email"], "Invalid email");
    }

    #[test]
    fn test_service_error_statuses() {
        assert_eq!(ApiError::from(PostServiceError::SlugExists).status, StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::from(PostServiceError::Forbidden).status, StatusCode::FORBIDDEN);
        assert_eq!(
            ApiError::from(NotificationServiceError::NotFound).message,
            "Notification not found"
        );
        let internal = ApiError::from(CategoryServiceError::InternalError(anyhow::anyhow!("db down")));
        assert_eq!(internal.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(internal.message, "Internal server error");
    }
}
