//! Authentication API endpoints
//!
//! - POST /api/auth/register - Create a regular account
//! - POST /api/auth/login - Check credentials and set the auth cookie
//! - GET /api/auth/me - Current user from the token
//! - POST /api/auth/logout (also /api/logout) - Clear the auth cookie

use std::net::IpAddr;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, HeaderMap, HeaderValue},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::Value;
use validator::Validate;

use crate::api::common::{client_ip, ApiResponse, ValidatedJson};
use crate::api::middleware::{extract_token, ApiError, AppState, AUTH_COOKIE};
use crate::models::{LoginInput, RegisterInput, User};
use crate::services::UserServiceError;

/// Build the auth router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/me", get(me))
        .route("/logout", post(logout))
}

fn user_json(user: &User) -> Result<Value, ApiError> {
    serde_json::to_value(user).map_err(ApiError::internal_error)
}

fn cookie_header(value: &str) -> Result<HeaderMap, ApiError> {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::SET_COOKIE,
        HeaderValue::from_str(value).map_err(ApiError::internal_error)?,
    );
    Ok(headers)
}

fn session_cookie(token: &str, max_age: i64, secure: bool) -> String {
    let mut cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        AUTH_COOKIE, token, max_age
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// POST /api/auth/register
async fn register(
    State(state): State<AppState>,
    ValidatedJson(input): ValidatedJson<RegisterInput>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state.user_service.register(input).await?;

    Ok(ApiResponse::message("User registered successfully").with("user", user_json(&user)?))
}

/// POST /api/auth/login
///
/// Limits: 10 requests per minute per client IP, 5 failures per 15 minutes
/// per email.
async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<LoginInput>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(input) = payload.map_err(|_| ApiError::bad_request("Invalid input data"))?;
    input
        .validate()
        .map_err(|e| ApiError::validation("Invalid input data", &e))?;

    if let Some(ip) = client_ip(&headers).and_then(|s| s.parse::<IpAddr>().ok()) {
        if state.rate_limiter.is_ip_limited(ip).await {
            tracing::warn!(%ip, "Login IP rate limit exceeded");
            return Err(ApiError::too_many_requests(
                "Too many requests. Please try again later.",
            ));
        }
        state.rate_limiter.record_ip_request(ip).await;
    }

    if state.rate_limiter.is_email_limited(&input.email).await {
        tracing::warn!(email = %input.email, "Login email rate limit exceeded");
        return Err(ApiError::too_many_requests(
            "Too many failed login attempts. Please try again in 15 minutes.",
        ));
    }

    let user = match state
        .user_service
        .authenticate(&input.email, &input.password)
        .await
    {
        Ok(user) => user,
        Err(UserServiceError::InvalidCredentials) => {
            state.rate_limiter.record_failed_attempt(&input.email).await;
            tracing::info!(email = %input.email, "Failed login attempt");
            return Err(UserServiceError::InvalidCredentials.into());
        }
        Err(e) => return Err(e.into()),
    };

    state.rate_limiter.clear_email(&input.email).await;

    let token = state.jwt.issue(user.id).map_err(ApiError::internal_error)?;
    let cookie = session_cookie(
        &token,
        state.jwt.ttl_seconds(),
        state.config.auth.secure_cookie,
    );

    tracing::info!(user_id = user.id, "User logged in");

    Ok((
        cookie_header(&cookie)?,
        ApiResponse::message("Login successful").with("user", user_json(&user)?),
    ))
}

/// GET /api/auth/me
async fn me(State(state): State<AppState>, headers: HeaderMap) -> Result<impl IntoResponse, ApiError> {
    let token = extract_token(&headers)
        .ok_or_else(|| ApiError::new(axum::http::StatusCode::UNAUTHORIZED, "Not authenticated"))?;

    let claims = state.jwt.verify(&token).map_err(|_| {
        ApiError::new(axum::http::StatusCode::UNAUTHORIZED, "Authentication failed")
    })?;

    let user = state.user_service.get_by_id(claims.user_id).await?;

    Ok(Json(serde_json::json!({
        "success": true,
        "user": user_json(&user)?,
    })))
}

/// POST /api/auth/logout
pub(crate) async fn logout() -> Result<impl IntoResponse, ApiError> {
    let cookie = format!("{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0", AUTH_COOKIE);
    Ok((
        cookie_header(&cookie)?,
        ApiResponse::message("Logged out successfully"),
    ))
}
