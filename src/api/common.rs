//! Common API utilities and shared types
//!
//! Success envelope, body/query extractors that answer with the JSON error
//! envelope, and request metadata helpers.

use axum::{
    extract::{rejection::JsonRejection, FromRequest, FromRequestParts, Query, Request},
    http::{request::Parts, HeaderMap},
    response::{IntoResponse, Response},
    Json,
};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};
use validator::Validate;

use crate::api::middleware::ApiError;
use crate::models::{ListParams, PagedResult, Pagination};

// ============================================================================
// Response envelope
// ============================================================================

/// `{ success: true, message?, data?, pagination?, ...extra }`
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pagination: Option<Pagination>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn data(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data: Some(data),
            pagination: None,
            extra: Map::new(),
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Extra top-level field next to `data`
    pub fn with(mut self, key: &str, value: Value) -> Self {
        self.extra.insert(key.to_string(), value);
        self
    }
}

impl ApiResponse<()> {
    /// Envelope without `data`
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data: None,
            pagination: None,
            extra: Map::new(),
        }
    }
}

impl<T: Serialize> ApiResponse<Vec<T>> {
    pub fn paged(result: PagedResult<T>) -> Self {
        Self {
            success: true,
            message: None,
            data: Some(result.items),
            pagination: Some(result.pagination),
            extra: Map::new(),
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

// ============================================================================
// Extractors
// ============================================================================

pub(crate) fn json_rejection(rejection: JsonRejection) -> ApiError {
    match rejection {
        JsonRejection::JsonDataError(e) => {
            let mut errors = std::collections::BTreeMap::new();
            errors.insert("body".to_string(), e.body_text());
            ApiError::bad_request("Validation failed").with_errors(errors)
        }
        other => ApiError::bad_request(format!("Invalid request body: {}", other.body_text())),
    }
}

/// JSON body that has passed its `validator` rules
///
/// Malformed JSON and rule violations both answer 400 with the error
/// envelope; violations carry the per-field messages.
#[derive(Debug, Clone)]
pub struct ValidatedJson<T>(pub T);

impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(json_rejection)?;
        value
            .validate()
            .map_err(|e| ApiError::validation("Validation failed", &e))?;
        Ok(Self(value))
    }
}

/// Query string extractor answering with the error envelope
#[derive(Debug, Clone)]
pub struct ApiQuery<T>(pub T);

impl<S, T> FromRequestParts<S> for ApiQuery<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|e| ApiError::bad_request(format!("Invalid query: {}", e.body_text())))?;
        Ok(Self(value))
    }
}

// ============================================================================
// Pagination
// ============================================================================

/// `page` / `limit` query values
#[derive(Debug, Default, Clone, Copy, serde::Deserialize)]
pub struct PaginationQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl PaginationQuery {
    pub fn params(&self, default_limit: i64) -> ListParams {
        ListParams::from_query(self.page, self.limit, default_limit)
    }
}

// ============================================================================
// Request metadata
// ============================================================================

/// Client address: first `x-forwarded-for` hop, else `x-real-ip`
pub fn client_ip(headers: &HeaderMap) -> Option<String> {
    if let Some(forwarded) = headers.get("x-forwarded-for").and_then(|h| h.to_str().ok()) {
        if let Some(ip) = forwarded.split(',').next().map(str::trim).filter(|s| !s.is_empty()) {
            return Some(ip.to_string());
        }
    }

    headers
        .get("x-real-ip")
        .and_then(|h| h.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

pub fn user_agent(headers: &HeaderMap) -> Option<String> {
    headers
        .get(axum::http::header::USER_AGENT)
        .and_then(|h| h.to_str().ok())
        .map(str::to_string)
}

/// Treat blank query values as absent
pub fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}
