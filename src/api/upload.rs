//! Upload API endpoints
//!
//! - POST /api/upload - Store one file from multipart field `file`
//! - GET /api/upload - List uploads with their uploader
//! - DELETE /api/upload/{id} - Uploader or admin
//!
//! Stored files are served from `/uploads/*` by the router.

use axum::{
    extract::{multipart::MultipartError, DefaultBodyLimit, Multipart, Path, State},
    http::StatusCode,
    routing::{delete, get},
    Router,
};
use serde::{Deserialize, Serialize};

use crate::api::common::{non_empty, ApiQuery, ApiResponse, PaginationQuery};
use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::config::UploadConfig;
use crate::models::{FileUpload, UploadFilter, UploadWithUser};
use crate::services::UploadServiceError;

const DEFAULT_LIMIT: i64 = 20;
/// Room for multipart framing on top of the file itself
const MULTIPART_OVERHEAD: u64 = 1024 * 1024;

/// Response for a stored file
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub id: i64,
    pub filename: String,
    pub original_name: String,
    pub url: String,
    pub size: i64,
    pub mime_type: String,
}

impl From<FileUpload> for UploadResponse {
    fn from(upload: FileUpload) -> Self {
        Self {
            id: upload.id,
            filename: upload.filename,
            original_name: upload.original_name,
            url: upload.path,
            size: upload.size,
            mime_type: upload.mime_type,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListUploadsQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub search: Option<String>,
    pub mime_type: Option<String>,
}

/// Build the upload routes; the body limit follows the configured maximum
pub fn protected_routes(max_file_size: u64) -> Router<AppState> {
    let body_limit = usize::try_from(max_file_size.saturating_add(MULTIPART_OVERHEAD)).unwrap_or(usize::MAX);
    Router::new()
        .route(
            "/upload",
            get(list_uploads)
                .post(upload_file)
                .layer(DefaultBodyLimit::max(body_limit)),
        )
        .route("/upload/{id}", delete(delete_upload))
}

fn too_large(limits: &UploadConfig) -> ApiError {
    UploadServiceError::TooLarge(limits.max_size_mb()).into()
}

/// A body cut off by the request size limit reports as too large
fn read_error(e: MultipartError, limits: &UploadConfig, what: &str) -> ApiError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        too_large(limits)
    } else {
        ApiError::bad_request(format!("Failed to read {}: {}", what, e))
    }
}

/// POST /api/upload
async fn upload_file(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    mut multipart: Multipart,
) -> Result<ApiResponse<UploadResponse>, ApiError> {
    let limits = &state.config.upload;

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| read_error(e, limits, "multipart"))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let original_name = field
            .file_name()
            .map(str::to_string)
            .unwrap_or_else(|| "unknown".to_string());
        let mime_type = field
            .content_type()
            .map(str::to_string)
            .unwrap_or_else(|| "application/octet-stream".to_string());

        let mut data = Vec::new();
        while let Some(chunk) = field
            .chunk()
            .await
            .map_err(|e| read_error(e, limits, "file"))?
        {
            if (data.len() + chunk.len()) as u64 > limits.max_file_size {
                return Err(too_large(limits));
            }
            data.extend_from_slice(&chunk);
        }

        let upload = state
            .upload_service
            .store(&original_name, &mime_type, &data, &user)
            .await?;

        return Ok(ApiResponse::data(UploadResponse::from(upload))
            .with_message("File uploaded successfully"));
    }

    Err(ApiError::bad_request("No file provided"))
}

/// GET /api/upload
async fn list_uploads(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ListUploadsQuery>,
) -> Result<ApiResponse<Vec<UploadWithUser>>, ApiError> {
    let filter = UploadFilter {
        search: non_empty(query.search),
        mime_type: non_empty(query.mime_type),
    };
    let params = PaginationQuery {
        page: query.page,
        limit: query.limit,
    }
    .params(DEFAULT_LIMIT);

    Ok(ApiResponse::paged(
        state.upload_service.list(&filter, &params).await?,
    ))
}

/// DELETE /api/upload/{id}
async fn delete_upload(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<ApiResponse<()>, ApiError> {
    state.upload_service.delete(id, &user).await?;
    Ok(ApiResponse::message("File deleted successfully"))
}
