//! File upload model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::UserSummary;

/// A stored file and where it is served from
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct FileUpload {
    pub id: i64,
    /// Generated on-disk name
    pub filename: String,
    /// Name supplied by the client
    pub original_name: String,
    pub mime_type: String,
    pub size: i64,
    /// Public path, `/uploads/{filename}`
    pub path: String,
    pub uploaded_by_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadWithUser {
    #[serde(flatten)]
    pub upload: FileUpload,
    pub uploaded_by: Option<UserSummary>,
}

#[derive(Debug, Clone, Default)]
pub struct UploadFilter {
    /// Matched against original and stored name
    pub search: Option<String>,
    /// Prefix match, so `image/` selects every image type
    pub mime_type: Option<String>,
}
