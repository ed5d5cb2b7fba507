//! User model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// A registered account.
///
/// `is_admin` gates the admin-only endpoints (settings, notifications
/// broadcast, taxonomy edits).
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    /// Argon2 PHC string
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Create a new User. The password must already be hashed.
    pub fn new(
        username: String,
        email: String,
        first_name: String,
        last_name: String,
        password_hash: String,
        is_admin: bool,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            email,
            username,
            first_name,
            last_name,
            password_hash,
            is_admin,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether this user may modify content owned by `owner_id`
    pub fn can_modify(&self, owner_id: i64) -> bool {
        self.is_admin || self.id == owner_id
    }

    pub fn summary(&self) -> UserSummary {
        UserSummary {
            id: self.id,
            username: self.username.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
        }
    }
}

/// Public author block embedded in posts, comments and uploads
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: i64,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
}

impl UserSummary {
    /// Stand-in for an author row that could not be loaded
    pub fn unknown(id: i64) -> Self {
        Self {
            id,
            username: "unknown".to_string(),
            first_name: String::new(),
            last_name: String::new(),
        }
    }
}

/// Registration payload
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterInput {
    #[validate(length(min = 3, max = 50, message = "Username must be between 3 and 50 characters"))]
    pub username: String,
    #[validate(length(min = 1, max = 50, message = "First name is required"))]
    pub first_name: String,
    #[validate(length(min = 1, max = 50, message = "Last name is required"))]
    pub last_name: String,
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
}

/// Login payload
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LoginInput {
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    pub password: String,
}
