//! Post model
//!
//! - `Post` entity and its `PostStatus`
//! - `PostDetail`, the post together with author, taxonomy and comment data
//! - Input types for creating and updating posts, and list filters

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use validator::Validate;

use super::{validate_slug, Category, CommentWithAuthor, Tag, UserSummary};

/// Blog post entity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub slug: String,
    pub status: PostStatus,
    pub author_id: i64,
    /// Set the first time the post is published, never cleared
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Post {
    pub fn new(title: String, content: String, slug: String, status: PostStatus, author_id: i64) -> Self {
        let now = Utc::now();
        let published_at = if status == PostStatus::Published {
            Some(now)
        } else {
            None
        };
        Self {
            id: 0,
            title,
            content,
            slug,
            status,
            author_id,
            published_at,
            created_at: now,
            updated_at: now,
        }
    }

    /// Move to `status`, stamping `published_at` on first publication
    pub fn set_status(&mut self, status: PostStatus, now: DateTime<Utc>) {
        if status == PostStatus::Published && self.published_at.is_none() {
            self.published_at = Some(now);
        }
        self.status = status;
    }
}

/// Publication state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum PostStatus {
    #[default]
    Draft,
    Published,
    Archived,
}

impl PostStatus {
    pub const ALL: [PostStatus; 3] = [PostStatus::Draft, PostStatus::Published, PostStatus::Archived];

    pub fn as_str(&self) -> &'static str {
        match self {
            PostStatus::Draft => "DRAFT",
            PostStatus::Published => "PUBLISHED",
            PostStatus::Archived => "ARCHIVED",
        }
    }
}

impl fmt::Display for PostStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PostStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "DRAFT" => Ok(PostStatus::Draft),
            "PUBLISHED" => Ok(PostStatus::Published),
            "ARCHIVED" => Ok(PostStatus::Archived),
            _ => Err(anyhow::anyhow!("Invalid post status: {}", s)),
        }
    }
}

/// Post as returned by the list and detail endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostDetail {
    #[serde(flatten)]
    pub post: Post,
    pub author: UserSummary,
    pub categories: Vec<Category>,
    pub tags: Vec<Tag>,
    pub comment_count: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comments: Option<Vec<CommentWithAuthor>>,
}

/// Minimal post reference embedded in taxonomy listings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PostSummary {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

/// Input for creating a post
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreatePostInput {
    #[validate(length(min = 1, max = 200, message = "Title must be between 1 and 200 characters"))]
    pub title: String,
    #[validate(length(min = 1, message = "Content is required"))]
    pub content: String,
    #[validate(
        length(min = 1, max = 100, message = "Slug must be between 1 and 100 characters"),
        custom(function = "validate_slug")
    )]
    pub slug: String,
    #[serde(default)]
    pub status: PostStatus,
    #[serde(default)]
    pub category_ids: Option<Vec<i64>>,
    #[serde(default)]
    pub tag_ids: Option<Vec<i64>>,
}

/// Partial update; absent fields stay unchanged
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePostInput {
    #[validate(length(min = 1, max = 200, message = "Title must be between 1 and 200 characters"))]
    pub title: Option<String>,
    #[validate(length(min = 1, message = "Content is required"))]
    pub content: Option<String>,
    #[validate(
        length(min = 1, max = 100, message = "Slug must be between 1 and 100 characters"),
        custom(function = "validate_slug")
    )]
    pub slug: Option<String>,
    pub status: Option<PostStatus>,
    /// Replaces the whole category set when present
    pub category_ids: Option<Vec<i64>>,
    /// Replaces the whole tag set when present
    pub tag_ids: Option<Vec<i64>>,
}

/// Filters for the post list
#[derive(Debug, Clone, Default)]
pub struct PostFilter {
    pub status: Option<PostStatus>,
    pub search: Option<String>,
    pub category_id: Option<i64>,
    pub tag_id: Option<i64>,
}
