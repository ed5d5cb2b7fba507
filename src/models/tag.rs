//! Tag model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::{validate_slug, PostSummary};

/// Tag entity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Tag {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Tag {
    pub fn new(name: String, slug: String) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            name,
            slug,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Tag with the number of posts carrying it
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagWithCount {
    #[serde(flatten)]
    pub tag: Tag,
    pub post_count: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub posts: Option<Vec<PostSummary>>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateTagInput {
    #[validate(length(min = 1, max = 50, message = "Name must be between 1 and 50 characters"))]
    pub name: String,
    #[validate(
        length(min = 1, max = 50, message = "Slug must be between 1 and 50 characters"),
        custom(function = "validate_slug")
    )]
    pub slug: String,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateTagInput {
    #[validate(length(min = 1, max = 50, message = "Name must be between 1 and 50 characters"))]
    pub name: Option<String>,
    #[validate(
        length(min = 1, max = 50, message = "Slug must be between 1 and 50 characters"),
        custom(function = "validate_slug")
    )]
    pub slug: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_new() {
        let tag = Tag::new("Next.js".to_string(), "nextjs".to_string());
        assert_eq!(tag.id, 0);
        assert_eq!(tag.name, "Next.js");
        assert_eq!(tag.created_at, tag.updated_at);
    }

    #[test]
    fn test_tag_slug_must_be_lowercase() {
        let input = CreateTagInput {
            name: "React".into(),
            slug: "React".into(),
        };
        assert!(input.validate().is_err());
    }
}
