//! Data models
//!
//! Database entities, the views the API returns, and the validated input
//! types accepted by the services. JSON field names are camelCase.

mod analytics;
mod category;
mod comment;
mod notification;
mod pagination;
mod post;
mod setting;
mod tag;
mod upload;
mod user;

use once_cell::sync::Lazy;
use regex::Regex;
use validator::ValidationError;

pub use analytics::{
    ActionCount, AnalyticsEvent, AnalyticsFilter, AnalyticsSummary, AnalyticsWithUser, ClientInfo,
    PageCount, TrackEventInput,
};
pub use category::{
    Category, CategoryWithCount, CreateCategoryInput, TaxonomyRank, UpdateCategoryInput,
};
pub use comment::{Comment, CommentWithAuthor, CreateCommentInput};
pub use notification::{CreateNotificationInput, Notification, NotificationFilter, NotificationType};
pub use pagination::{ListParams, PagedResult, Pagination};
pub use post::{CreatePostInput, Post, PostDetail, PostFilter, PostStatus, PostSummary, UpdatePostInput};
pub use setting::{Setting, SettingType, SettingValueError, UpsertSettingInput};
pub use tag::{CreateTagInput, Tag, TagWithCount, UpdateTagInput};
pub use upload::{FileUpload, UploadFilter, UploadWithUser};
pub use user::{LoginInput, RegisterInput, User, UserSummary};

static SLUG_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-z0-9-]+$").expect("valid slug regex"));

/// Slugs are lowercase ASCII letters, digits and hyphens
pub fn is_valid_slug(slug: &str) -> bool {
    SLUG_REGEX.is_match(slug)
}

pub(crate) fn validate_slug(slug: &str) -> Result<(), ValidationError> {
    if is_valid_slug(slug) {
        Ok(())
    } else {
        let mut err = ValidationError::new("slug");
        err.message = Some("Slug must contain only lowercase letters, numbers, and hyphens".into());
        Err(err)
    }
}
