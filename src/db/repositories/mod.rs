//! Database repositories
//!
//! Repository pattern implementations for database access.
//! Each repository handles CRUD operations for a specific entity.

pub mod analytics;
pub mod category;
pub mod comment;
pub mod notification;
pub mod post;
pub mod settings;
pub mod tag;
pub mod upload;
pub mod user;

pub use analytics::{AnalyticsRepository, SqlxAnalyticsRepository};
pub use category::{CategoryRepository, SqlxCategoryRepository};
pub use comment::{CommentRepository, SqlxCommentRepository};
pub use notification::{NotificationRepository, SqlxNotificationRepository};
pub use post::{PostRepository, SqlxPostRepository};
pub use settings::{SettingsRepository, SqlxSettingsRepository};
pub use tag::{SqlxTagRepository, TagRepository};
pub use upload::{SqlxUploadRepository, UploadRepository};
pub use user::{SqlxUserRepository, UserRepository};

use std::collections::HashMap;

use crate::db::SqlParam;
use crate::models::{PostSummary, TaxonomyRank};

pub(crate) fn id_params(ids: &[i64]) -> Vec<SqlParam> {
    ids.iter().map(|id| SqlParam::Int(*id)).collect()
}

/// `owner_id → total` row of a grouped count
#[derive(sqlx::FromRow)]
pub(crate) struct CountRow {
    pub owner_id: i64,
    pub total: i64,
}

/// A post reached through a join table, tagged with the owning row's id
#[derive(sqlx::FromRow)]
pub(crate) struct LinkedPostRow {
    pub owner_id: i64,
    #[sqlx(flatten)]
    pub post: PostSummary,
}

pub(crate) fn group_linked_posts(rows: Vec<LinkedPostRow>) -> HashMap<i64, Vec<PostSummary>> {
    let mut map: HashMap<i64, Vec<PostSummary>> = HashMap::new();
    for row in rows {
        map.entry(row.owner_id).or_default().push(row.post);
    }
    map
}

#[derive(sqlx::FromRow)]
pub(crate) struct RankRow {
    pub id: i64,
    pub name: String,
    pub post_count: i64,
}

impl RankRow {
    pub fn into_rank(self) -> TaxonomyRank {
        TaxonomyRank {
            id: self.id,
            name: self.name,
            post_count: self.post_count,
        }
    }
}
