//! Dashboard aggregation
//!
//! One read-only snapshot of the site: entity totals, the newest content and
//! activity, and a few rankings. Period-bound figures cover the last
//! `period` days.

use crate::db::repositories::{
    AnalyticsRepository, CategoryRepository, NotificationRepository, PostRepository, TagRepository,
    UploadRepository, UserRepository,
};
use crate::models::{AnalyticsFilter, AnalyticsWithUser, PostDetail, PostStatus, TaxonomyRank, User};
use crate::services::analytics::{AnalyticsService, AnalyticsServiceError};
use crate::services::post::{PostService, PostServiceError};
use anyhow::Context;
use chrono::{Duration, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

pub const DEFAULT_PERIOD_DAYS: i64 = 30;
const MAX_PERIOD_DAYS: i64 = 365;
const RECENT_POSTS: i64 = 5;
const RECENT_USERS: i64 = 5;
const RECENT_EVENTS: i64 = 10;
const TOP_TAXONOMY: i64 = 5;

#[derive(Debug, thiserror::Error)]
pub enum DashboardServiceError {
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Overview {
    pub total_users: i64,
    pub total_posts: i64,
    pub total_categories: i64,
    pub total_tags: i64,
    pub total_uploads: i64,
    pub unread_notifications: i64,
    pub new_users: i64,
    pub new_posts: i64,
}

#[derive(Debug, Serialize)]
pub struct Recent {
    pub posts: Vec<PostDetail>,
    pub users: Vec<User>,
    pub analytics: Vec<AnalyticsWithUser>,
}

#[derive(Debug, Default, PartialEq, Eq, Serialize)]
pub struct PostStatusCounts {
    pub draft: i64,
    pub published: i64,
    pub archived: i64,
}

#[derive(Debug, Default, Serialize)]
pub struct ActivityCounts {
    pub pages: BTreeMap<String, i64>,
    pub actions: BTreeMap<String, i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Statistics {
    pub post_status: PostStatusCounts,
    pub analytics: ActivityCounts,
    pub top_categories: Vec<TaxonomyRank>,
    pub top_tags: Vec<TaxonomyRank>,
}

#[derive(Debug, Serialize)]
pub struct Dashboard {
    pub overview: Overview,
    pub recent: Recent,
    pub statistics: Statistics,
}

/// Repositories the dashboard reads from
pub struct DashboardSources {
    pub users: Arc<dyn UserRepository>,
    pub posts: Arc<dyn PostRepository>,
    pub categories: Arc<dyn CategoryRepository>,
    pub tags: Arc<dyn TagRepository>,
    pub uploads: Arc<dyn UploadRepository>,
    pub notifications: Arc<dyn NotificationRepository>,
    pub analytics: Arc<dyn AnalyticsRepository>,
}

pub struct DashboardService {
    sources: DashboardSources,
    post_service: Arc<PostService>,
    analytics_service: Arc<AnalyticsService>,
}

impl DashboardService {
    pub fn new(
        sources: DashboardSources,
        post_service: Arc<PostService>,
        analytics_service: Arc<AnalyticsService>,
    ) -> Self {
        Self {
            sources,
            post_service,
            analytics_service,
        }
    }

    /// Clamp a requested period to 1..=365 days
    pub fn clamp_period(days: Option<i64>) -> i64 {
        days.unwrap_or(DEFAULT_PERIOD_DAYS).clamp(1, MAX_PERIOD_DAYS)
    }

    pub async fn snapshot(&self, viewer: &User, period_days: i64) -> Result<Dashboard, DashboardServiceError> {
        let since = Utc::now() - Duration::days(Self::clamp_period(Some(period_days)));
        let s = &self.sources;

        let (
            total_users,
            total_posts,
            total_categories,
            total_tags,
            total_uploads,
            unread_notifications,
            new_users,
            new_posts,
        ) = futures::try_join!(
            s.users.count(),
            s.posts.count(),
            s.categories.count(),
            s.tags.count(),
            s.uploads.count(),
            s.notifications.unread_count(viewer.id),
            s.users.count_created_since(since),
            s.posts.count_created_since(since),
        )?;

        let in_period = AnalyticsFilter {
            start: Some(since),
            ..Default::default()
        };

        let recent_posts = self
            .post_service
            .recent(RECENT_POSTS)
            .await
            .map_err(|e| match e {
                PostServiceError::InternalError(err) => err,
                other => anyhow::Error::new(other),
            })
            .context("Failed to load recent posts")?;
        let recent_events = self
            .analytics_service
            .recent(&in_period, RECENT_EVENTS)
            .await
            .map_err(|AnalyticsServiceError::InternalError(err)| err)
            .context("Failed to load recent events")?;

        let (recent_users, by_status, pages, actions, top_categories, top_tags) = futures::try_join!(
            s.users.list_recent(RECENT_USERS),
            s.posts.count_by_status(),
            s.analytics.page_counts(&in_period),
            s.analytics.action_counts(&in_period),
            s.categories.top_by_post_count(TOP_TAXONOMY),
            s.tags.top_by_post_count(TOP_TAXONOMY),
        )?;

        let count_of = |status: PostStatus| by_status.get(&status).copied().unwrap_or(0);
        let post_status = PostStatusCounts {
            draft: count_of(PostStatus::Draft),
            published: count_of(PostStatus::Published),
            archived: count_of(PostStatus::Archived),
        };

        let analytics = ActivityCounts {
            pages: pages.into_iter().map(|p| (p.page, p.count)).collect(),
            actions: actions.into_iter().map(|a| (a.action, a.count)).collect(),
        };

        Ok(Dashboard {
            overview: Overview {
                total_users,
                total_posts,
                total_categories,
                total_tags,
                total_uploads,
                unread_notifications,
                new_users,
                new_posts,
            },
            recent: Recent {
                posts: recent_posts,
                users: recent_users,
                analytics: recent_events,
            },
            statistics: Statistics {
                post_status,
                analytics,
                top_categories,
                top_tags,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::*;
    use crate::db::{create_test_pool, migrations};
    use crate::models::{Category, ClientInfo, Notification, NotificationType, Post, TrackEventInput};

    #[test]
    fn test_clamp_period() {
        assert_eq!(DashboardService::clamp_period(None), 30);
        assert_eq!(DashboardService::clamp_period(Some(0)), 1);
        assert_eq!(DashboardService::clamp_period(Some(1000)), 365);
        assert_eq!(DashboardService::clamp_period(Some(7)), 7);
    }

    #[tokio::test]
    async fn test_snapshot() {
        let pool = create_test_pool().await.unwrap();
        migrations::run_migrations(&pool).await.unwrap();

        let users = SqlxUserRepository::boxed(pool.clone());
        let posts = SqlxPostRepository::boxed(pool.clone());
        let categories = SqlxCategoryRepository::boxed(pool.clone());
        let tags = SqlxTagRepository::boxed(pool.clone());
        let comments = SqlxCommentRepository::boxed(pool.clone());
        let notifications = SqlxNotificationRepository::boxed(pool.clone());
        let analytics = SqlxAnalyticsRepository::boxed(pool.clone());

        let viewer = users
            .create(&User::new(
                "viewer".into(),
                "viewer@example.com".into(),
                "V".into(),
                "W".into(),
                "hash".into(),
                false,
            ))
            .await
            .unwrap();
        let tech = categories
            .create(&Category::new("Technology".into(), "technology".into(), None))
            .await
            .unwrap();
        categories
            .create(&Category::new("Empty".into(), "empty".into(), None))
            .await
            .unwrap();
        for (slug, status) in [("a", PostStatus::Published), ("b", PostStatus::Draft), ("c", PostStatus::Published)] {
            posts
                .create(
                    &Post::new(slug.into(), "body".into(), slug.into(), status, viewer.id),
                    &[tech.id],
                    &[],
                )
                .await
                .unwrap();
        }
        notifications
            .create(&Notification::new(viewer.id, "t".into(), "m".into(), NotificationType::Info))
            .await
            .unwrap();

        let post_service = Arc::new(PostService::new(
            posts.clone(),
            categories.clone(),
            tags.clone(),
            comments,
            users.clone(),
        ));
        let analytics_service = Arc::new(AnalyticsService::new(analytics.clone(), users.clone()));
        for page in ["/home", "/home", "/about"] {
            analytics_service
                .track(
                    TrackEventInput {
                        page: page.into(),
                        action: "view".into(),
                        metadata: None,
                    },
                    &viewer,
                    ClientInfo::default(),
                )
                .await
                .unwrap();
        }

        let service = DashboardService::new(
            DashboardSources {
                users,
                posts,
                categories,
                tags,
                uploads: SqlxUploadRepository::boxed(pool.clone()),
                notifications,
                analytics,
            },
            post_service,
            analytics_service,
        );

        let dashboard = service.snapshot(&viewer, 30).await.unwrap();
        assert_eq!(dashboard.overview.total_users, 1);
        assert_eq!(dashboard.overview.total_posts, 3);
        assert_eq!(dashboard.overview.total_categories, 2);
        assert_eq!(dashboard.overview.unread_notifications, 1);
        assert_eq!(dashboard.overview.new_posts, 3);
        assert_eq!(
            dashboard.statistics.post_status,
            PostStatusCounts {
                draft: 1,
                published: 2,
                archived: 0
            }
        );
        assert_eq!(dashboard.statistics.analytics.pages["/home"], 2);
        assert_eq!(dashboard.statistics.top_categories[0].name, "Technology");
        assert_eq!(dashboard.statistics.top_categories[0].post_count, 3);
        assert_eq!(dashboard.recent.posts.len(), 3);
        assert_eq!(dashboard.recent.analytics.len(), 3);

        let json = serde_json::to_value(&dashboard).unwrap();
        assert!(json["overview"]["unreadNotifications"].is_i64());
        assert!(json["statistics"]["postStatus"]["draft"].is_i64());

        pool.execute("DROP TABLE analytics").await.unwrap();
        let DashboardServiceError::InternalError(cause) = service.snapshot(&viewer, 30).await.unwrap_err();
        let chain: Vec<String> = cause.chain().map(|c| c.to_string()).collect();
        assert_eq!(chain[0], "Failed to load recent events");
        assert!(chain.len() > 1, "underlying cause kept: {:?}", chain);
    }
}
