//! Analytics service
//!
//! Records page interactions and reports on them. Admins see every event;
//! other users only their own.

use crate::db::repositories::{AnalyticsRepository, UserRepository};
use crate::models::{
    AnalyticsEvent, AnalyticsFilter, AnalyticsSummary, AnalyticsWithUser, ClientInfo,
    TrackEventInput, User,
};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;

/// Events returned by a report when no limit is given
pub const DEFAULT_EVENT_LIMIT: i64 = 100;

/// Entries in each top-N list of a summary
const TOP_N: usize = 5;

#[derive(Debug, thiserror::Error)]
pub enum AnalyticsServiceError {
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Latest events plus aggregate figures over the same filter
#[derive(Debug, Serialize)]
pub struct AnalyticsReport {
    pub analytics: Vec<AnalyticsWithUser>,
    pub summary: AnalyticsSummary,
}

pub struct AnalyticsService {
    repo: Arc<dyn AnalyticsRepository>,
    users: Arc<dyn UserRepository>,
}

impl AnalyticsService {
    pub fn new(repo: Arc<dyn AnalyticsRepository>, users: Arc<dyn UserRepository>) -> Self {
        Self { repo, users }
    }

    pub async fn track(
        &self,
        input: TrackEventInput,
        user: &User,
        client: ClientInfo,
    ) -> Result<AnalyticsEvent, AnalyticsServiceError> {
        let event = AnalyticsEvent {
            id: 0,
            user_id: Some(user.id),
            page: input.page,
            action: input.action,
            metadata: input.metadata.map(|m| m.to_string()),
            ip_address: client.ip_address,
            user_agent: client.user_agent,
            created_at: Utc::now(),
        };
        let event = self.repo.create(&event).await?;
        tracing::debug!(event_id = event.id, page = %event.page, action = %event.action, "Event tracked");
        Ok(event)
    }

    /// Report scoped to what `viewer` may see
    pub async fn report(
        &self,
        viewer: &User,
        mut filter: AnalyticsFilter,
        limit: i64,
    ) -> Result<AnalyticsReport, AnalyticsServiceError> {
        if !viewer.is_admin {
            filter.user_id = Some(viewer.id);
        }

        let analytics = self.recent(&filter, limit).await?;
        let summary = self.summary(&filter).await?;
        Ok(AnalyticsReport { analytics, summary })
    }

    /// Totals and top pages/actions for a filter
    pub async fn summary(&self, filter: &AnalyticsFilter) -> Result<AnalyticsSummary, AnalyticsServiceError> {
        let (total_events, mut pages, mut actions) = futures::try_join!(
            self.repo.count(filter),
            self.repo.page_counts(filter),
            self.repo.action_counts(filter),
        )?;

        let unique_pages = pages.len() as i64;
        let unique_actions = actions.len() as i64;
        pages.truncate(TOP_N);
        actions.truncate(TOP_N);

        Ok(AnalyticsSummary {
            total_events,
            unique_pages,
            unique_actions,
            top_pages: pages,
            top_actions: actions,
        })
    }

    /// Latest events matching a filter, each with its user
    pub async fn recent(
        &self,
        filter: &AnalyticsFilter,
        limit: i64,
    ) -> Result<Vec<AnalyticsWithUser>, AnalyticsServiceError> {
        let events = self.repo.list(filter, limit).await?;
        let user_ids: Vec<i64> = events.iter().filter_map(|e| e.user_id).collect();
        let users = self.users.summaries(&user_ids).await?;

        Ok(events
            .into_iter()
            .map(|event| AnalyticsWithUser {
                user: event.user_id.and_then(|id| users.get(&id).cloned()),
                event,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{SqlxAnalyticsRepository, SqlxUserRepository};
    use crate::db::{create_test_pool, migrations};

    async fn setup() -> (AnalyticsService, User, User) {
        let pool = create_test_pool().await.unwrap();
        migrations::run_migrations(&pool).await.unwrap();

        let users = SqlxUserRepository::boxed(pool.clone());
        let mut created = Vec::new();
        for (name, admin) in [("admin", true), ("viewer", false)] {
            created.push(
                users
                    .create(&User::new(
                        name.into(),
                        format!("{}@example.com", name),
                        "F".into(),
                        "L".into(),
                        "hash".into(),
                        admin,
                    ))
                    .await
                    .unwrap(),
            );
        }
        let viewer = created.pop().unwrap();
        let admin = created.pop().unwrap();
        (
            AnalyticsService::new(SqlxAnalyticsRepository::boxed(pool), users),
            admin,
            viewer,
        )
    }

    fn event(page: &str, action: &str) -> TrackEventInput {
        TrackEventInput {
            page: page.into(),
            action: action.into(),
            metadata: None,
        }
    }

    #[tokio::test]
    async fn test_track_records_client_info_and_metadata() {
        let (service, _, viewer) = setup().await;
        let tracked = service
            .track(
                TrackEventInput {
                    page: "/home".into(),
                    action: "view".into(),
                    metadata: Some(serde_json::json!({"ref": "nav"})),
                },
                &viewer,
                ClientInfo {
                    ip_address: Some("203.0.113.9".into()),
                    user_agent: Some("test-agent".into()),
                },
            )
            .await
            .unwrap();
        assert_eq!(tracked.user_id, Some(viewer.id));
        assert_eq!(tracked.ip_address.as_deref(), Some("203.0.113.9"));
        let metadata: serde_json::Value = serde_json::from_str(tracked.metadata.as_deref().unwrap()).unwrap();
        assert_eq!(metadata["ref"], "nav");
    }

    #[tokio::test]
    async fn test_report_visibility_and_summary() {
        let (service, admin, viewer) = setup().await;
        for _ in 0..3 {
            service.track(event("/home", "view"), &admin, ClientInfo::default()).await.unwrap();
        }
        service.track(event("/posts", "click"), &viewer, ClientInfo::default()).await.unwrap();

        let all = service
            .report(&admin, AnalyticsFilter::default(), DEFAULT_EVENT_LIMIT)
            .await
            .unwrap();
        assert_eq!(all.summary.total_events, 4);
        assert_eq!(all.summary.unique_pages, 2);
        assert_eq!(all.summary.top_pages[0].page, "/home");
        assert_eq!(all.summary.top_pages[0].count, 3);

        let own = service
            .report(&viewer, AnalyticsFilter::default(), DEFAULT_EVENT_LIMIT)
            .await
            .unwrap();
        assert_eq!(own.analytics.len(), 1);
        assert_eq!(own.summary.total_events, 1);
        assert_eq!(own.analytics[0].user.as_ref().unwrap().username, "viewer");
    }

    #[tokio::test]
    async fn test_report_limit_and_exact_filters() {
        let (service, admin, _) = setup().await;
        for page in ["/a", "/b", "/a/sub", "/a"] {
            service.track(event(page, "view"), &admin, ClientInfo::default()).await.unwrap();
        }

        let filtered = service
            .report(
                &admin,
                AnalyticsFilter {
                    page: Some("/a".into()),
                    ..Default::default()
                },
                1,
            )
            .await
            .unwrap();
        assert_eq!(filtered.analytics.len(), 1);
        assert_eq!(filtered.summary.total_events, 2);
    }
}
