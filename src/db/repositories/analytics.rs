//! Analytics event repository

use crate::db::pool::on_pool;
use crate::db::query::{bind_params, Filter};
use crate::db::{DynDatabasePool, LastInsertId, SqlParam};
use crate::models::{ActionCount, AnalyticsEvent, AnalyticsFilter, PageCount};
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::sync::Arc;

const EVENT_COLUMNS: &str = "id, user_id, page, action, metadata, ip_address, user_agent, created_at";

#[async_trait]
pub trait AnalyticsRepository: Send + Sync {
    async fn create(&self, event: &AnalyticsEvent) -> Result<AnalyticsEvent>;

    /// Latest events matching the filter
    async fn list(&self, filter: &AnalyticsFilter, limit: i64) -> Result<Vec<AnalyticsEvent>>;

    async fn count(&self, filter: &AnalyticsFilter) -> Result<i64>;

    /// Events per page, most visited first
    async fn page_counts(&self, filter: &AnalyticsFilter) -> Result<Vec<PageCount>>;

    /// Events per action, most frequent first
    async fn action_counts(&self, filter: &AnalyticsFilter) -> Result<Vec<ActionCount>>;
}

#[derive(sqlx::FromRow)]
struct GroupRow {
    label: String,
    total: i64,
}

pub struct SqlxAnalyticsRepository {
    pool: DynDatabasePool,
}

impl SqlxAnalyticsRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn AnalyticsRepository> {
        Arc::new(Self::new(pool))
    }

    async fn grouped(&self, column: &str, filter: &AnalyticsFilter) -> Result<Vec<GroupRow>> {
        let where_clause = build_filter(filter);
        let sql = format!(
            "SELECT {col} AS label, COUNT(*) AS total FROM analytics{w} GROUP BY {col} ORDER BY total DESC, {col} ASC",
            col = column,
            w = where_clause.sql()
        );
        let rows = on_pool!(self.pool, |p| {
            bind_params!(sqlx::query_as::<Db, GroupRow>(&sql), where_clause.params())
                .fetch_all(p)
                .await
                .with_context(|| format!("Failed to group analytics by {}", column))?
        });
        Ok(rows)
    }
}

fn build_filter(filter: &AnalyticsFilter) -> Filter {
    let mut f = Filter::new();
    if let Some(user_id) = filter.user_id {
        f.push("user_id = ?", [SqlParam::Int(user_id)]);
    }
    if let Some(start) = filter.start {
        f.push("created_at >= ?", [SqlParam::Time(start)]);
    }
    if let Some(end) = filter.end {
        f.push("created_at <= ?", [SqlParam::Time(end)]);
    }
    if let Some(page) = filter.page.as_deref().filter(|s| !s.is_empty()) {
        f.push("page = ?", [SqlParam::Text(page.to_string())]);
    }
    if let Some(action) = filter.action.as_deref().filter(|s| !s.is_empty()) {
        f.push("action = ?", [SqlParam::Text(action.to_string())]);
    }
    f
}

#[async_trait]
impl AnalyticsRepository for SqlxAnalyticsRepository {
    async fn create(&self, event: &AnalyticsEvent) -> Result<AnalyticsEvent> {
        let id = on_pool!(self.pool, |p| {
            sqlx::query(
                r#"
                INSERT INTO analytics (user_id, page, action, metadata, ip_address, user_agent, created_at)
                VALUES (?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(event.user_id)
            .bind(&event.page)
            .bind(&event.action)
            .bind(&event.metadata)
            .bind(&event.ip_address)
            .bind(&event.user_agent)
            .bind(event.created_at)
            .execute(p)
            .await
            .context("Failed to record analytics event")?
            .insert_id()
        });
        Ok(AnalyticsEvent { id, ..event.clone() })
    }

    async fn list(&self, filter: &AnalyticsFilter, limit: i64) -> Result<Vec<AnalyticsEvent>> {
        let where_clause = build_filter(filter);
        let sql = format!(
            "SELECT {} FROM analytics{} ORDER BY created_at DESC, id DESC LIMIT ?",
            EVENT_COLUMNS,
            where_clause.sql()
        );
        let events = on_pool!(self.pool, |p| {
            bind_params!(sqlx::query_as::<Db, AnalyticsEvent>(&sql), where_clause.params())
                .bind(limit)
                .fetch_all(p)
                .await
                .context("Failed to list analytics events")?
        });
        Ok(events)
    }

    async fn count(&self, filter: &AnalyticsFilter) -> Result<i64> {
        let where_clause = build_filter(filter);
        let sql = format!("SELECT COUNT(*) FROM analytics{}", where_clause.sql());
        let count = on_pool!(self.pool, |p| {
            bind_params!(sqlx::query_scalar::<Db, i64>(&sql), where_clause.params())
                .fetch_one(p)
                .await
                .context("Failed to count analytics events")?
        });
        Ok(count)
    }

    async fn page_counts(&self, filter: &AnalyticsFilter) -> Result<Vec<PageCount>> {
        let rows = self.grouped("page", filter).await?;
        Ok(rows
            .into_iter()
            .map(|r| PageCount {
                page: r.label,
                count: r.total,
            })
            .collect())
    }

    async fn action_counts(&self, filter: &AnalyticsFilter) -> Result<Vec<ActionCount>> {
        let rows = self.grouped("action", filter).await?;
        Ok(rows
            .into_iter()
            .map(|r| ActionCount {
                action: r.label,
                count: r.total,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};
    use chrono::{Duration, Utc};

    async fn setup() -> SqlxAnalyticsRepository {
        let pool = create_test_pool().await.unwrap();
        migrations::run_migrations(&pool).await.unwrap();
        let now = Utc::now();
        for name in ["u1", "u2"] {
            sqlx::query("INSERT INTO users (email, username, first_name, last_name, password_hash, is_admin, created_at, updated_at) VALUES (?, ?, 'F', 'L', 'h', 0, ?, ?)")
                .bind(format!("{}@example.com", name))
                .bind(name)
                .bind(now)
                .bind(now)
                .execute(pool.as_sqlite().unwrap())
                .await
                .unwrap();
        }
        SqlxAnalyticsRepository::new(pool)
    }

    fn event(user_id: i64, page: &str, action: &str, age: Duration) -> AnalyticsEvent {
        AnalyticsEvent {
            id: 0,
            user_id: Some(user_id),
            page: page.into(),
            action: action.into(),
            metadata: None,
            ip_address: Some("127.0.0.1".into()),
            user_agent: None,
            created_at: Utc::now() - age,
        }
    }

    async fn seed(repo: &SqlxAnalyticsRepository) {
        repo.create(&event(1, "/home", "view", Duration::days(10))).await.unwrap();
        repo.create(&event(1, "/home", "view", Duration::hours(2))).await.unwrap();
        repo.create(&event(1, "/posts", "click", Duration::hours(1))).await.unwrap();
        repo.create(&event(2, "/home", "click", Duration::minutes(5))).await.unwrap();
    }

    #[tokio::test]
    async fn test_list_newest_first_with_limit() {
        let repo = setup().await;
        seed(&repo).await;

        let events = repo.list(&AnalyticsFilter::default(), 100).await.unwrap();
        assert_eq!(events.len(), 4);
        assert_eq!(events[0].user_id, Some(2));

        assert_eq!(repo.list(&AnalyticsFilter::default(), 2).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_filters() {
        let repo = setup().await;
        seed(&repo).await;

        let own = AnalyticsFilter {
            user_id: Some(1),
            ..Default::default()
        };
        assert_eq!(repo.count(&own).await.unwrap(), 3);

        let recent = AnalyticsFilter {
            start: Some(Utc::now() - Duration::days(1)),
            ..Default::default()
        };
        assert_eq!(repo.count(&recent).await.unwrap(), 3);

        let old = AnalyticsFilter {
            end: Some(Utc::now() - Duration::days(1)),
            ..Default::default()
        };
        assert_eq!(repo.count(&old).await.unwrap(), 1);

        let home_clicks = AnalyticsFilter {
            page: Some("/home".into()),
            action: Some("click".into()),
            ..Default::default()
        };
        assert_eq!(repo.count(&home_clicks).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_grouped_counts() {
        let repo = setup().await;
        seed(&repo).await;

        let pages = repo.page_counts(&AnalyticsFilter::default()).await.unwrap();
        assert_eq!(
            pages[0],
            PageCount {
                page: "/home".into(),
                count: 3
            }
        );
        assert_eq!(pages.len(), 2);

        let actions = repo.action_counts(&AnalyticsFilter::default()).await.unwrap();
        assert_eq!(actions.len(), 2);
        assert_eq!(actions.iter().map(|a| a.count).sum::<i64>(), 4);
    }
}
