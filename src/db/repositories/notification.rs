//! Notification repository
//!
//! Every read and write except `create` is scoped to the owning user, so a
//! notification belonging to someone else behaves as if it did not exist.

use crate::db::pool::on_pool;
use crate::db::query::{bind_params, Filter, Page};
use crate::db::{DynDatabasePool, LastInsertId, SqlParam};
use crate::models::{Notification, NotificationFilter};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

const NOTIFICATION_COLUMNS: &str =
    "id, user_id, title, message, notification_type, is_read, created_at, updated_at";

#[async_trait]
pub trait NotificationRepository: Send + Sync {
    async fn create(&self, notification: &Notification) -> Result<Notification>;

    async fn get_for_user(&self, id: i64, user_id: i64) -> Result<Option<Notification>>;

    /// One page of the user's notifications, newest first, plus the total
    async fn list_for_user(
        &self,
        user_id: i64,
        filter: &NotificationFilter,
        page: Page,
    ) -> Result<(Vec<Notification>, i64)>;

    async fn unread_count(&self, user_id: i64) -> Result<i64>;

    /// Returns the updated notification, or None when it is not the user's
    async fn mark_read(&self, id: i64, user_id: i64) -> Result<Option<Notification>>;

    /// Number of notifications flipped to read
    async fn mark_all_read(&self, user_id: i64) -> Result<u64>;

    async fn delete_for_user(&self, id: i64, user_id: i64) -> Result<bool>;
}

#[derive(sqlx::FromRow)]
struct NotificationRow {
    id: i64,
    user_id: i64,
    title: String,
    message: String,
    notification_type: String,
    is_read: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<NotificationRow> for Notification {
    type Error = anyhow::Error;

    fn try_from(row: NotificationRow) -> Result<Self> {
        Ok(Notification {
            id: row.id,
            user_id: row.user_id,
            title: row.title,
            message: row.message,
            notification_type: row.notification_type.parse()?,
            is_read: row.is_read,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

pub struct SqlxNotificationRepository {
    pool: DynDatabasePool,
}

impl SqlxNotificationRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn NotificationRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl NotificationRepository for SqlxNotificationRepository {
    async fn create(&self, notification: &Notification) -> Result<Notification> {
        let id = on_pool!(self.pool, |p| {
            sqlx::query(
                r#"
                INSERT INTO notifications (user_id, title, message, notification_type, is_read, created_at, updated_at)
                VALUES (?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(notification.user_id)
            .bind(&notification.title)
            .bind(&notification.message)
            .bind(notification.notification_type.as_str())
            .bind(notification.is_read)
            .bind(notification.created_at)
            .bind(notification.updated_at)
            .execute(p)
            .await
            .context("Failed to create notification")?
            .insert_id()
        });
        Ok(Notification { id, ..notification.clone() })
    }

    async fn get_for_user(&self, id: i64, user_id: i64) -> Result<Option<Notification>> {
        let sql = format!(
            "SELECT {} FROM notifications WHERE id = ? AND user_id = ?",
            NOTIFICATION_COLUMNS
        );
        let row = on_pool!(self.pool, |p| {
            sqlx::query_as::<Db, NotificationRow>(&sql)
                .bind(id)
                .bind(user_id)
                .fetch_optional(p)
                .await
                .context("Failed to get notification")?
        });
        row.map(Notification::try_from).transpose()
    }

    async fn list_for_user(
        &self,
        user_id: i64,
        filter: &NotificationFilter,
        page: Page,
    ) -> Result<(Vec<Notification>, i64)> {
        let mut where_clause = Filter::new();
        where_clause.push("user_id = ?", [SqlParam::Int(user_id)]);
        if filter.unread_only {
            where_clause.push("is_read = ?", [SqlParam::Bool(false)]);
        }
        if let Some(kind) = filter.notification_type {
            where_clause.push(
                "notification_type = ?",
                [SqlParam::Text(kind.as_str().to_string())],
            );
        }

        let count_sql = format!("SELECT COUNT(*) FROM notifications{}", where_clause.sql());
        let list_sql = format!(
            "SELECT {} FROM notifications{} ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?",
            NOTIFICATION_COLUMNS,
            where_clause.sql()
        );

        let (total, rows) = on_pool!(self.pool, |p| {
            let total = bind_params!(sqlx::query_scalar::<Db, i64>(&count_sql), where_clause.params())
                .fetch_one(p)
                .await
                .context("Failed to count notifications")?;
            let rows = bind_params!(sqlx::query_as::<Db, NotificationRow>(&list_sql), where_clause.params())
                .bind(page.limit)
                .bind(page.offset)
                .fetch_all(p)
                .await
                .context("Failed to list notifications")?;
            (total, rows)
        });

        let items = rows
            .into_iter()
            .map(Notification::try_from)
            .collect::<Result<Vec<_>>>()?;
        Ok((items, total))
    }

    async fn unread_count(&self, user_id: i64) -> Result<i64> {
        let count = on_pool!(self.pool, |p| {
            sqlx::query_scalar::<Db, i64>(
                "SELECT COUNT(*) FROM notifications WHERE user_id = ? AND is_read = ?",
            )
            .bind(user_id)
            .bind(false)
            .fetch_one(p)
            .await
            .context("Failed to count unread notifications")?
        });
        Ok(count)
    }

    async fn mark_read(&self, id: i64, user_id: i64) -> Result<Option<Notification>> {
        let Some(mut notification) = self.get_for_user(id, user_id).await? else {
            return Ok(None);
        };

        let now = Utc::now();
        on_pool!(self.pool, |p| {
            sqlx::query("UPDATE notifications SET is_read = ?, updated_at = ? WHERE id = ? AND user_id = ?")
                .bind(true)
                .bind(now)
                .bind(id)
                .bind(user_id)
                .execute(p)
                .await
                .context("Failed to mark notification read")?;
        });

        notification.is_read = true;
        notification.updated_at = now;
        Ok(Some(notification))
    }

    async fn mark_all_read(&self, user_id: i64) -> Result<u64> {
        let affected = on_pool!(self.pool, |p| {
            sqlx::query(
                "UPDATE notifications SET is_read = ?, updated_at = ? WHERE user_id = ? AND is_read = ?",
            )
            .bind(true)
            .bind(Utc::now())
            .bind(user_id)
            .bind(false)
            .execute(p)
            .await
            .context("Failed to mark notifications read")?
            .rows_affected()
        });
        Ok(affected)
    }

    async fn delete_for_user(&self, id: i64, user_id: i64) -> Result<bool> {
        let affected = on_pool!(self.pool, |p| {
            sqlx::query("DELETE FROM notifications WHERE id = ? AND user_id = ?")
                .bind(id)
                .bind(user_id)
                .execute(p)
                .await
                .context("Failed to delete notification")?
                .rows_affected()
        });
        Ok(affected > 0)
    }
}
