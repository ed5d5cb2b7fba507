//! User repository
//!
//! - `UserRepository` trait defining the interface for user data access
//! - `SqlxUserRepository` implementing it for SQLite and MySQL

use crate::db::pool::on_pool;
use crate::db::query::{bind_params, placeholders};
use crate::db::{DynDatabasePool, LastInsertId, SqlParam};
use crate::models::{User, UserSummary};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;

const USER_COLUMNS: &str =
    "id, email, username, first_name, last_name, password_hash, is_admin, created_at, updated_at";

/// User repository trait
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a user; the returned copy carries the generated id
    async fn create(&self, user: &User) -> Result<User>;

    async fn get_by_id(&self, id: i64) -> Result<Option<User>>;

    /// Lookup by (already lowercased) email
    async fn get_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Whether any account uses this email or this username
    async fn exists_by_email_or_username(&self, email: &str, username: &str) -> Result<bool>;

    async fn count(&self) -> Result<i64>;

    async fn count_created_since(&self, since: DateTime<Utc>) -> Result<i64>;

    /// Newest accounts first
    async fn list_recent(&self, limit: i64) -> Result<Vec<User>>;

    /// Author blocks for a set of user ids; unknown ids are absent
    async fn summaries(&self, ids: &[i64]) -> Result<HashMap<i64, UserSummary>>;
}

/// SQLx-based user repository implementation
pub struct SqlxUserRepository {
    pool: DynDatabasePool,
}

impl SqlxUserRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn UserRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl UserRepository for SqlxUserRepository {
    async fn create(&self, user: &User) -> Result<User> {
        let id = on_pool!(self.pool, |p| {
            sqlx::query(
                r#"
                INSERT INTO users (email, username, first_name, last_name, password_hash, is_admin, created_at, updated_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&user.email)
            .bind(&user.username)
            .bind(&user.first_name)
            .bind(&user.last_name)
            .bind(&user.password_hash)
            .bind(user.is_admin)
            .bind(user.created_at)
            .bind(user.updated_at)
            .execute(p)
            .await
            .context("Failed to create user")?
            .insert_id()
        });

        Ok(User { id, ..user.clone() })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS);
        let user = on_pool!(self.pool, |p| {
            sqlx::query_as::<Db, User>(&sql)
                .bind(id)
                .fetch_optional(p)
                .await
                .context("Failed to get user by id")?
        });
        Ok(user)
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE email = ?", USER_COLUMNS);
        let user = on_pool!(self.pool, |p| {
            sqlx::query_as::<Db, User>(&sql)
                .bind(email)
                .fetch_optional(p)
                .await
                .context("Failed to get user by email")?
        });
        Ok(user)
    }

    async fn exists_by_email_or_username(&self, email: &str, username: &str) -> Result<bool> {
        let count: i64 = on_pool!(self.pool, |p| {
            sqlx::query_scalar::<Db, i64>("SELECT COUNT(*) FROM users WHERE email = ? OR username = ?")
                .bind(email)
                .bind(username)
                .fetch_one(p)
                .await
                .context("Failed to check user existence")?
        });
        Ok(count > 0)
    }

    async fn count(&self) -> Result<i64> {
        let count = on_pool!(self.pool, |p| {
            sqlx::query_scalar::<Db, i64>("SELECT COUNT(*) FROM users")
                .fetch_one(p)
                .await
                .context("Failed to count users")?
        });
        Ok(count)
    }

    async fn count_created_since(&self, since: DateTime<Utc>) -> Result<i64> {
        let count = on_pool!(self.pool, |p| {
            sqlx::query_scalar::<Db, i64>("SELECT COUNT(*) FROM users WHERE created_at >= ?")
                .bind(since)
                .fetch_one(p)
                .await
                .context("Failed to count new users")?
        });
        Ok(count)
    }

    async fn list_recent(&self, limit: i64) -> Result<Vec<User>> {
        let sql = format!(
            "SELECT {} FROM users ORDER BY created_at DESC, id DESC LIMIT ?",
            USER_COLUMNS
        );
        let users = on_pool!(self.pool, |p| {
            sqlx::query_as::<Db, User>(&sql)
                .bind(limit)
                .fetch_all(p)
                .await
                .context("Failed to list recent users")?
        });
        Ok(users)
    }

    async fn summaries(&self, ids: &[i64]) -> Result<HashMap<i64, UserSummary>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let mut unique = ids.to_vec();
        unique.sort_unstable();
        unique.dedup();

        let sql = format!(
            "SELECT {} FROM users WHERE id IN ({})",
            USER_COLUMNS,
            placeholders(unique.len())
        );
        let params: Vec<SqlParam> = unique.iter().map(|id| SqlParam::Int(*id)).collect();

        let users = on_pool!(self.pool, |p| {
            bind_params!(sqlx::query_as::<Db, User>(&sql), &params)
                .fetch_all(p)
                .await
                .context("Failed to load user summaries")?
        });

        Ok(users.into_iter().map(|u| (u.id, u.summary())).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};

    async fn setup_test_repo() -> SqlxUserRepository {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        SqlxUserRepository::new(pool)
    }

    fn test_user(username: &str, is_admin: bool) -> User {
        User::new(
            username.to_string(),
            format!("{}@example.com", username),
            "Test".to_string(),
            "User".to_string(),
            "hash".to_string(),
            is_admin,
        )
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let repo = setup_test_repo().await;
        let created = repo.create(&test_user("alice", true)).await.unwrap();
        assert!(created.id > 0);

        let found = repo.get_by_id(created.id).await.unwrap().expect("user");
        assert_eq!(found.username, "alice");
        assert!(found.is_admin);
        assert_eq!(found.password_hash, "hash");

        let by_email = repo.get_by_email("alice@example.com").await.unwrap();
        assert_eq!(by_email.map(|u| u.id), Some(created.id));
        assert!(repo.get_by_id(999).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_exists_by_email_or_username() {
        let repo = setup_test_repo().await;
        repo.create(&test_user("bob", false)).await.unwrap();

        assert!(repo.exists_by_email_or_username("bob@example.com", "other").await.unwrap());
        assert!(repo.exists_by_email_or_username("other@example.com", "bob").await.unwrap());
        assert!(!repo.exists_by_email_or_username("x@example.com", "x").await.unwrap());
    }

    #[tokio::test]
    async fn test_counts_and_recent() {
        let repo = setup_test_repo().await;
        let before = Utc::now() - chrono::Duration::seconds(1);
        for name in ["u1", "u2", "u3"] {
            repo.create(&test_user(name, false)).await.unwrap();
        }

        assert_eq!(repo.count().await.unwrap(), 3);
        assert_eq!(repo.count_created_since(before).await.unwrap(), 3);
        assert_eq!(
            repo.count_created_since(Utc::now() + chrono::Duration::hours(1))
                .await
                .unwrap(),
            0
        );

        let recent = repo.list_recent(2).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].username, "u3");
    }

    #[tokio::test]
    async fn test_summaries() {
        let repo = setup_test_repo().await;
        let a = repo.create(&test_user("a1", false)).await.unwrap();
        let b = repo.create(&test_user("b1", false)).await.unwrap();

        let map = repo.summaries(&[a.id, b.id, a.id, 404]).await.unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(map[&b.id].username, "b1");
        assert!(repo.summaries(&[]).await.unwrap().is_empty());
    }
}
