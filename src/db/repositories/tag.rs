//! Tag repository
//!
//! - `TagRepository` trait defining the interface for tag data access
//! - `SqlxTagRepository` implementing it for SQLite and MySQL

use crate::db::pool::on_pool;
use crate::db::query::{bind_params, placeholders, Filter};
use crate::db::{DynDatabasePool, LastInsertId};
use crate::models::{PostSummary, Tag, TaxonomyRank};
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

use super::{group_linked_posts, id_params, CountRow, LinkedPostRow, RankRow};

const TAG_COLUMNS: &str = "id, name, slug, created_at, updated_at";

/// Tag repository trait
#[async_trait]
pub trait TagRepository: Send + Sync {
    async fn create(&self, tag: &Tag) -> Result<Tag>;

    async fn get_by_id(&self, id: i64) -> Result<Option<Tag>>;

    /// First tag (other than `exclude_id`) using this name or slug
    async fn find_conflict(&self, name: &str, slug: &str, exclude_id: Option<i64>) -> Result<Option<Tag>>;

    /// Tags ordered by name, optionally filtered over name and slug
    async fn list(&self, search: Option<&str>) -> Result<Vec<Tag>>;

    async fn update(&self, tag: &Tag) -> Result<Tag>;

    async fn delete(&self, id: i64) -> Result<bool>;

    async fn existing_ids(&self, ids: &[i64]) -> Result<Vec<i64>>;

    async fn post_counts(&self, ids: &[i64]) -> Result<HashMap<i64, i64>>;

    async fn posts_for(&self, ids: &[i64]) -> Result<HashMap<i64, Vec<PostSummary>>>;

    async fn count(&self) -> Result<i64>;

    async fn top_by_post_count(&self, limit: i64) -> Result<Vec<TaxonomyRank>>;
}

/// SQLx-based tag repository implementation
pub struct SqlxTagRepository {
    pool: DynDatabasePool,
}

impl SqlxTagRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn TagRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl TagRepository for SqlxTagRepository {
    async fn create(&self, tag: &Tag) -> Result<Tag> {
        let id = on_pool!(self.pool, |p| {
            sqlx::query("INSERT INTO tags (name, slug, created_at, updated_at) VALUES (?, ?, ?, ?)")
                .bind(&tag.name)
                .bind(&tag.slug)
                .bind(tag.created_at)
                .bind(tag.updated_at)
                .execute(p)
                .await
                .context("Failed to create tag")?
                .insert_id()
        });

        Ok(Tag { id, ..tag.clone() })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Tag>> {
        let sql = format!("SELECT {} FROM tags WHERE id = ?", TAG_COLUMNS);
        let tag = on_pool!(self.pool, |p| {
            sqlx::query_as::<Db, Tag>(&sql)
                .bind(id)
                .fetch_optional(p)
                .await
                .context("Failed to get tag by id")?
        });
        Ok(tag)
    }

    async fn find_conflict(&self, name: &str, slug: &str, exclude_id: Option<i64>) -> Result<Option<Tag>> {
        let sql = format!(
            "SELECT {} FROM tags WHERE (name = ? OR slug = ?) AND id <> ? LIMIT 1",
            TAG_COLUMNS
        );
        let tag = on_pool!(self.pool, |p| {
            sqlx::query_as::<Db, Tag>(&sql)
                .bind(name)
                .bind(slug)
                .bind(exclude_id.unwrap_or(0))
                .fetch_optional(p)
                .await
                .context("Failed to check tag uniqueness")?
        });
        Ok(tag)
    }

    async fn list(&self, search: Option<&str>) -> Result<Vec<Tag>> {
        let mut filter = Filter::new();
        if let Some(term) = search.filter(|s| !s.trim().is_empty()) {
            filter.push_search(&["name", "slug"], term);
        }
        let sql = format!("SELECT {} FROM tags{} ORDER BY name ASC", TAG_COLUMNS, filter.sql());

        let tags = on_pool!(self.pool, |p| {
            bind_params!(sqlx::query_as::<Db, Tag>(&sql), filter.params())
                .fetch_all(p)
                .await
                .context("Failed to list tags")?
        });
        Ok(tags)
    }

    async fn update(&self, tag: &Tag) -> Result<Tag> {
        on_pool!(self.pool, |p| {
            sqlx::query("UPDATE tags SET name = ?, slug = ?, updated_at = ? WHERE id = ?")
                .bind(&tag.name)
                .bind(&tag.slug)
                .bind(tag.updated_at)
                .bind(tag.id)
                .execute(p)
                .await
                .context("Failed to update tag")?;
        });
        Ok(tag.clone())
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let affected = on_pool!(self.pool, |p| {
            sqlx::query("DELETE FROM tags WHERE id = ?")
                .bind(id)
                .execute(p)
                .await
                .context("Failed to delete tag")?
                .rows_affected()
        });
        Ok(affected > 0)
    }

    async fn existing_ids(&self, ids: &[i64]) -> Result<Vec<i64>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!("SELECT id FROM tags WHERE id IN ({})", placeholders(ids.len()));
        let params = id_params(ids);
        let found = on_pool!(self.pool, |p| {
            bind_params!(sqlx::query_scalar::<Db, i64>(&sql), &params)
                .fetch_all(p)
                .await
                .context("Failed to check tag ids")?
        });
        Ok(found)
    }

    async fn post_counts(&self, ids: &[i64]) -> Result<HashMap<i64, i64>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let sql = format!(
            "SELECT tag_id AS owner_id, COUNT(*) AS total FROM post_tags WHERE tag_id IN ({}) GROUP BY tag_id",
            placeholders(ids.len())
        );
        let params = id_params(ids);
        let rows = on_pool!(self.pool, |p| {
            bind_params!(sqlx::query_as::<Db, CountRow>(&sql), &params)
                .fetch_all(p)
                .await
                .context("Failed to count tag posts")?
        });
        Ok(rows.into_iter().map(|r| (r.owner_id, r.total)).collect())
    }

    async fn posts_for(&self, ids: &[i64]) -> Result<HashMap<i64, Vec<PostSummary>>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let sql = format!(
            r#"
            SELECT pt.tag_id AS owner_id, p.id, p.title, p.slug, p.status, p.created_at
            FROM post_tags pt
            INNER JOIN posts p ON p.id = pt.post_id
            WHERE pt.tag_id IN ({})
            ORDER BY p.created_at DESC, p.id DESC
            "#,
            placeholders(ids.len())
        );
        let params = id_params(ids);
        let rows = on_pool!(self.pool, |p| {
            bind_params!(sqlx::query_as::<Db, LinkedPostRow>(&sql), &params)
                .fetch_all(p)
                .await
                .context("Failed to load tag posts")?
        });
        Ok(group_linked_posts(rows))
    }

    async fn count(&self) -> Result<i64> {
        let count = on_pool!(self.pool, |p| {
            sqlx::query_scalar::<Db, i64>("SELECT COUNT(*) FROM tags")
                .fetch_one(p)
                .await
                .context("Failed to count tags")?
        });
        Ok(count)
    }

    async fn top_by_post_count(&self, limit: i64) -> Result<Vec<TaxonomyRank>> {
        let rows = on_pool!(self.pool, |p| {
            sqlx::query_as::<Db, RankRow>(
                r#"
                SELECT t.id, t.name, COUNT(pt.post_id) AS post_count
                FROM tags t
                LEFT JOIN post_tags pt ON pt.tag_id = t.id
                GROUP BY t.id, t.name
                ORDER BY post_count DESC, t.name ASC
                LIMIT ?
                "#,
            )
            .bind(limit)
            .fetch_all(p)
            .await
            .context("Failed to rank tags")?
        });
        Ok(rows.into_iter().map(RankRow::into_rank).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};
    use chrono::Utc;

    async fn setup_test_repo() -> (DynDatabasePool, SqlxTagRepository) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        let repo = SqlxTagRepository::new(pool.clone());
        (pool, repo)
    }

    /// Insert an author and a post, linking the post to the given tags
    async fn insert_post(pool: &DynDatabasePool, slug: &str, tag_ids: &[i64]) -> i64 {
        let sqlite = pool.as_sqlite().unwrap();
        let now = Utc::now();
        sqlx::query("INSERT OR IGNORE INTO users (id, email, username, first_name, last_name, password_hash, is_admin, created_at, updated_at) VALUES (1, 'a@example.com', 'author', 'A', 'B', 'h', 0, ?, ?)")
            .bind(now)
            .bind(now)
            .execute(sqlite)
            .await
            .unwrap();
        let post_id = sqlx::query("INSERT INTO posts (title, content, slug, status, author_id, created_at, updated_at) VALUES ('Title', 'Body', ?, 'PUBLISHED', 1, ?, ?)")
            .bind(slug)
            .bind(now)
            .bind(now)
            .execute(sqlite)
            .await
            .unwrap()
            .last_insert_rowid();
        for tag_id in tag_ids {
            sqlx::query("INSERT INTO post_tags (post_id, tag_id) VALUES (?, ?)")
                .bind(post_id)
                .bind(tag_id)
                .execute(sqlite)
                .await
                .unwrap();
        }
        post_id
    }

    #[tokio::test]
    async fn test_create_and_find_conflict() {
        let (_pool, repo) = setup_test_repo().await;
        let rust = repo.create(&Tag::new("Rust".into(), "rust".into())).await.unwrap();
        assert!(rust.id > 0);

        assert!(repo.find_conflict("Rust", "x", None).await.unwrap().is_some());
        assert!(repo.find_conflict("x", "rust", None).await.unwrap().is_some());
        assert!(repo.find_conflict("Rust", "rust", Some(rust.id)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_search_over_slug() {
        let (_pool, repo) = setup_test_repo().await;
        repo.create(&Tag::new("Next.js".into(), "nextjs".into())).await.unwrap();
        repo.create(&Tag::new("React".into(), "react".into())).await.unwrap();

        assert_eq!(repo.list(None).await.unwrap().len(), 2);
        let found = repo.list(Some("nextjs")).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "Next.js");
    }

    #[tokio::test]
    async fn test_counts_posts_and_ranking() {
        let (pool, repo) = setup_test_repo().await;
        let a = repo.create(&Tag::new("A".into(), "a".into())).await.unwrap();
        let b = repo.create(&Tag::new("B".into(), "b".into())).await.unwrap();
        let c = repo.create(&Tag::new("C".into(), "c".into())).await.unwrap();

        insert_post(&pool, "p1", &[a.id, b.id]).await;
        insert_post(&pool, "p2", &[b.id]).await;

        let counts = repo.post_counts(&[a.id, b.id, c.id]).await.unwrap();
        assert_eq!(counts.get(&a.id), Some(&1));
        assert_eq!(counts.get(&b.id), Some(&2));
        assert_eq!(counts.get(&c.id), None);

        let posts = repo.posts_for(&[b.id]).await.unwrap();
        assert_eq!(posts[&b.id].len(), 2);

        let ranked = repo.top_by_post_count(2).await.unwrap();
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].name, "B");
        assert_eq!(ranked[0].post_count, 2);
        assert_eq!(ranked[1].name, "A");
    }

    #[tokio::test]
    async fn test_delete_detaches_posts() {
        let (pool, repo) = setup_test_repo().await;
        let tag = repo.create(&Tag::new("Gone".into(), "gone".into())).await.unwrap();
        insert_post(&pool, "kept", &[tag.id]).await;

        assert!(repo.delete(tag.id).await.unwrap());
        let links: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM post_tags")
            .fetch_one(pool.as_sqlite().unwrap())
            .await
            .unwrap();
        let posts: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM posts")
            .fetch_one(pool.as_sqlite().unwrap())
            .await
            .unwrap();
        assert_eq!(links, 0);
        assert_eq!(posts, 1);
    }
}
