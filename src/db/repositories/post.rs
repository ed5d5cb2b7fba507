//! Post repository
//!
//! - `PostRepository` trait defining the interface for post data access
//! - `SqlxPostRepository` implementing it for SQLite and MySQL
//!
//! Category and tag links live in the `post_categories` and `post_tags` join
//! tables and are written in the same transaction as the post row.

use crate::db::pool::on_pool;
use crate::db::query::{bind_params, placeholders, Filter, Page};
use crate::db::{DynDatabasePool, LastInsertId, SqlParam};
use crate::models::{Category, Post, PostFilter, PostStatus, Tag};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;

use super::id_params;

const POST_COLUMNS: &str =
    "id, title, content, slug, status, author_id, published_at, created_at, updated_at";

/// Post repository trait
#[async_trait]
pub trait PostRepository: Send + Sync {
    /// Insert a post together with its category and tag links
    async fn create(&self, post: &Post, category_ids: &[i64], tag_ids: &[i64]) -> Result<Post>;

    async fn get_by_id(&self, id: i64) -> Result<Option<Post>>;

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Post>>;

    /// Write the post row; link sets given as `Some` replace the existing ones
    async fn update(
        &self,
        post: &Post,
        category_ids: Option<&[i64]>,
        tag_ids: Option<&[i64]>,
    ) -> Result<Post>;

    async fn delete(&self, id: i64) -> Result<bool>;

    /// One page of posts, newest first, plus the total matching the filter
    async fn list(&self, filter: &PostFilter, page: Page) -> Result<(Vec<Post>, i64)>;

    /// Categories of each post, ordered by name
    async fn categories_for(&self, post_ids: &[i64]) -> Result<HashMap<i64, Vec<Category>>>;

    /// Tags of each post, ordered by name
    async fn tags_for(&self, post_ids: &[i64]) -> Result<HashMap<i64, Vec<Tag>>>;

    async fn count(&self) -> Result<i64>;

    async fn count_created_since(&self, since: DateTime<Utc>) -> Result<i64>;

    /// Post totals per status; statuses without posts are absent
    async fn count_by_status(&self) -> Result<HashMap<PostStatus, i64>>;

    async fn list_recent(&self, limit: i64) -> Result<Vec<Post>>;
}

#[derive(sqlx::FromRow)]
struct PostRow {
    id: i64,
    title: String,
    content: String,
    slug: String,
    status: String,
    author_id: i64,
    published_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<PostRow> for Post {
    type Error = anyhow::Error;

    fn try_from(row: PostRow) -> Result<Self> {
        Ok(Post {
            id: row.id,
            title: row.title,
            content: row.content,
            slug: row.slug,
            status: row.status.parse()?,
            author_id: row.author_id,
            published_at: row.published_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn into_posts(rows: Vec<PostRow>) -> Result<Vec<Post>> {
    rows.into_iter().map(Post::try_from).collect()
}

#[derive(sqlx::FromRow)]
struct PostCategoryRow {
    post_id: i64,
    #[sqlx(flatten)]
    category: Category,
}

#[derive(sqlx::FromRow)]
struct PostTagRow {
    post_id: i64,
    #[sqlx(flatten)]
    tag: Tag,
}

#[derive(sqlx::FromRow)]
struct StatusCountRow {
    status: String,
    total: i64,
}

/// SQLx-based post repository implementation
pub struct SqlxPostRepository {
    pool: DynDatabasePool,
}

impl SqlxPostRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn PostRepository> {
        Arc::new(Self::new(pool))
    }
}

fn build_filter(filter: &PostFilter) -> Filter {
    let mut f = Filter::new();
    if let Some(status) = filter.status {
        f.push("status = ?", [SqlParam::Text(status.as_str().to_string())]);
    }
    if let Some(term) = filter.search.as_deref().filter(|s| !s.trim().is_empty()) {
        f.push_search(&["title", "content"], term);
    }
    if let Some(category_id) = filter.category_id {
        f.push(
            "id IN (SELECT post_id FROM post_categories WHERE category_id = ?)",
            [SqlParam::Int(category_id)],
        );
    }
    if let Some(tag_id) = filter.tag_id {
        f.push(
            "id IN (SELECT post_id FROM post_tags WHERE tag_id = ?)",
            [SqlParam::Int(tag_id)],
        );
    }
    f
}

#[async_trait]
impl PostRepository for SqlxPostRepository {
    async fn create(&self, post: &Post, category_ids: &[i64], tag_ids: &[i64]) -> Result<Post> {
        let id = on_pool!(self.pool, |p| {
            let mut tx = p.begin().await.context("Failed to begin transaction")?;

            let id = sqlx::query(
                r#"
                INSERT INTO posts (title, content, slug, status, author_id, published_at, created_at, updated_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&post.title)
            .bind(&post.content)
            .bind(&post.slug)
            .bind(post.status.as_str())
            .bind(post.author_id)
            .bind(post.published_at)
            .bind(post.created_at)
            .bind(post.updated_at)
            .execute(&mut *tx)
            .await
            .context("Failed to create post")?
            .insert_id();

            for category_id in category_ids {
                sqlx::query("INSERT INTO post_categories (post_id, category_id) VALUES (?, ?)")
                    .bind(id)
                    .bind(category_id)
                    .execute(&mut *tx)
                    .await
                    .context("Failed to link post category")?;
            }
            for tag_id in tag_ids {
                sqlx::query("INSERT INTO post_tags (post_id, tag_id) VALUES (?, ?)")
                    .bind(id)
                    .bind(tag_id)
                    .execute(&mut *tx)
                    .await
                    .context("Failed to link post tag")?;
            }

            tx.commit().await.context("Failed to commit post")?;
            id
        });

        Ok(Post { id, ..post.clone() })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Post>> {
        let sql = format!("SELECT {} FROM posts WHERE id = ?", POST_COLUMNS);
        let row = on_pool!(self.pool, |p| {
            sqlx::query_as::<Db, PostRow>(&sql)
                .bind(id)
                .fetch_optional(p)
                .await
                .context("Failed to get post by id")?
        });
        row.map(Post::try_from).transpose()
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Post>> {
        let sql = format!("SELECT {} FROM posts WHERE slug = ?", POST_COLUMNS);
        let row = on_pool!(self.pool, |p| {
            sqlx::query_as::<Db, PostRow>(&sql)
                .bind(slug)
                .fetch_optional(p)
                .await
                .context("Failed to get post by slug")?
        });
        row.map(Post::try_from).transpose()
    }

    async fn update(
        &self,
        post: &Post,
        category_ids: Option<&[i64]>,
        tag_ids: Option<&[i64]>,
    ) -> Result<Post> {
        on_pool!(self.pool, |p| {
            let mut tx = p.begin().await.context("Failed to begin transaction")?;

            sqlx::query(
                r#"
                UPDATE posts
                SET title = ?, content = ?, slug = ?, status = ?, published_at = ?, updated_at = ?
                WHERE id = ?
                "#,
            )
            .bind(&post.title)
            .bind(&post.content)
            .bind(&post.slug)
            .bind(post.status.as_str())
            .bind(post.published_at)
            .bind(post.updated_at)
            .bind(post.id)
            .execute(&mut *tx)
            .await
            .context("Failed to update post")?;

            if let Some(ids) = category_ids {
                sqlx::query("DELETE FROM post_categories WHERE post_id = ?")
                    .bind(post.id)
                    .execute(&mut *tx)
                    .await
                    .context("Failed to clear post categories")?;
                for category_id in ids {
                    sqlx::query("INSERT INTO post_categories (post_id, category_id) VALUES (?, ?)")
                        .bind(post.id)
                        .bind(category_id)
                        .execute(&mut *tx)
                        .await
                        .context("Failed to link post category")?;
                }
            }
            if let Some(ids) = tag_ids {
                sqlx::query("DELETE FROM post_tags WHERE post_id = ?")
                    .bind(post.id)
                    .execute(&mut *tx)
                    .await
                    .context("Failed to clear post tags")?;
                for tag_id in ids {
                    sqlx::query("INSERT INTO post_tags (post_id, tag_id) VALUES (?, ?)")
                        .bind(post.id)
                        .bind(tag_id)
                        .execute(&mut *tx)
                        .await
                        .context("Failed to link post tag")?;
                }
            }

            tx.commit().await.context("Failed to commit post update")?;
        });

        Ok(post.clone())
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let affected = on_pool!(self.pool, |p| {
            sqlx::query("DELETE FROM posts WHERE id = ?")
                .bind(id)
                .execute(p)
                .await
                .context("Failed to delete post")?
                .rows_affected()
        });
        Ok(affected > 0)
    }

    async fn list(&self, filter: &PostFilter, page: Page) -> Result<(Vec<Post>, i64)> {
        let where_clause = build_filter(filter);
        let count_sql = format!("SELECT COUNT(*) FROM posts{}", where_clause.sql());
        let list_sql = format!(
            "SELECT {} FROM posts{} ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?",
            POST_COLUMNS,
            where_clause.sql()
        );

        let (total, rows) = on_pool!(self.pool, |p| {
            let total = bind_params!(sqlx::query_scalar::<Db, i64>(&count_sql), where_clause.params())
                .fetch_one(p)
                .await
                .context("Failed to count posts")?;
            let rows = bind_params!(sqlx::query_as::<Db, PostRow>(&list_sql), where_clause.params())
                .bind(page.limit)
                .bind(page.offset)
                .fetch_all(p)
                .await
                .context("Failed to list posts")?;
            (total, rows)
        });

        Ok((into_posts(rows)?, total))
    }

    async fn categories_for(&self, post_ids: &[i64]) -> Result<HashMap<i64, Vec<Category>>> {
        if post_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let sql = format!(
            r#"
            SELECT pc.post_id, c.id, c.name, c.slug, c.description, c.created_at, c.updated_at
            FROM post_categories pc
            INNER JOIN categories c ON c.id = pc.category_id
            WHERE pc.post_id IN ({})
            ORDER BY c.name ASC
            "#,
            placeholders(post_ids.len())
        );
        let params = id_params(post_ids);
        let rows = on_pool!(self.pool, |p| {
            bind_params!(sqlx::query_as::<Db, PostCategoryRow>(&sql), &params)
                .fetch_all(p)
                .await
                .context("Failed to load post categories")?
        });

        let mut map: HashMap<i64, Vec<Category>> = HashMap::new();
        for row in rows {
            map.entry(row.post_id).or_default().push(row.category);
        }
        Ok(map)
    }

    async fn tags_for(&self, post_ids: &[i64]) -> Result<HashMap<i64, Vec<Tag>>> {
        if post_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let sql = format!(
            r#"
            SELECT pt.post_id, t.id, t.name, t.slug, t.created_at, t.updated_at
            FROM post_tags pt
            INNER JOIN tags t ON t.id = pt.tag_id
            WHERE pt.post_id IN ({})
            ORDER BY t.name ASC
            "#,
            placeholders(post_ids.len())
        );
        let params = id_params(post_ids);
        let rows = on_pool!(self.pool, |p| {
            bind_params!(sqlx::query_as::<Db, PostTagRow>(&sql), &params)
                .fetch_all(p)
                .await
                .context("Failed to load post tags")?
        });

        let mut map: HashMap<i64, Vec<Tag>> = HashMap::new();
        for row in rows {
            map.entry(row.post_id).or_default().push(row.tag);
        }
        Ok(map)
    }

    async fn count(&self) -> Result<i64> {
        let count = on_pool!(self.pool, |p| {
            sqlx::query_scalar::<Db, i64>("SELECT COUNT(*) FROM posts")
                .fetch_one(p)
                .await
                .context("Failed to count posts")?
        });
        Ok(count)
    }

    async fn count_created_since(&self, since: DateTime<Utc>) -> Result<i64> {
        let count = on_pool!(self.pool, |p| {
            sqlx::query_scalar::<Db, i64>("SELECT COUNT(*) FROM posts WHERE created_at >= ?")
                .bind(since)
                .fetch_one(p)
                .await
                .context("Failed to count new posts")?
        });
        Ok(count)
    }

    async fn count_by_status(&self) -> Result<HashMap<PostStatus, i64>> {
        let rows = on_pool!(self.pool, |p| {
            sqlx::query_as::<Db, StatusCountRow>(
                "SELECT status, COUNT(*) AS total FROM posts GROUP BY status",
            )
            .fetch_all(p)
            .await
            .context("Failed to count posts by status")?
        });

        let mut counts = HashMap::new();
        for row in rows {
            match row.status.parse::<PostStatus>() {
                Ok(status) => {
                    counts.insert(status, row.total);
                }
                Err(e) => tracing::warn!(status = %row.status, "Skipping post status: {}", e),
            }
        }
        Ok(counts)
    }

    async fn list_recent(&self, limit: i64) -> Result<Vec<Post>> {
        let sql = format!(
            "SELECT {} FROM posts ORDER BY created_at DESC, id DESC LIMIT ?",
            POST_COLUMNS
        );
        let rows = on_pool!(self.pool, |p| {
            sqlx::query_as::<Db, PostRow>(&sql)
                .bind(limit)
                .fetch_all(p)
                .await
                .context("Failed to list recent posts")?
        });
        into_posts(rows)
    }
}
