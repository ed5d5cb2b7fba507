//! Comment repository

use crate::db::pool::on_pool;
use crate::db::query::{bind_params, placeholders};
use crate::db::{DynDatabasePool, LastInsertId};
use crate::models::Comment;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

use super::{id_params, CountRow};

const COMMENT_COLUMNS: &str = "id, content, post_id, author_id, created_at, updated_at";

#[async_trait]
pub trait CommentRepository: Send + Sync {
    async fn create(&self, comment: &Comment) -> Result<Comment>;

    async fn get_by_id(&self, id: i64) -> Result<Option<Comment>>;

    async fn delete(&self, id: i64) -> Result<bool>;

    /// Comments of a post, newest first
    async fn list_by_post(&self, post_id: i64) -> Result<Vec<Comment>>;

    /// Comment totals per post; posts without comments are absent
    async fn counts_for_posts(&self, post_ids: &[i64]) -> Result<HashMap<i64, i64>>;
}

pub struct SqlxCommentRepository {
    pool: DynDatabasePool,
}

impl SqlxCommentRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn CommentRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl CommentRepository for SqlxCommentRepository {
    async fn create(&self, comment: &Comment) -> Result<Comment> {
        let id = on_pool!(self.pool, |p| {
            sqlx::query(
                "INSERT INTO comments (content, post_id, author_id, created_at, updated_at) VALUES (?, ?, ?, ?, ?)",
            )
            .bind(&comment.content)
            .bind(comment.post_id)
            .bind(comment.author_id)
            .bind(comment.created_at)
            .bind(comment.updated_at)
            .execute(p)
            .await
            .context("Failed to create comment")?
            .insert_id()
        });
        Ok(Comment { id, ..comment.clone() })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Comment>> {
        let sql = format!("SELECT {} FROM comments WHERE id = ?", COMMENT_COLUMNS);
        let comment = on_pool!(self.pool, |p| {
            sqlx::query_as::<Db, Comment>(&sql)
                .bind(id)
                .fetch_optional(p)
                .await
                .context("Failed to get comment")?
        });
        Ok(comment)
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let affected = on_pool!(self.pool, |p| {
            sqlx::query("DELETE FROM comments WHERE id = ?")
                .bind(id)
                .execute(p)
                .await
                .context("Failed to delete comment")?
                .rows_affected()
        });
        Ok(affected > 0)
    }

    async fn list_by_post(&self, post_id: i64) -> Result<Vec<Comment>> {
        let sql = format!(
            "SELECT {} FROM comments WHERE post_id = ? ORDER BY created_at DESC, id DESC",
            COMMENT_COLUMNS
        );
        let comments = on_pool!(self.pool, |p| {
            sqlx::query_as::<Db, Comment>(&sql)
                .bind(post_id)
                .fetch_all(p)
                .await
                .context("Failed to list comments")?
        });
        Ok(comments)
    }

    async fn counts_for_posts(&self, post_ids: &[i64]) -> Result<HashMap<i64, i64>> {
        if post_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let sql = format!(
            "SELECT post_id AS owner_id, COUNT(*) AS total FROM comments WHERE post_id IN ({}) GROUP BY post_id",
            placeholders(post_ids.len())
        );
        let params = id_params(post_ids);
        let rows = on_pool!(self.pool, |p| {
            bind_params!(sqlx::query_as::<Db, CountRow>(&sql), &params)
                .fetch_all(p)
                .await
                .context("Failed to count comments")?
        });
        Ok(rows.into_iter().map(|r| (r.owner_id, r.total)).collect())
    }
}
