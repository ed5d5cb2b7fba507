//! Category repository
//!
//! - `CategoryRepository` trait defining the interface for category data access
//! - `SqlxCategoryRepository` implementing it for SQLite and MySQL

use crate::db::pool::on_pool;
use crate::db::query::{bind_params, placeholders, Filter};
use crate::db::{DynDatabasePool, LastInsertId};
use crate::models::{Category, PostSummary, TaxonomyRank};

use super::{group_linked_posts, id_params, CountRow, LinkedPostRow, RankRow};
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

const CATEGORY_COLUMNS: &str = "id, name, slug, description, created_at, updated_at";

/// Category repository trait
#[async_trait]
pub trait CategoryRepository: Send + Sync {
    async fn create(&self, category: &Category) -> Result<Category>;

    async fn get_by_id(&self, id: i64) -> Result<Option<Category>>;

    /// First category (other than `exclude_id`) using this name or slug
    async fn find_conflict(&self, name: &str, slug: &str, exclude_id: Option<i64>) -> Result<Option<Category>>;

    /// Categories ordered by name, optionally filtered by a search term over
    /// name and description
    async fn list(&self, search: Option<&str>) -> Result<Vec<Category>>;

    async fn update(&self, category: &Category) -> Result<Category>;

    /// Returns false when nothing was deleted
    async fn delete(&self, id: i64) -> Result<bool>;

    /// The subset of `ids` that exist
    async fn existing_ids(&self, ids: &[i64]) -> Result<Vec<i64>>;

    /// Number of posts linked to each category
    async fn post_counts(&self, ids: &[i64]) -> Result<HashMap<i64, i64>>;

    /// Posts linked to each category, newest first
    async fn posts_for(&self, ids: &[i64]) -> Result<HashMap<i64, Vec<PostSummary>>>;

    async fn count(&self) -> Result<i64>;

    /// Categories with the most posts
    async fn top_by_post_count(&self, limit: i64) -> Result<Vec<TaxonomyRank>>;
}

/// SQLx-based category repository implementation
pub struct SqlxCategoryRepository {
    pool: DynDatabasePool,
}

impl SqlxCategoryRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn CategoryRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl CategoryRepository for SqlxCategoryRepository {
    async fn create(&self, category: &Category) -> Result<Category> {
        let id = on_pool!(self.pool, |p| {
            sqlx::query(
                r#"
                INSERT INTO categories (name, slug, description, created_at, updated_at)
                VALUES (?, ?, ?, ?, ?)
                "#,
            )
            .bind(&category.name)
            .bind(&category.slug)
            .bind(&category.description)
            .bind(category.created_at)
            .bind(category.updated_at)
            .execute(p)
            .await
            .context("Failed to create category")?
            .insert_id()
        });

        Ok(Category { id, ..category.clone() })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Category>> {
        let sql = format!("SELECT {} FROM categories WHERE id = ?", CATEGORY_COLUMNS);
        let category = on_pool!(self.pool, |p| {
            sqlx::query_as::<Db, Category>(&sql)
                .bind(id)
                .fetch_optional(p)
                .await
                .context("Failed to get category by id")?
        });
        Ok(category)
    }

    async fn find_conflict(&self, name: &str, slug: &str, exclude_id: Option<i64>) -> Result<Option<Category>> {
        let sql = format!(
            "SELECT {} FROM categories WHERE (name = ? OR slug = ?) AND id <> ? LIMIT 1",
            CATEGORY_COLUMNS
        );
        let category = on_pool!(self.pool, |p| {
            sqlx::query_as::<Db, Category>(&sql)
                .bind(name)
                .bind(slug)
                .bind(exclude_id.unwrap_or(0))
                .fetch_optional(p)
                .await
                .context("Failed to check category uniqueness")?
        });
        Ok(category)
    }

    async fn list(&self, search: Option<&str>) -> Result<Vec<Category>> {
        let mut filter = Filter::new();
        if let Some(term) = search.filter(|s| !s.trim().is_empty()) {
            filter.push_search(&["name", "COALESCE(description, '')"], term);
        }
        let sql = format!(
            "SELECT {} FROM categories{} ORDER BY name ASC",
            CATEGORY_COLUMNS,
            filter.sql()
        );

        let categories = on_pool!(self.pool, |p| {
            bind_params!(sqlx::query_as::<Db, Category>(&sql), filter.params())
                .fetch_all(p)
                .await
                .context("Failed to list categories")?
        });
        Ok(categories)
    }

    async fn update(&self, category: &Category) -> Result<Category> {
        on_pool!(self.pool, |p| {
            sqlx::query(
                "UPDATE categories SET name = ?, slug = ?, description = ?, updated_at = ? WHERE id = ?",
            )
            .bind(&category.name)
            .bind(&category.slug)
            .bind(&category.description)
            .bind(category.updated_at)
            .bind(category.id)
            .execute(p)
            .await
            .context("Failed to update category")?;
        });
        Ok(category.clone())
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let affected = on_pool!(self.pool, |p| {
            sqlx::query("DELETE FROM categories WHERE id = ?")
                .bind(id)
                .execute(p)
                .await
                .context("Failed to delete category")?
                .rows_affected()
        });
        Ok(affected > 0)
    }

    async fn existing_ids(&self, ids: &[i64]) -> Result<Vec<i64>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!("SELECT id FROM categories WHERE id IN ({})", placeholders(ids.len()));
        let params = id_params(ids);
        let found = on_pool!(self.pool, |p| {
            bind_params!(sqlx::query_scalar::<Db, i64>(&sql), &params)
                .fetch_all(p)
                .await
                .context("Failed to check category ids")?
        });
        Ok(found)
    }

    async fn post_counts(&self, ids: &[i64]) -> Result<HashMap<i64, i64>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let sql = format!(
            "SELECT category_id AS owner_id, COUNT(*) AS total FROM post_categories WHERE category_id IN ({}) GROUP BY category_id",
            placeholders(ids.len())
        );
        let params = id_params(ids);
        let rows = on_pool!(self.pool, |p| {
            bind_params!(sqlx::query_as::<Db, CountRow>(&sql), &params)
                .fetch_all(p)
                .await
                .context("Failed to count category posts")?
        });
        Ok(rows.into_iter().map(|r| (r.owner_id, r.total)).collect())
    }

    async fn posts_for(&self, ids: &[i64]) -> Result<HashMap<i64, Vec<PostSummary>>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let sql = format!(
            r#"
            SELECT pc.category_id AS owner_id, p.id, p.title, p.slug, p.status, p.created_at
            FROM post_categories pc
            INNER JOIN posts p ON p.id = pc.post_id
            WHERE pc.category_id IN ({})
            ORDER BY p.created_at DESC, p.id DESC
            "#,
            placeholders(ids.len())
        );
        let params = id_params(ids);
        let rows = on_pool!(self.pool, |p| {
            bind_params!(sqlx::query_as::<Db, LinkedPostRow>(&sql), &params)
                .fetch_all(p)
                .await
                .context("Failed to load category posts")?
        });
        Ok(group_linked_posts(rows))
    }

    async fn count(&self) -> Result<i64> {
        let count = on_pool!(self.pool, |p| {
            sqlx::query_scalar::<Db, i64>("SELECT COUNT(*) FROM categories")
                .fetch_one(p)
                .await
                .context("Failed to count categories")?
        });
        Ok(count)
    }

    async fn top_by_post_count(&self, limit: i64) -> Result<Vec<TaxonomyRank>> {
        let rows = on_pool!(self.pool, |p| {
            sqlx::query_as::<Db, RankRow>(
                r#"
                SELECT c.id, c.name, COUNT(pc.post_id) AS post_count
                FROM categories c
                LEFT JOIN post_categories pc ON pc.category_id = c.id
                GROUP BY c.id, c.name
                ORDER BY post_count DESC, c.name ASC
                LIMIT ?
                "#,
            )
            .bind(limit)
            .fetch_all(p)
            .await
            .context("Failed to rank categories")?
        });
        Ok(rows.into_iter().map(RankRow::into_rank).collect())
    }
}
