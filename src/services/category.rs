//! Category service
//!
//! Category listing with post counts, and create/update/delete with the rule
//! that no two categories share a name or a slug.

use crate::db::repositories::CategoryRepository;
use crate::models::{Category, CategoryWithCount, CreateCategoryInput, UpdateCategoryInput};
use chrono::Utc;
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum CategoryServiceError {
    #[error("Category not found")]
    NotFound,

    #[error("A category with this name or slug already exists")]
    Duplicate,

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

pub struct CategoryService {
    repo: Arc<dyn CategoryRepository>,
}

impl CategoryService {
    pub fn new(repo: Arc<dyn CategoryRepository>) -> Self {
        Self { repo }
    }

    /// Categories ordered by name, each with its post count and, when asked,
    /// its posts
    pub async fn list(
        &self,
        search: Option<&str>,
        include_posts: bool,
    ) -> Result<Vec<CategoryWithCount>, CategoryServiceError> {
        let categories = self.repo.list(search).await?;
        let ids: Vec<i64> = categories.iter().map(|c| c.id).collect();

        let counts = self.repo.post_counts(&ids).await?;
        let mut posts = if include_posts {
            self.repo.posts_for(&ids).await?
        } else {
            Default::default()
        };

        Ok(categories
            .into_iter()
            .map(|category| {
                let post_count = counts.get(&category.id).copied().unwrap_or(0);
                let embedded = include_posts.then(|| posts.remove(&category.id).unwrap_or_default());
                CategoryWithCount {
                    category,
                    post_count,
                    posts: embedded,
                }
            })
            .collect())
    }

    pub async fn get(&self, id: i64) -> Result<CategoryWithCount, CategoryServiceError> {
        let category = self
            .repo
            .get_by_id(id)
            .await?
            .ok_or(CategoryServiceError::NotFound)?;
        self.with_count(category).await
    }

    pub async fn create(&self, input: CreateCategoryInput) -> Result<CategoryWithCount, CategoryServiceError> {
        let name = input.name.trim().to_string();
        if self.repo.find_conflict(&name, &input.slug, None).await?.is_some() {
            return Err(CategoryServiceError::Duplicate);
        }

        let description = input.description.filter(|d| !d.trim().is_empty());
        let category = self
            .repo
            .create(&Category::new(name, input.slug, description))
            .await?;
        tracing::info!(category_id = category.id, slug = %category.slug, "Category created");

        Ok(CategoryWithCount {
            category,
            post_count: 0,
            posts: None,
        })
    }

    /// Apply the supplied fields; an empty description clears it
    pub async fn update(
        &self,
        id: i64,
        input: UpdateCategoryInput,
    ) -> Result<CategoryWithCount, CategoryServiceError> {
        let mut category = self
            .repo
            .get_by_id(id)
            .await?
            .ok_or(CategoryServiceError::NotFound)?;

        if let Some(name) = input.name {
            category.name = name.trim().to_string();
        }
        if let Some(slug) = input.slug {
            category.slug = slug;
        }
        if let Some(description) = input.description {
            category.description = Some(description).filter(|d| !d.trim().is_empty());
        }

        if self
            .repo
            .find_conflict(&category.name, &category.slug, Some(id))
            .await?
            .is_some()
        {
            return Err(CategoryServiceError::Duplicate);
        }

        category.updated_at = Utc::now();
        let category = self.repo.update(&category).await?;
        self.with_count(category).await
    }

    /// Delete a category; its posts stay and lose the link
    pub async fn delete(&self, id: i64) -> Result<(), CategoryServiceError> {
        if !self.repo.delete(id).await? {
            return Err(CategoryServiceError::NotFound);
        }
        tracing::info!(category_id = id, "Category deleted");
        Ok(())
    }

    async fn with_count(&self, category: Category) -> Result<CategoryWithCount, CategoryServiceError> {
        let post_count = self
            .repo
            .post_counts(&[category.id])
            .await?
            .get(&category.id)
            .copied()
            .unwrap_or(0);
        Ok(CategoryWithCount {
            category,
            post_count,
            posts: None,
        })
    }
}
