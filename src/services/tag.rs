//! Tag service

use crate::db::repositories::TagRepository;
use crate::models::{CreateTagInput, Tag, TagWithCount, UpdateTagInput};
use chrono::Utc;
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum TagServiceError {
    #[error("Tag not found")]
    NotFound,

    #[error("A tag with this name or slug already exists")]
    Duplicate,

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

pub struct TagService {
    repo: Arc<dyn TagRepository>,
}

impl TagService {
    pub fn new(repo: Arc<dyn TagRepository>) -> Self {
        Self { repo }
    }

    pub async fn list(
        &self,
        search: Option<&str>,
        include_posts: bool,
    ) -> Result<Vec<TagWithCount>, TagServiceError> {
        let tags = self.repo.list(search).await?;
        let ids: Vec<i64> = tags.iter().map(|t| t.id).collect();

        let counts = self.repo.post_counts(&ids).await?;
        let mut posts = if include_posts {
            self.repo.posts_for(&ids).await?
        } else {
            Default::default()
        };

        Ok(tags
            .into_iter()
            .map(|tag| TagWithCount {
                post_count: counts.get(&tag.id).copied().unwrap_or(0),
                posts: include_posts.then(|| posts.remove(&tag.id).unwrap_or_default()),
                tag,
            })
            .collect())
    }

    pub async fn create(&self, input: CreateTagInput) -> Result<TagWithCount, TagServiceError> {
        let name = input.name.trim().to_string();
        if self.repo.find_conflict(&name, &input.slug, None).await?.is_some() {
            return Err(TagServiceError::Duplicate);
        }

        let tag = self.repo.create(&Tag::new(name, input.slug)).await?;
        tracing::info!(tag_id = tag.id, slug = %tag.slug, "Tag created");
        Ok(TagWithCount {
            tag,
            post_count: 0,
            posts: None,
        })
    }

    pub async fn update(&self, id: i64, input: UpdateTagInput) -> Result<TagWithCount, TagServiceError> {
        let mut tag = self
            .repo
            .get_by_id(id)
            .await?
            .ok_or(TagServiceError::NotFound)?;

        if let Some(name) = input.name {
            tag.name = name.trim().to_string();
        }
        if let Some(slug) = input.slug {
            tag.slug = slug;
        }
        if self
            .repo
            .find_conflict(&tag.name, &tag.slug, Some(id))
            .await?
            .is_some()
        {
            return Err(TagServiceError::Duplicate);
        }

        tag.updated_at = Utc::now();
        let tag = self.repo.update(&tag).await?;
        let post_count = self
            .repo
            .post_counts(&[id])
            .await?
            .get(&id)
            .copied()
            .unwrap_or(0);
        Ok(TagWithCount {
            tag,
            post_count,
            posts: None,
        })
    }

    pub async fn delete(&self, id: i64) -> Result<(), TagServiceError> {
        if !self.repo.delete(id).await? {
            return Err(TagServiceError::NotFound);
        }
        tracing::info!(tag_id = id, "Tag deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::SqlxTagRepository;
    use crate::db::{create_test_pool, migrations};

    async fn setup() -> TagService {
        let pool = create_test_pool().await.unwrap();
        migrations::run_migrations(&pool).await.unwrap();
        TagService::new(SqlxTagRepository::boxed(pool))
    }

    fn input(name: &str, slug: &str) -> CreateTagInput {
        CreateTagInput {
            name: name.into(),
            slug: slug.into(),
        }
    }

    #[tokio::test]
    async fn test_create_and_duplicate() {
        let service = setup().await;
        service.create(input("React", "react")).await.unwrap();
        assert!(matches!(
            service.create(input("React", "react-js")).await,
            Err(TagServiceError::Duplicate)
        ));
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let service = setup().await;
        let tag = service.create(input("Nextjs", "nextjs")).await.unwrap();

        let updated = service
            .update(
                tag.tag.id,
                UpdateTagInput {
                    name: Some("Next.js".into()),
                    slug: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.tag.name, "Next.js");
        assert_eq!(updated.tag.slug, "nextjs");

        service.delete(tag.tag.id).await.unwrap();
        assert!(matches!(
            service.update(tag.tag.id, UpdateTagInput::default()).await,
            Err(TagServiceError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_list_counts_default_to_zero() {
        let service = setup().await;
        service.create(input("Rust", "rust")).await.unwrap();
        let tags = service.list(None, false).await.unwrap();
        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].post_count, 0);
    }
}
