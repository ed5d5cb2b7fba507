//! Post service
//!
//! Business logic for blog posts:
//! - listing with filters, hydrated with author, taxonomy and comment counts
//! - create/update with slug uniqueness and category/tag existence checks
//! - author-or-admin ownership for update and delete

use crate::db::repositories::{
    CategoryRepository, CommentRepository, PostRepository, TagRepository, UserRepository,
};
use crate::models::{
    CommentWithAuthor, CreatePostInput, ListParams, PagedResult, Post, PostDetail, PostFilter,
    UpdatePostInput, User, UserSummary,
};
use chrono::Utc;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

/// Error types for post service operations
#[derive(Debug, thiserror::Error)]
pub enum PostServiceError {
    #[error("Post not found")]
    NotFound,

    #[error("A post with this slug already exists")]
    SlugExists,

    #[error("You can only modify your own posts")]
    Forbidden,

    #[error("One or more categories do not exist")]
    InvalidCategories,

    #[error("One or more tags do not exist")]
    InvalidTags,

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

pub struct PostService {
    posts: Arc<dyn PostRepository>,
    categories: Arc<dyn CategoryRepository>,
    tags: Arc<dyn TagRepository>,
    comments: Arc<dyn CommentRepository>,
    users: Arc<dyn UserRepository>,
}

impl PostService {
    pub fn new(
        posts: Arc<dyn PostRepository>,
        categories: Arc<dyn CategoryRepository>,
        tags: Arc<dyn TagRepository>,
        comments: Arc<dyn CommentRepository>,
        users: Arc<dyn UserRepository>,
    ) -> Self {
        Self {
            posts,
            categories,
            tags,
            comments,
            users,
        }
    }

    /// One page of posts matching `filter`, newest first
    pub async fn list(
        &self,
        filter: &PostFilter,
        params: &ListParams,
    ) -> Result<PagedResult<PostDetail>, PostServiceError> {
        let (posts, total) = self.posts.list(filter, params.as_page()).await?;
        let details = self.hydrate(posts).await?;
        Ok(PagedResult::new(details, total, params))
    }

    /// A single post with its comments, newest first
    pub async fn get(&self, id: i64) -> Result<PostDetail, PostServiceError> {
        let post = self.find(id).await?;
        let mut detail = self
            .hydrate(vec![post])
            .await?
            .pop()
            .ok_or(PostServiceError::NotFound)?;

        let comments = self.comments.list_by_post(id).await?;
        let author_ids: Vec<i64> = comments.iter().map(|c| c.author_id).collect();
        let authors = self.users.summaries(&author_ids).await?;
        detail.comments = Some(
            comments
                .into_iter()
                .map(|comment| CommentWithAuthor {
                    author: author_of(&authors, comment.author_id),
                    comment,
                })
                .collect(),
        );
        Ok(detail)
    }

    pub async fn create(&self, input: CreatePostInput, author: &User) -> Result<PostDetail, PostServiceError> {
        if self.posts.get_by_slug(&input.slug).await?.is_some() {
            return Err(PostServiceError::SlugExists);
        }

        let category_ids = self.checked_categories(input.category_ids.as_deref()).await?;
        let tag_ids = self.checked_tags(input.tag_ids.as_deref()).await?;

        let post = Post::new(
            input.title.trim().to_string(),
            input.content,
            input.slug,
            input.status,
            author.id,
        );
        let post = self
            .posts
            .create(
                &post,
                category_ids.as_deref().unwrap_or_default(),
                tag_ids.as_deref().unwrap_or_default(),
            )
            .await?;
        tracing::info!(post_id = post.id, slug = %post.slug, author_id = author.id, "Post created");

        self.detail(post).await
    }

    /// Partial update by the author or an admin
    pub async fn update(
        &self,
        id: i64,
        input: UpdatePostInput,
        user: &User,
    ) -> Result<PostDetail, PostServiceError> {
        let mut post = self.find(id).await?;
        if !user.can_modify(post.author_id) {
            return Err(PostServiceError::Forbidden);
        }

        if let Some(slug) = input.slug {
            if slug != post.slug {
                if let Some(existing) = self.posts.get_by_slug(&slug).await? {
                    if existing.id != id {
                        return Err(PostServiceError::SlugExists);
                    }
                }
            }
            post.slug = slug;
        }

        let category_ids = self.checked_categories(input.category_ids.as_deref()).await?;
        let tag_ids = self.checked_tags(input.tag_ids.as_deref()).await?;

        let now = Utc::now();
        if let Some(title) = input.title {
            post.title = title.trim().to_string();
        }
        if let Some(content) = input.content {
            post.content = content;
        }
        if let Some(status) = input.status {
            post.set_status(status, now);
        }
        post.updated_at = now;

        let post = self
            .posts
            .update(&post, category_ids.as_deref(), tag_ids.as_deref())
            .await?;
        tracing::info!(post_id = post.id, user_id = user.id, "Post updated");

        self.detail(post).await
    }

    /// Delete by the author or an admin; comments and links go with it
    pub async fn delete(&self, id: i64, user: &User) -> Result<(), PostServiceError> {
        let post = self.find(id).await?;
        if !user.can_modify(post.author_id) {
            return Err(PostServiceError::Forbidden);
        }
        if !self.posts.delete(id).await? {
            return Err(PostServiceError::NotFound);
        }
        tracing::info!(post_id = id, user_id = user.id, "Post deleted");
        Ok(())
    }

    /// Newest posts with author data, for the dashboard
    pub async fn recent(&self, limit: i64) -> Result<Vec<PostDetail>, PostServiceError> {
        let posts = self.posts.list_recent(limit).await?;
        self.hydrate(posts).await
    }

    async fn find(&self, id: i64) -> Result<Post, PostServiceError> {
        self.posts.get_by_id(id).await?.ok_or(PostServiceError::NotFound)
    }

    async fn detail(&self, post: Post) -> Result<PostDetail, PostServiceError> {
        self.hydrate(vec![post])
            .await?
            .pop()
            .ok_or(PostServiceError::NotFound)
    }

    /// Attach authors, categories, tags and comment counts, keeping order
    async fn hydrate(&self, posts: Vec<Post>) -> Result<Vec<PostDetail>, PostServiceError> {
        if posts.is_empty() {
            return Ok(Vec::new());
        }

        let post_ids: Vec<i64> = posts.iter().map(|p| p.id).collect();
        let author_ids: Vec<i64> = posts.iter().map(|p| p.author_id).collect();

        let (authors, mut categories, mut tags, comment_counts) = futures::try_join!(
            self.users.summaries(&author_ids),
            self.posts.categories_for(&post_ids),
            self.posts.tags_for(&post_ids),
            self.comments.counts_for_posts(&post_ids),
        )?;

        Ok(posts
            .into_iter()
            .map(|post| PostDetail {
                author: author_of(&authors, post.author_id),
                categories: categories.remove(&post.id).unwrap_or_default(),
                tags: tags.remove(&post.id).unwrap_or_default(),
                comment_count: comment_counts.get(&post.id).copied().unwrap_or(0),
                comments: None,
                post,
            })
            .collect())
    }

    async fn checked_categories(&self, ids: Option<&[i64]>) -> Result<Option<Vec<i64>>, PostServiceError> {
        let Some(ids) = ids else {
            return Ok(None);
        };
        let ids = dedup(ids);
        if self.categories.existing_ids(&ids).await?.len() != ids.len() {
            return Err(PostServiceError::InvalidCategories);
        }
        Ok(Some(ids))
    }

    async fn checked_tags(&self, ids: Option<&[i64]>) -> Result<Option<Vec<i64>>, PostServiceError> {
        let Some(ids) = ids else {
            return Ok(None);
        };
        let ids = dedup(ids);
        if self.tags.existing_ids(&ids).await?.len() != ids.len() {
            return Err(PostServiceError::InvalidTags);
        }
        Ok(Some(ids))
    }
}

fn dedup(ids: &[i64]) -> Vec<i64> {
    ids.iter().copied().collect::<BTreeSet<_>>().into_iter().collect()
}

pub(crate) fn author_of(authors: &HashMap<i64, UserSummary>, id: i64) -> UserSummary {
    authors
        .get(&id)
        .cloned()
        .unwrap_or_else(|| UserSummary::unknown(id))
}
