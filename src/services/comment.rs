//! Comment service

use crate::db::repositories::{CommentRepository, PostRepository, UserRepository};
use crate::models::{Comment, CommentWithAuthor, CreateCommentInput, User};
use crate::services::post::author_of;
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum CommentServiceError {
    #[error("Post not found")]
    PostNotFound,

    #[error("Comment not found")]
    NotFound,

    #[error("You can only delete your own comments")]
    Forbidden,

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

pub struct CommentService {
    comments: Arc<dyn CommentRepository>,
    posts: Arc<dyn PostRepository>,
    users: Arc<dyn UserRepository>,
}

impl CommentService {
    pub fn new(
        comments: Arc<dyn CommentRepository>,
        posts: Arc<dyn PostRepository>,
        users: Arc<dyn UserRepository>,
    ) -> Self {
        Self { comments, posts, users }
    }

    /// Comments on a post, newest first
    pub async fn list_for_post(&self, post_id: i64) -> Result<Vec<CommentWithAuthor>, CommentServiceError> {
        if self.posts.get_by_id(post_id).await?.is_none() {
            return Err(CommentServiceError::PostNotFound);
        }

        let comments = self.comments.list_by_post(post_id).await?;
        let author_ids: Vec<i64> = comments.iter().map(|c| c.author_id).collect();
        let authors = self.users.summaries(&author_ids).await?;

        Ok(comments
            .into_iter()
            .map(|comment| CommentWithAuthor {
                author: author_of(&authors, comment.author_id),
                comment,
            })
            .collect())
    }

    pub async fn create(
        &self,
        post_id: i64,
        input: CreateCommentInput,
        author: &User,
    ) -> Result<CommentWithAuthor, CommentServiceError> {
        if self.posts.get_by_id(post_id).await?.is_none() {
            return Err(CommentServiceError::PostNotFound);
        }

        let comment = self
            .comments
            .create(&Comment::new(input.content.trim().to_string(), post_id, author.id))
            .await?;
        tracing::debug!(comment_id = comment.id, post_id, author_id = author.id, "Comment created");

        Ok(CommentWithAuthor {
            comment,
            author: author.summary(),
        })
    }

    /// The comment's author, the post's author and admins may delete
    pub async fn delete(&self, id: i64, user: &User) -> Result<(), CommentServiceError> {
        let comment = self
            .comments
            .get_by_id(id)
            .await?
            .ok_or(CommentServiceError::NotFound)?;

        if !user.can_modify(comment.author_id) {
            let post_author = self.posts.get_by_id(comment.post_id).await?.map(|p| p.author_id);
            if post_author != Some(user.id) {
                return Err(CommentServiceError::Forbidden);
            }
        }

        if !self.comments.delete(id).await? {
            return Err(CommentServiceError::NotFound);
        }
        tracing::info!(comment_id = id, user_id = user.id, "Comment deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{SqlxCommentRepository, SqlxPostRepository, SqlxUserRepository};
    use crate::db::{create_test_pool, migrations};
    use crate::models::{Post, PostStatus};

    struct Fixture {
        service: CommentService,
        post_id: i64,
        post_author: User,
        commenter: User,
        stranger: User,
        admin: User,
    }

    async fn setup() -> Fixture {
        let pool = create_test_pool().await.unwrap();
        migrations::run_migrations(&pool).await.unwrap();

        let users = SqlxUserRepository::boxed(pool.clone());
        let mut created = Vec::new();
        for (name, admin) in [("writer", false), ("reader", false), ("stranger", false), ("admin", true)] {
            let user = users
                .create(&User::new(
                    name.into(),
                    format!("{}@example.com", name),
                    "F".into(),
                    "L".into(),
                    "hash".into(),
                    admin,
                ))
                .await
                .unwrap();
            created.push(user);
        }

        let posts = SqlxPostRepository::boxed(pool.clone());
        let post = posts
            .create(
                &Post::new("Hello".into(), "Body".into(), "hello".into(), PostStatus::Published, created[0].id),
                &[],
                &[],
            )
            .await
            .unwrap();

        let mut created = created.into_iter();
        Fixture {
            service: CommentService::new(SqlxCommentRepository::boxed(pool), posts, users),
            post_id: post.id,
            post_author: created.next().unwrap(),
            commenter: created.next().unwrap(),
            stranger: created.next().unwrap(),
            admin: created.next().unwrap(),
        }
    }

    fn content(text: &str) -> CreateCommentInput {
        CreateCommentInput { content: text.into() }
    }

    #[tokio::test]
    async fn test_create_and_list_newest_first() {
        let f = setup().await;
        f.service.create(f.post_id, content("first"), &f.commenter).await.unwrap();
        let second = f.service.create(f.post_id, content("second"), &f.stranger).await.unwrap();
        assert_eq!(second.author.username, "stranger");

        let comments = f.service.list_for_post(f.post_id).await.unwrap();
        assert_eq!(comments.len(), 2);
        assert_eq!(comments[0].comment.content, "second");
        assert_eq!(comments[1].author.username, "reader");
    }

    #[tokio::test]
    async fn test_unknown_post() {
        let f = setup().await;
        assert!(matches!(
            f.service.list_for_post(404).await,
            Err(CommentServiceError::PostNotFound)
        ));
        assert!(matches!(
            f.service.create(404, content("x"), &f.commenter).await,
            Err(CommentServiceError::PostNotFound)
        ));
    }

    #[tokio::test]
    async fn test_delete_permissions() {
        let f = setup().await;
        let c1 = f.service.create(f.post_id, content("a"), &f.commenter).await.unwrap();
        let c2 = f.service.create(f.post_id, content("b"), &f.commenter).await.unwrap();
        let c3 = f.service.create(f.post_id, content("c"), &f.commenter).await.unwrap();

        assert!(matches!(
            f.service.delete(c1.comment.id, &f.stranger).await,
            Err(CommentServiceError::Forbidden)
        ));
        f.service.delete(c1.comment.id, &f.commenter).await.unwrap();
        f.service.delete(c2.comment.id, &f.post_author).await.unwrap();
        f.service.delete(c3.comment.id, &f.admin).await.unwrap();

        assert!(matches!(
            f.service.delete(c3.comment.id, &f.admin).await,
            Err(CommentServiceError::NotFound)
        ));
        assert!(f.service.list_for_post(f.post_id).await.unwrap().is_empty());
    }
}
