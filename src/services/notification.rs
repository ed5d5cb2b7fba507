//! Notification service
//!
//! Users only ever see and touch their own notifications; a notification
//! owned by someone else behaves exactly like a missing one.

use crate::db::repositories::{NotificationRepository, UserRepository};
use crate::models::{
    CreateNotificationInput, ListParams, Notification, NotificationFilter, PagedResult,
};
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum NotificationServiceError {
    #[error("Notification not found")]
    NotFound,

    #[error("User not found")]
    UserNotFound,

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// A page of notifications plus the owner's unread total
#[derive(Debug)]
pub struct NotificationPage {
    pub page: PagedResult<Notification>,
    pub unread_count: i64,
}

pub struct NotificationService {
    repo: Arc<dyn NotificationRepository>,
    users: Arc<dyn UserRepository>,
}

impl NotificationService {
    pub fn new(repo: Arc<dyn NotificationRepository>, users: Arc<dyn UserRepository>) -> Self {
        Self { repo, users }
    }

    pub async fn list(
        &self,
        user_id: i64,
        filter: &NotificationFilter,
        params: &ListParams,
    ) -> Result<NotificationPage, NotificationServiceError> {
        let (items, total) = self
            .repo
            .list_for_user(user_id, filter, params.as_page())
            .await?;
        let unread_count = self.repo.unread_count(user_id).await?;
        Ok(NotificationPage {
            page: PagedResult::new(items, total, params),
            unread_count,
        })
    }

    /// Send a notification to an existing user
    pub async fn create(&self, input: CreateNotificationInput) -> Result<Notification, NotificationServiceError> {
        if self.users.get_by_id(input.user_id).await?.is_none() {
            return Err(NotificationServiceError::UserNotFound);
        }

        let notification = self
            .repo
            .create(&Notification::new(
                input.user_id,
                input.title.trim().to_string(),
                input.message.trim().to_string(),
                input.notification_type,
            ))
            .await?;
        tracing::info!(
            notification_id = notification.id,
            user_id = notification.user_id,
            kind = %notification.notification_type,
            "Notification created"
        );
        Ok(notification)
    }

    pub async fn mark_read(&self, id: i64, user_id: i64) -> Result<Notification, NotificationServiceError> {
        self.repo
            .mark_read(id, user_id)
            .await?
            .ok_or(NotificationServiceError::NotFound)
    }

    /// Returns how many notifications changed
    pub async fn mark_all_read(&self, user_id: i64) -> Result<u64, NotificationServiceError> {
        Ok(self.repo.mark_all_read(user_id).await?)
    }

    pub async fn delete(&self, id: i64, user_id: i64) -> Result<(), NotificationServiceError> {
        if !self.repo.delete_for_user(id, user_id).await? {
            return Err(NotificationServiceError::NotFound);
        }
        Ok(())
    }

    pub async fn unread_count(&self, user_id: i64) -> Result<i64, NotificationServiceError> {
        Ok(self.repo.unread_count(user_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{SqlxNotificationRepository, SqlxUserRepository};
    use crate::db::{create_test_pool, migrations};
    use crate::models::{NotificationType, User};

    async fn setup() -> (NotificationService, i64, i64) {
        let pool = create_test_pool().await.unwrap();
        migrations::run_migrations(&pool).await.unwrap();

        let users = SqlxUserRepository::boxed(pool.clone());
        let mut ids = Vec::new();
        for name in ["owner", "intruder"] {
            let user = users
                .create(&User::new(
                    name.into(),
                    format!("{}@example.com", name),
                    "F".into(),
                    "L".into(),
                    "hash".into(),
                    false,
                ))
                .await
                .unwrap();
            ids.push(user.id);
        }

        let service = NotificationService::new(SqlxNotificationRepository::boxed(pool), users);
        (service, ids[0], ids[1])
    }

    fn input(user_id: i64, title: &str, kind: NotificationType) -> CreateNotificationInput {
        CreateNotificationInput {
            user_id,
            title: title.into(),
            message: "Message".into(),
            notification_type: kind,
        }
    }

    #[tokio::test]
    async fn test_create_for_unknown_user() {
        let (service, _, _) = setup().await;
        assert!(matches!(
            service.create(input(999, "Hi", NotificationType::Info)).await,
            Err(NotificationServiceError::UserNotFound)
        ));
    }

    #[tokio::test]
    async fn test_non_owner_sees_not_found() {
        let (service, owner, intruder) = setup().await;
        let n = service.create(input(owner, "Hi", NotificationType::Info)).await.unwrap();

        assert!(matches!(
            service.mark_read(n.id, intruder).await,
            Err(NotificationServiceError::NotFound)
        ));
        assert!(matches!(
            service.delete(n.id, intruder).await,
            Err(NotificationServiceError::NotFound)
        ));

        let read = service.mark_read(n.id, owner).await.unwrap();
        assert!(read.is_read);
        service.delete(n.id, owner).await.unwrap();
    }

    #[tokio::test]
    async fn test_list_with_unread_count() {
        let (service, owner, intruder) = setup().await;
        service.create(input(owner, "a", NotificationType::Info)).await.unwrap();
        let b = service.create(input(owner, "b", NotificationType::Warning)).await.unwrap();
        service.create(input(owner, "c", NotificationType::Warning)).await.unwrap();
        service.create(input(intruder, "x", NotificationType::Info)).await.unwrap();
        service.mark_read(b.id, owner).await.unwrap();

        let all = service
            .list(owner, &NotificationFilter::default(), &ListParams::new(1, 20))
            .await
            .unwrap();
        assert_eq!(all.page.pagination.total, 3);
        assert_eq!(all.unread_count, 2);
        assert_eq!(all.page.items[0].title, "c");

        let warnings_unread = service
            .list(
                owner,
                &NotificationFilter {
                    unread_only: true,
                    notification_type: Some(NotificationType::Warning),
                },
                &ListParams::new(1, 20),
            )
            .await
            .unwrap();
        assert_eq!(warnings_unread.page.items.len(), 1);
        assert_eq!(warnings_unread.page.items[0].title, "c");

        assert_eq!(service.mark_all_read(owner).await.unwrap(), 2);
        assert_eq!(service.unread_count(owner).await.unwrap(), 0);
        assert_eq!(service.unread_count(intruder).await.unwrap(), 1);
    }
}
