//! User service
//!
//! Account registration, credential checks and user lookup. Emails are
//! stored lowercased so lookups are case-insensitive.

use crate::db::repositories::UserRepository;
use crate::models::{RegisterInput, User};
use crate::services::password::{hash_password, verify_password};
use anyhow::Context;
use std::sync::Arc;

/// Error types for user service operations
#[derive(Debug, thiserror::Error)]
pub enum UserServiceError {
    #[error("User with this email or username already exists")]
    UserExists,

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("User not found")]
    NotFound,

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// User service for managing accounts and authentication
pub struct UserService {
    user_repo: Arc<dyn UserRepository>,
}

impl UserService {
    pub fn new(user_repo: Arc<dyn UserRepository>) -> Self {
        Self { user_repo }
    }

    /// Register a regular (non-admin) account from validated input
    pub async fn register(&self, input: RegisterInput) -> Result<User, UserServiceError> {
        let user = self
            .create_user(
                &input.username,
                &input.email,
                &input.first_name,
                &input.last_name,
                &input.password,
                false,
            )
            .await?;
        tracing::info!(user_id = user.id, username = %user.username, "User registered");
        Ok(user)
    }

    /// Create an account with a plaintext password, hashing it first
    pub async fn create_user(
        &self,
        username: &str,
        email: &str,
        first_name: &str,
        last_name: &str,
        password: &str,
        is_admin: bool,
    ) -> Result<User, UserServiceError> {
        let email = email.trim().to_lowercase();
        let username = username.trim();

        if self
            .user_repo
            .exists_by_email_or_username(&email, username)
            .await
            .context("Failed to check existing users")?
        {
            return Err(UserServiceError::UserExists);
        }

        let password_hash = hash_password(password)?;
        let user = User::new(
            username.to_string(),
            email,
            first_name.trim().to_string(),
            last_name.trim().to_string(),
            password_hash,
            is_admin,
        );
        Ok(self.user_repo.create(&user).await?)
    }

    /// Check credentials. Unknown email and wrong password are
    /// indistinguishable to the caller.
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<User, UserServiceError> {
        let user = self
            .find_by_email(email)
            .await?
            .ok_or(UserServiceError::InvalidCredentials)?;

        if !verify_password(password, &user.password_hash)? {
            return Err(UserServiceError::InvalidCredentials);
        }
        Ok(user)
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>, UserServiceError> {
        Ok(self
            .user_repo
            .get_by_email(&email.trim().to_lowercase())
            .await?)
    }

    pub async fn get_by_id(&self, id: i64) -> Result<User, UserServiceError> {
        self.user_repo
            .get_by_id(id)
            .await?
            .ok_or(UserServiceError::NotFound)
    }

    pub async fn count(&self) -> Result<i64, UserServiceError> {
        Ok(self.user_repo.count().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::SqlxUserRepository;
    use crate::db::{create_test_pool, migrations};

    async fn setup() -> UserService {
        let pool = create_test_pool().await.unwrap();
        migrations::run_migrations(&pool).await.unwrap();
        UserService::new(SqlxUserRepository::boxed(pool))
    }

    fn input(username: &str, email: &str) -> RegisterInput {
        RegisterInput {
            username: username.into(),
            first_name: "Jane".into(),
            last_name: "Doe".into(),
            email: email.into(),
            password: "secret1".into(),
        }
    }

    #[tokio::test]
    async fn test_register_lowercases_email_and_is_not_admin() {
        let service = setup().await;
        let user = service.register(input("jane", "Jane@Example.COM")).await.unwrap();
        assert_eq!(user.email, "jane@example.com");
        assert!(!user.is_admin);
        assert_ne!(user.password_hash, "secret1");
    }

    #[tokio::test]
    async fn test_register_duplicate_rejected() {
        let service = setup().await;
        service.register(input("jane", "jane@example.com")).await.unwrap();

        let dup_email = service.register(input("other", "JANE@example.com")).await;
        assert!(matches!(dup_email, Err(UserServiceError::UserExists)));

        let dup_username = service.register(input("jane", "new@example.com")).await;
        assert!(matches!(dup_username, Err(UserServiceError::UserExists)));

        assert_eq!(service.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_authenticate() {
        let service = setup().await;
        service.register(input("jane", "jane@example.com")).await.unwrap();

        let user = service.authenticate("JANE@example.com", "secret1").await.unwrap();
        assert_eq!(user.username, "jane");

        assert!(matches!(
            service.authenticate("jane@example.com", "wrong").await,
            Err(UserServiceError::InvalidCredentials)
        ));
        assert!(matches!(
            service.authenticate("nobody@example.com", "secret1").await,
            Err(UserServiceError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_get_by_id_missing() {
        let service = setup().await;
        assert!(matches!(service.get_by_id(404).await, Err(UserServiceError::NotFound)));
    }
}
