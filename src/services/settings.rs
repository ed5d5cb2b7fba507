//! Settings service
//!
//! Typed key/value site settings. Values are stored as text and checked
//! against their declared type before every write.

use serde_json::{Map, Value};
use std::sync::Arc;
use thiserror::Error;

use crate::db::repositories::SettingsRepository;
use crate::models::{Setting, SettingValueError, UpsertSettingInput};

/// Known setting keys
pub mod keys {
    pub const SITE_NAME: &str = "site_name";
    pub const SITE_DESCRIPTION: &str = "site_description";
    pub const MAINTENANCE_MODE: &str = "maintenance_mode";
}

/// Keys readable without signing in
pub const PUBLIC_KEYS: [&str; 3] = [keys::SITE_NAME, keys::SITE_DESCRIPTION, keys::MAINTENANCE_MODE];

/// Settings service errors
#[derive(Debug, Error)]
pub enum SettingsServiceError {
    #[error("Setting not found")]
    NotFound,

    #[error(transparent)]
    InvalidValue(#[from] SettingValueError),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Settings service for managing site configuration
pub struct SettingsService {
    repo: Arc<dyn SettingsRepository>,
}

impl SettingsService {
    pub fn new(repo: Arc<dyn SettingsRepository>) -> Self {
        Self { repo }
    }

    /// All settings ordered by key
    pub async fn list(&self) -> Result<Vec<Setting>, SettingsServiceError> {
        Ok(self.repo.list().await?)
    }

    pub async fn get(&self, key: &str) -> Result<Setting, SettingsServiceError> {
        self.repo.get(key).await?.ok_or(SettingsServiceError::NotFound)
    }

    /// Create or replace a setting after checking the value fits its type
    pub async fn upsert(&self, input: UpsertSettingInput) -> Result<Setting, SettingsServiceError> {
        input.value_type.validate(&input.value)?;
        let setting = self
            .repo
            .upsert(input.key.trim(), &input.value, input.value_type)
            .await?;
        tracing::info!(key = %setting.key, kind = %setting.value_type, "Setting saved");
        Ok(setting)
    }

    pub async fn delete(&self, key: &str) -> Result<(), SettingsServiceError> {
        if !self.repo.delete(key).await? {
            return Err(SettingsServiceError::NotFound);
        }
        tracing::info!(key, "Setting deleted");
        Ok(())
    }

    /// Site name, description and maintenance flag with typed values.
    /// Keys that were never saved get their built-in default.
    pub async fn public_settings(&self) -> Result<Map<String, Value>, SettingsServiceError> {
        let mut map = Map::new();
        map.insert(keys::SITE_NAME.to_string(), Value::from("VastlyWise"));
        map.insert(keys::SITE_DESCRIPTION.to_string(), Value::from(""));
        map.insert(keys::MAINTENANCE_MODE.to_string(), Value::Bool(false));

        for setting in self.repo.get_many(&PUBLIC_KEYS).await? {
            let value = setting.typed_value();
            map.insert(setting.key, value);
        }
        Ok(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::SqlxSettingsRepository;
    use crate::db::{create_test_pool, migrations};
    use crate::models::SettingType;

    async fn setup() -> SettingsService {
        let pool = create_test_pool().await.unwrap();
        migrations::run_migrations(&pool).await.unwrap();
        SettingsService::new(SqlxSettingsRepository::boxed(pool))
    }

    fn input(key: &str, value: &str, value_type: SettingType) -> UpsertSettingInput {
        UpsertSettingInput {
            key: key.into(),
            value: value.into(),
            value_type,
        }
    }

    #[tokio::test]
    async fn test_upsert_validates_value() {
        let service = setup().await;
        let err = service
            .upsert(input("flag", "maybe", SettingType::Boolean))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Invalid boolean value");

        let err = service
            .upsert(input("config", "{", SettingType::Json))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Invalid JSON value");

        assert!(service.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_upsert_replaces_value_and_type() {
        let service = setup().await;
        service.upsert(input("limit", "10", SettingType::Number)).await.unwrap();
        let updated = service.upsert(input("limit", "abc", SettingType::String)).await.unwrap();
        assert_eq!(updated.value, "abc");
        assert_eq!(updated.value_type, SettingType::String);
        assert_eq!(service.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_get_and_delete_missing() {
        let service = setup().await;
        assert!(matches!(service.get("nope").await, Err(SettingsServiceError::NotFound)));
        assert!(matches!(service.delete("nope").await, Err(SettingsServiceError::NotFound)));
    }

    #[tokio::test]
    async fn test_public_settings_typed_with_defaults() {
        let service = setup().await;
        let defaults = service.public_settings().await.unwrap();
        assert_eq!(defaults[keys::MAINTENANCE_MODE], Value::Bool(false));

        service
            .upsert(input(keys::MAINTENANCE_MODE, "TRUE", SettingType::Boolean))
            .await
            .unwrap();
        service
            .upsert(input(keys::SITE_NAME, "My Site", SettingType::String))
            .await
            .unwrap();
        service.upsert(input("secret", "x", SettingType::String)).await.unwrap();

        let public = service.public_settings().await.unwrap();
        assert_eq!(public[keys::MAINTENANCE_MODE], Value::Bool(true));
        assert_eq!(public[keys::SITE_NAME], Value::from("My Site"));
        assert!(public.get("secret").is_none());
    }
}
