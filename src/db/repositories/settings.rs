//! Settings repository
//!
//! Typed key/value site settings. Keys are unique; writing an existing key
//! replaces its value and type.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::config::DatabaseDriver;
use crate::db::pool::on_pool;
use crate::db::query::{bind_params, placeholders};
use crate::db::{DynDatabasePool, SqlParam};
use crate::models::{Setting, SettingType};

const SETTING_COLUMNS: &str = "id, setting_key, value, value_type, created_at, updated_at";

/// Repository trait for settings operations
#[async_trait]
pub trait SettingsRepository: Send + Sync {
    /// Get a single setting by key
    async fn get(&self, key: &str) -> Result<Option<Setting>>;

    /// All settings ordered by key
    async fn list(&self) -> Result<Vec<Setting>>;

    /// The settings among `keys` that exist
    async fn get_many(&self, keys: &[&str]) -> Result<Vec<Setting>>;

    /// Insert or replace a setting
    async fn upsert(&self, key: &str, value: &str, value_type: SettingType) -> Result<Setting>;

    /// Returns false when the key did not exist
    async fn delete(&self, key: &str) -> Result<bool>;
}

#[derive(sqlx::FromRow)]
struct SettingRow {
    id: i64,
    setting_key: String,
    value: String,
    value_type: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<SettingRow> for Setting {
    type Error = anyhow::Error;

    fn try_from(row: SettingRow) -> Result<Self> {
        Ok(Setting {
            id: row.id,
            key: row.setting_key,
            value: row.value,
            value_type: row.value_type.parse()?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn into_settings(rows: Vec<SettingRow>) -> Result<Vec<Setting>> {
    rows.into_iter().map(Setting::try_from).collect()
}

/// SQLx-based settings repository
pub struct SqlxSettingsRepository {
    pool: DynDatabasePool,
}

impl SqlxSettingsRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn SettingsRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl SettingsRepository for SqlxSettingsRepository {
    async fn get(&self, key: &str) -> Result<Option<Setting>> {
        let sql = format!("SELECT {} FROM settings WHERE setting_key = ?", SETTING_COLUMNS);
        let row = on_pool!(self.pool, |p| {
            sqlx::query_as::<Db, SettingRow>(&sql)
                .bind(key)
                .fetch_optional(p)
                .await
                .context("Failed to get setting")?
        });
        row.map(Setting::try_from).transpose()
    }

    async fn list(&self) -> Result<Vec<Setting>> {
        let sql = format!("SELECT {} FROM settings ORDER BY setting_key ASC", SETTING_COLUMNS);
        let rows = on_pool!(self.pool, |p| {
            sqlx::query_as::<Db, SettingRow>(&sql)
                .fetch_all(p)
                .await
                .context("Failed to list settings")?
        });
        into_settings(rows)
    }

    async fn get_many(&self, keys: &[&str]) -> Result<Vec<Setting>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!(
            "SELECT {} FROM settings WHERE setting_key IN ({}) ORDER BY setting_key ASC",
            SETTING_COLUMNS,
            placeholders(keys.len())
        );
        let params: Vec<SqlParam> = keys.iter().map(|k| SqlParam::Text(k.to_string())).collect();
        let rows = on_pool!(self.pool, |p| {
            bind_params!(sqlx::query_as::<Db, SettingRow>(&sql), &params)
                .fetch_all(p)
                .await
                .context("Failed to get settings")?
        });
        into_settings(rows)
    }

    async fn upsert(&self, key: &str, value: &str, value_type: SettingType) -> Result<Setting> {
        let sql = match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                r#"
                INSERT INTO settings (setting_key, value, value_type, created_at, updated_at)
                VALUES (?, ?, ?, ?, ?)
                ON CONFLICT(setting_key) DO UPDATE SET
                    value = excluded.value,
                    value_type = excluded.value_type,
                    updated_at = excluded.updated_at
                "#
            }
            DatabaseDriver::Mysql => {
                r#"
                INSERT INTO settings (setting_key, value, value_type, created_at, updated_at)
                VALUES (?, ?, ?, ?, ?)
                ON DUPLICATE KEY UPDATE
                    value = VALUES(value),
                    value_type = VALUES(value_type),
                    updated_at = VALUES(updated_at)
                "#
            }
        };

        let now = Utc::now();
        on_pool!(self.pool, |p| {
            sqlx::query(sql)
                .bind(key)
                .bind(value)
                .bind(value_type.as_str())
                .bind(now)
                .bind(now)
                .execute(p)
                .await
                .with_context(|| format!("Failed to save setting {}", key))?;
        });

        self.get(key)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Setting {} missing after save", key))
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let affected = on_pool!(self.pool, |p| {
            sqlx::query("DELETE FROM settings WHERE setting_key = ?")
                .bind(key)
                .execute(p)
                .await
                .context("Failed to delete setting")?
                .rows_affected()
        });
        Ok(affected > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};

    async fn setup() -> SqlxSettingsRepository {
        let pool = create_test_pool().await.unwrap();
        migrations::run_migrations(&pool).await.unwrap();
        SqlxSettingsRepository::new(pool)
    }

    #[tokio::test]
    async fn test_upsert_inserts_then_replaces() {
        let repo = setup().await;
        let first = repo.upsert("site_name", "Old", SettingType::String).await.unwrap();
        assert_eq!(first.value, "Old");

        let second = repo.upsert("site_name", "42", SettingType::Number).await.unwrap();
        assert_eq!(second.id, first.id);
        assert_eq!(second.value, "42");
        assert_eq!(second.value_type, SettingType::Number);
        assert_eq!(second.created_at, first.created_at);
        assert_eq!(repo.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_list_ordered_and_get_many() {
        let repo = setup().await;
        repo.upsert("maintenance_mode", "false", SettingType::Boolean).await.unwrap();
        repo.upsert("site_name", "VastlyWise", SettingType::String).await.unwrap();
        repo.upsert("limits", r#"{"max":3}"#, SettingType::Json).await.unwrap();

        let keys: Vec<_> = repo.list().await.unwrap().into_iter().map(|s| s.key).collect();
        assert_eq!(keys, vec!["limits", "maintenance_mode", "site_name"]);

        let some = repo.get_many(&["site_name", "missing"]).await.unwrap();
        assert_eq!(some.len(), 1);
        assert_eq!(some[0].value, "VastlyWise");
    }

    #[tokio::test]
    async fn test_delete() {
        let repo = setup().await;
        repo.upsert("k", "v", SettingType::String).await.unwrap();
        assert!(repo.delete("k").await.unwrap());
        assert!(!repo.delete("k").await.unwrap());
        assert!(repo.get("k").await.unwrap().is_none());
    }
}
