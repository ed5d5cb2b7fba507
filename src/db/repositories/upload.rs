//! File upload repository

use crate::db::pool::on_pool;
use crate::db::query::{bind_params, escape_like, Filter, Page, LIKE_ESCAPE};
use crate::db::{DynDatabasePool, LastInsertId, SqlParam};
use crate::models::{FileUpload, UploadFilter};
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::sync::Arc;

const UPLOAD_COLUMNS: &str =
    "id, filename, original_name, mime_type, size, path, uploaded_by_id, created_at";

#[async_trait]
pub trait UploadRepository: Send + Sync {
    async fn create(&self, upload: &FileUpload) -> Result<FileUpload>;

    async fn get_by_id(&self, id: i64) -> Result<Option<FileUpload>>;

    async fn delete(&self, id: i64) -> Result<bool>;

    /// One page of uploads, newest first, plus the total matching the filter
    async fn list(&self, filter: &UploadFilter, page: Page) -> Result<(Vec<FileUpload>, i64)>;

    async fn count(&self) -> Result<i64>;
}

pub struct SqlxUploadRepository {
    pool: DynDatabasePool,
}

impl SqlxUploadRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn UploadRepository> {
        Arc::new(Self::new(pool))
    }
}

fn build_filter(filter: &UploadFilter) -> Filter {
    let mut f = Filter::new();
    if let Some(term) = filter.search.as_deref().filter(|s| !s.trim().is_empty()) {
        f.push_search(&["original_name", "filename"], term);
    }
    if let Some(mime) = filter.mime_type.as_deref().filter(|s| !s.trim().is_empty()) {
        // prefix match so that `image/` selects every image type
        f.push(
            format!("mime_type LIKE ? ESCAPE '{}'", LIKE_ESCAPE),
            [SqlParam::Text(format!("{}%", escape_like(mime.trim())))],
        );
    }
    f
}

#[async_trait]
impl UploadRepository for SqlxUploadRepository {
    async fn create(&self, upload: &FileUpload) -> Result<FileUpload> {
        let id = on_pool!(self.pool, |p| {
            sqlx::query(
                r#"
                INSERT INTO file_uploads (filename, original_name, mime_type, size, path, uploaded_by_id, created_at)
                VALUES (?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&upload.filename)
            .bind(&upload.original_name)
            .bind(&upload.mime_type)
            .bind(upload.size)
            .bind(&upload.path)
            .bind(upload.uploaded_by_id)
            .bind(upload.created_at)
            .execute(p)
            .await
            .context("Failed to record upload")?
            .insert_id()
        });
        Ok(FileUpload { id, ..upload.clone() })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<FileUpload>> {
        let sql = format!("SELECT {} FROM file_uploads WHERE id = ?", UPLOAD_COLUMNS);
        let upload = on_pool!(self.pool, |p| {
            sqlx::query_as::<Db, FileUpload>(&sql)
                .bind(id)
                .fetch_optional(p)
                .await
                .context("Failed to get upload")?
        });
        Ok(upload)
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let affected = on_pool!(self.pool, |p| {
            sqlx::query("DELETE FROM file_uploads WHERE id = ?")
                .bind(id)
                .execute(p)
                .await
                .context("Failed to delete upload")?
                .rows_affected()
        });
        Ok(affected > 0)
    }

    async fn list(&self, filter: &UploadFilter, page: Page) -> Result<(Vec<FileUpload>, i64)> {
        let where_clause = build_filter(filter);
        let count_sql = format!("SELECT COUNT(*) FROM file_uploads{}", where_clause.sql());
        let list_sql = format!(
            "SELECT {} FROM file_uploads{} ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?",
            UPLOAD_COLUMNS,
            where_clause.sql()
        );

        let (total, uploads) = on_pool!(self.pool, |p| {
            let total = bind_params!(sqlx::query_scalar::<Db, i64>(&count_sql), where_clause.params())
                .fetch_one(p)
                .await
                .context("Failed to count uploads")?;
            let uploads = bind_params!(sqlx::query_as::<Db, FileUpload>(&list_sql), where_clause.params())
                .bind(page.limit)
                .bind(page.offset)
                .fetch_all(p)
                .await
                .context("Failed to list uploads")?;
            (total, uploads)
        });
        Ok((uploads, total))
    }

    async fn count(&self) -> Result<i64> {
        let count = on_pool!(self.pool, |p| {
            sqlx::query_scalar::<Db, i64>("SELECT COUNT(*) FROM file_uploads")
                .fetch_one(p)
                .await
                .context("Failed to count uploads")?
        });
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};
    use chrono::Utc;

    async fn setup() -> SqlxUploadRepository {
        let pool = create_test_pool().await.unwrap();
        migrations::run_migrations(&pool).await.unwrap();
        SqlxUploadRepository::new(pool)
    }

    fn upload(filename: &str, original: &str, mime: &str) -> FileUpload {
        FileUpload {
            id: 0,
            filename: filename.into(),
            original_name: original.into(),
            mime_type: mime.into(),
            size: 1024,
            path: format!("/uploads/{}", filename),
            uploaded_by_id: None,
            created_at: Utc::now(),
        }
    }

    fn first_page() -> Page {
        Page { limit: 20, offset: 0 }
    }

    #[tokio::test]
    async fn test_create_get_delete() {
        let repo = setup().await;
        let created = repo.create(&upload("1-a.png", "logo.png", "image/png")).await.unwrap();
        assert!(created.id > 0);

        let found = repo.get_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(found.original_name, "logo.png");
        assert_eq!(repo.count().await.unwrap(), 1);

        assert!(repo.delete(created.id).await.unwrap());
        assert!(repo.get_by_id(created.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_filters() {
        let repo = setup().await;
        repo.create(&upload("1-a.png", "Logo.png", "image/png")).await.unwrap();
        repo.create(&upload("2-b.jpg", "photo.jpg", "image/jpeg")).await.unwrap();
        repo.create(&upload("3-c.pdf", "report.pdf", "application/pdf")).await.unwrap();

        let (all, total) = repo.list(&UploadFilter::default(), first_page()).await.unwrap();
        assert_eq!(total, 3);
        assert_eq!(all[0].filename, "3-c.pdf");

        let images = UploadFilter {
            mime_type: Some("image/".into()),
            ..Default::default()
        };
        assert_eq!(repo.list(&images, first_page()).await.unwrap().1, 2);

        let search = UploadFilter {
            search: Some("logo".into()),
            ..Default::default()
        };
        let (found, _) = repo.list(&search, first_page()).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].mime_type, "image/png");
    }
}
