//! Upload service
//!
//! Stores uploaded files in the configured directory under a generated name
//! and registers them in the database. The public path of a stored file is
//! `/uploads/{filename}`.

use crate::config::UploadConfig;
use crate::db::repositories::{UploadRepository, UserRepository};
use crate::models::{FileUpload, ListParams, PagedResult, UploadFilter, UploadWithUser, User};
use anyhow::Context;
use chrono::Utc;
use std::path::Path;
use std::sync::Arc;
use tokio::fs;
use uuid::Uuid;

/// Length of the random part of a stored filename
const RANDOM_SUFFIX_LEN: usize = 13;

#[derive(Debug, thiserror::Error)]
pub enum UploadServiceError {
    #[error("File size too large. Maximum size is {0}MB.")]
    TooLarge(u64),

    #[error("File type not allowed")]
    TypeNotAllowed,

    #[error("File not found")]
    NotFound,

    #[error("You can only delete your own files")]
    Forbidden,

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

pub struct UploadService {
    config: Arc<UploadConfig>,
    repo: Arc<dyn UploadRepository>,
    users: Arc<dyn UserRepository>,
}

impl UploadService {
    pub fn new(
        config: Arc<UploadConfig>,
        repo: Arc<dyn UploadRepository>,
        users: Arc<dyn UserRepository>,
    ) -> Self {
        Self { config, repo, users }
    }

    /// Check, write and register one file
    pub async fn store(
        &self,
        original_name: &str,
        mime_type: &str,
        data: &[u8],
        uploader: &User,
    ) -> Result<FileUpload, UploadServiceError> {
        if data.len() as u64 > self.config.max_file_size {
            return Err(UploadServiceError::TooLarge(self.config.max_size_mb()));
        }
        if !self.config.is_type_allowed(mime_type) {
            return Err(UploadServiceError::TypeNotAllowed);
        }

        fs::create_dir_all(&self.config.path)
            .await
            .with_context(|| format!("Failed to create upload directory {}", self.config.path.display()))?;

        let extension = extension_for(original_name)
            .unwrap_or_else(|| self.config.get_extension(mime_type).to_string());
        let filename = generate_filename(&extension);
        let file_path = self.config.path.join(&filename);

        fs::write(&file_path, data)
            .await
            .with_context(|| format!("Failed to save file {}", file_path.display()))?;

        let upload = FileUpload {
            id: 0,
            filename: filename.clone(),
            original_name: original_name.to_string(),
            mime_type: mime_type.to_string(),
            size: data.len() as i64,
            path: format!("/uploads/{}", filename),
            uploaded_by_id: Some(uploader.id),
            created_at: Utc::now(),
        };

        match self.repo.create(&upload).await {
            Ok(upload) => {
                tracing::info!(
                    upload_id = upload.id,
                    filename = %upload.filename,
                    size = upload.size,
                    "File uploaded"
                );
                Ok(upload)
            }
            Err(e) => {
                // the row is the only reference to the file
                if let Err(remove_err) = fs::remove_file(&file_path).await {
                    tracing::warn!(path = %file_path.display(), "Failed to remove orphaned upload: {}", remove_err);
                }
                Err(e.into())
            }
        }
    }

    pub async fn list(
        &self,
        filter: &UploadFilter,
        params: &ListParams,
    ) -> Result<PagedResult<UploadWithUser>, UploadServiceError> {
        let (uploads, total) = self.repo.list(filter, params.as_page()).await?;
        let uploader_ids: Vec<i64> = uploads.iter().filter_map(|u| u.uploaded_by_id).collect();
        let uploaders = self.users.summaries(&uploader_ids).await?;

        let items = uploads
            .into_iter()
            .map(|upload| UploadWithUser {
                uploaded_by: upload.uploaded_by_id.and_then(|id| uploaders.get(&id).cloned()),
                upload,
            })
            .collect();
        Ok(PagedResult::new(items, total, params))
    }

    /// Remove the row and the stored file; uploader or admin only
    pub async fn delete(&self, id: i64, user: &User) -> Result<(), UploadServiceError> {
        let upload = self
            .repo
            .get_by_id(id)
            .await?
            .ok_or(UploadServiceError::NotFound)?;

        let allowed = user.is_admin || upload.uploaded_by_id == Some(user.id);
        if !allowed {
            return Err(UploadServiceError::Forbidden);
        }

        self.repo.delete(id).await?;

        let file_path = self.config.path.join(&upload.filename);
        match fs::remove_file(&file_path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(path = %file_path.display(), "Upload file already missing");
            }
            Err(e) => {
                return Err(anyhow::Error::new(e)
                    .context(format!("Failed to delete file {}", file_path.display()))
                    .into())
            }
        }

        tracing::info!(upload_id = id, user_id = user.id, "File deleted");
        Ok(())
    }
}

/// `{unix-millis}-{random}.{extension}`
pub fn generate_filename(extension: &str) -> String {
    let random: String = Uuid::new_v4()
        .simple()
        .to_string()
        .chars()
        .take(RANDOM_SUFFIX_LEN)
        .collect();
    format!("{}-{}.{}", Utc::now().timestamp_millis(), random, extension)
}

/// Lowercased extension of a client filename, when it has a usable one
fn extension_for(original_name: &str) -> Option<String> {
    let ext = Path::new(original_name).extension()?.to_str()?;
    if ext.is_empty() || ext.len() > 10 || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{SqlxUploadRepository, SqlxUserRepository};
    use crate::db::{create_test_pool, migrations};
    use tempfile::TempDir;

    struct Fixture {
        service: UploadService,
        dir: TempDir,
        owner: User,
        other: User,
        admin: User,
    }

    async fn setup() -> Fixture {
        let pool = create_test_pool().await.unwrap();
        migrations::run_migrations(&pool).await.unwrap();

        let users = SqlxUserRepository::boxed(pool.clone());
        let mut created = Vec::new();
        for (name, admin) in [("owner", false), ("other", false), ("admin", true)] {
            created.push(
                users
                    .create(&User::new(
                        name.into(),
                        format!("{}@example.com", name),
                        "F".into(),
                        "L".into(),
                        "hash".into(),
                        admin,
                    ))
                    .await
                    .unwrap(),
            );
        }

        let dir = TempDir::new().unwrap();
        let config = UploadConfig {
            path: dir.path().join("uploads"),
            max_file_size: 1024,
            ..Default::default()
        };
        let service = UploadService::new(Arc::new(config), SqlxUploadRepository::boxed(pool), users);

        let mut created = created.into_iter();
        Fixture {
            service,
            dir,
            owner: created.next().unwrap(),
            other: created.next().unwrap(),
            admin: created.next().unwrap(),
        }
    }

    #[test]
    fn test_generated_filename_shape() {
        let name = generate_filename("png");
        let (millis, rest) = name.split_once('-').unwrap();
        assert!(millis.parse::<i64>().is_ok());
        let (random, ext) = rest.split_once('.').unwrap();
        assert_eq!(random.len(), RANDOM_SUFFIX_LEN);
        assert_eq!(ext, "png");
        assert_ne!(generate_filename("png"), name);
    }

    #[test]
    fn test_extension_for() {
        assert_eq!(extension_for("Photo.JPG").as_deref(), Some("jpg"));
        assert_eq!(extension_for("archive.tar.gz").as_deref(), Some("gz"));
        assert_eq!(extension_for("noext"), None);
        assert_eq!(extension_for("weird.p$p"), None);
    }

    #[tokio::test]
    async fn test_store_writes_file_and_row() {
        let f = setup().await;
        let upload = f
            .service
            .store("notes.txt", "text/plain", b"hello", &f.owner)
            .await
            .unwrap();

        assert!(upload.filename.ends_with(".txt"));
        assert_eq!(upload.path, format!("/uploads/{}", upload.filename));
        assert_eq!(upload.size, 5);
        let on_disk = std::fs::read(f.dir.path().join("uploads").join(&upload.filename)).unwrap();
        assert_eq!(on_disk, b"hello");
    }

    #[tokio::test]
    async fn test_store_rejects_size_and_type() {
        let f = setup().await;
        let big = vec![0u8; 2048];
        let err = f
            .service
            .store("big.png", "image/png", &big, &f.owner)
            .await
            .unwrap_err();
        assert!(matches!(err, UploadServiceError::TooLarge(0)));

        assert!(matches!(
            f.service.store("run.sh", "application/x-sh", b"#!", &f.owner).await,
            Err(UploadServiceError::TypeNotAllowed)
        ));
    }

    #[test]
    fn test_too_large_message() {
        assert_eq!(
            UploadServiceError::TooLarge(10).to_string(),
            "File size too large. Maximum size is 10MB."
        );
    }

    #[tokio::test]
    async fn test_list_includes_uploader() {
        let f = setup().await;
        f.service.store("a.png", "image/png", b"png", &f.owner).await.unwrap();
        f.service.store("b.pdf", "application/pdf", b"pdf", &f.other).await.unwrap();

        let images = f
            .service
            .list(
                &UploadFilter {
                    mime_type: Some("image/".into()),
                    ..Default::default()
                },
                &ListParams::new(1, 20),
            )
            .await
            .unwrap();
        assert_eq!(images.pagination.total, 1);
        assert_eq!(images.items[0].uploaded_by.as_ref().unwrap().username, "owner");
    }

    #[tokio::test]
    async fn test_delete_permissions_and_file_removal() {
        let f = setup().await;
        let mine = f.service.store("a.png", "image/png", b"png", &f.owner).await.unwrap();
        let path = f.dir.path().join("uploads").join(&mine.filename);
        assert!(path.exists());

        assert!(matches!(
            f.service.delete(mine.id, &f.other).await,
            Err(UploadServiceError::Forbidden)
        ));
        f.service.delete(mine.id, &f.owner).await.unwrap();
        assert!(!path.exists());

        let theirs = f.service.store("b.png", "image/png", b"png", &f.other).await.unwrap();
        f.service.delete(theirs.id, &f.admin).await.unwrap();
        assert!(matches!(
            f.service.delete(theirs.id, &f.admin).await,
            Err(UploadServiceError::NotFound)
        ));
    }
}
