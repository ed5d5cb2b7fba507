//! Demo data for a fresh database
//!
//! Runs only when the users table is empty, so restarting with seeding
//! enabled never duplicates rows.

use anyhow::{Context, Result};

use crate::db::repositories::{
    CategoryRepository, PostRepository, SettingsRepository, SqlxCategoryRepository,
    SqlxPostRepository, SqlxSettingsRepository, SqlxTagRepository, SqlxUserRepository,
    TagRepository, UserRepository,
};
use crate::db::DynDatabasePool;
use crate::models::{Category, Post, PostStatus, SettingType, Tag, User};
use crate::services::password::hash_password;
use crate::services::settings::keys;

/// What a seeding run inserted
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SeedSummary {
    pub users: usize,
    pub categories: usize,
    pub tags: usize,
    pub posts: usize,
    pub settings: usize,
}

const CATEGORIES: [(&str, &str, &str); 3] = [
    ("Technology", "technology", "Technology related posts"),
    ("Business", "business", "Business related posts"),
    ("Lifestyle", "lifestyle", "Lifestyle related posts"),
];

const TAGS: [(&str, &str); 3] = [
    ("JavaScript", "javascript"),
    ("React", "react"),
    ("Next.js", "nextjs"),
];

const POSTS: [(&str, &str, &str); 2] = [
    (
        "Welcome to VastlyWise",
        "welcome-to-vastlywise",
        "This is your first post in the VastlyWise platform. Start creating amazing content!",
    ),
    (
        "Getting Started with Next.js",
        "getting-started-with-nextjs",
        "Next.js is a powerful React framework that makes building full-stack applications simple and efficient.",
    ),
];

const SETTINGS: [(&str, &str, SettingType); 3] = [
    (keys::SITE_NAME, "VastlyWise", SettingType::String),
    (
        keys::SITE_DESCRIPTION,
        "A powerful admin platform for managing your content and business",
        SettingType::String,
    ),
    (keys::MAINTENANCE_MODE, "false", SettingType::Boolean),
];

/// Insert the demo data set unless users already exist
///
/// Returns `None` when the database was left untouched.
pub async fn seed_if_empty(pool: &DynDatabasePool) -> Result<Option<SeedSummary>> {
    let users = SqlxUserRepository::new(pool.clone());
    if users.count().await? > 0 {
        tracing::debug!("Users present, skipping seed");
        return Ok(None);
    }

    let mut summary = SeedSummary::default();

    let admin = users
        .create(&User::new(
            "admin".into(),
            "admin@example.com".into(),
            "Admin".into(),
            "User".into(),
            hash_password("admin123")?,
            true,
        ))
        .await
        .context("Failed to seed admin user")?;
    users
        .create(&User::new(
            "user".into(),
            "user@example.com".into(),
            "Regular".into(),
            "User".into(),
            hash_password("user123")?,
            false,
        ))
        .await
        .context("Failed to seed regular user")?;
    summary.users = 2;

    let categories = SqlxCategoryRepository::new(pool.clone());
    for (name, slug, description) in CATEGORIES {
        categories
            .create(&Category::new(name.into(), slug.into(), Some(description.into())))
            .await?;
        summary.categories += 1;
    }

    let tags = SqlxTagRepository::new(pool.clone());
    for (name, slug) in TAGS {
        tags.create(&Tag::new(name.into(), slug.into())).await?;
        summary.tags += 1;
    }

    let posts = SqlxPostRepository::new(pool.clone());
    for (title, slug, content) in POSTS {
        let post = Post::new(
            title.into(),
            content.into(),
            slug.into(),
            PostStatus::Published,
            admin.id,
        );
        posts.create(&post, &[], &[]).await?;
        summary.posts += 1;
    }

    let settings = SqlxSettingsRepository::new(pool.clone());
    for (key, value, value_type) in SETTINGS {
        settings.upsert(key, value, value_type).await?;
        summary.settings += 1;
    }

    tracing::info!(
        users = summary.users,
        categories = summary.categories,
        tags = summary.tags,
        posts = summary.posts,
        settings = summary.settings,
        "Database seeded"
    );
    Ok(Some(summary))
}
