//! VastlyWise - admin and content management backend

use anyhow::Result;
use std::path::Path;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use vastlywise::{
    api::{self, AppState},
    config::Config,
    db,
    services::seed_if_empty,
};

/// How often expired login attempts are dropped
const RATE_LIMIT_CLEANUP: Duration = Duration::from_secs(300);

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vastlywise=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting VastlyWise...");

    // Load configuration
    let config = Config::load_with_env(Path::new("config.yml"))?;
    tracing::info!("Configuration loaded");

    // Initialize database
    let pool = db::create_pool(&config.database).await?;
    tracing::info!("Database connected: {:?}", config.database.driver);

    // Run migrations
    let applied = db::migrations::run_migrations(&pool).await?;
    tracing::info!("Database migrations completed ({} applied)", applied);

    if config.seed.enabled {
        match seed_if_empty(&pool).await? {
            Some(summary) => tracing::info!(?summary, "Database seeded"),
            None => tracing::info!("Database already has users, skipping seed"),
        }
    }

    tokio::fs::create_dir_all(&config.upload.path).await?;

    let state = AppState::new(pool, config)?;

    // Start rate limiter cleanup task
    {
        let limiter = state.rate_limiter.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(RATE_LIMIT_CLEANUP);
            loop {
                interval.tick().await;
                limiter.cleanup().await;
            }
        });
    }

    let addr = format!("{}:{}", state.config.server.host, state.config.server.port);
    let app = api::build_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
