//! API layer - HTTP handlers and routing
//!
//! Every endpoint lives under `/api` and answers with the JSON envelope from
//! [`common::ApiResponse`] or [`middleware::ApiError`]. Each resource module
//! exposes its routes grouped by access level:
//! - `public_routes` - no sign-in needed
//! - `protected_routes` - behind `require_auth`
//! - `admin_routes` - behind `require_auth` and `require_admin`

pub mod analytics;
pub mod auth;
pub mod categories;
pub mod comments;
pub mod common;
pub mod dashboard;
pub mod health;
pub mod middleware;
pub mod notifications;
pub mod posts;
pub mod preview;
pub mod settings;
pub mod tags;
pub mod upload;

use axum::{
    http::{header, HeaderValue, Method},
    middleware as axum_middleware,
    routing::post,
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowOrigin, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

pub use common::ApiResponse;
pub use middleware::{ApiError, AppState, AuthenticatedUser};

/// Build the API router (mounted under `/api`)
pub fn build_api_router(state: AppState) -> Router<AppState> {
    // Admin routes (need admin role)
    let admin_routes = Router::new()
        .merge(categories::admin_routes())
        .merge(tags::admin_routes())
        .merge(notifications::admin_routes())
        .merge(settings::admin_routes())
        .route_layer(axum_middleware::from_fn(middleware::require_admin))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ));

    // Protected routes (need auth but not admin)
    let protected_routes = Router::new()
        .merge(posts::protected_routes())
        .merge(comments::protected_routes())
        .merge(categories::protected_routes())
        .merge(tags::protected_routes())
        .merge(notifications::protected_routes())
        .merge(upload::protected_routes(state.config.upload.max_file_size))
        .merge(analytics::protected_routes())
        .merge(dashboard::protected_routes())
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ));

    // Public routes
    Router::new()
        .nest("/auth", auth::router())
        .route("/logout", post(auth::logout))
        .merge(health::public_routes())
        .merge(posts::public_routes())
        .merge(comments::public_routes())
        .merge(categories::public_routes())
        .merge(tags::public_routes())
        .merge(settings::public_routes())
        .merge(preview::public_routes())
        .merge(admin_routes)
        .merge(protected_routes)
}

fn cors_layer(origin: &str) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::COOKIE])
        .allow_credentials(true);

    // Credentialed CORS forbids a literal wildcard
    if origin.trim() == "*" {
        return cors.allow_origin(AllowOrigin::mirror_request());
    }

    match origin.parse::<HeaderValue>() {
        Ok(value) => cors.allow_origin(value),
        Err(e) => {
            tracing::warn!("Ignoring invalid CORS origin {:?}: {}", origin, e);
            cors
        }
    }
}

/// Build the complete router with middleware
pub fn build_router(state: AppState) -> Router {
    let uploads = ServeDir::new(&state.config.upload.path);

    Router::new()
        .nest("/api", build_api_router(state.clone()))
        .nest_service("/uploads", uploads)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new())
                .layer(cors_layer(&state.config.server.cors_origin)),
        )
        .with_state(state)
}
