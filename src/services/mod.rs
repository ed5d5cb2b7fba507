//! Services layer - Business logic
//!
//! This module contains the business logic of the VastlyWise admin backend.
//! Services are responsible for:
//! - Implementing business rules and ownership checks
//! - Coordinating between repositories
//! - Mapping failures to per-service error enums

pub mod analytics;
pub mod category;
pub mod comment;
pub mod dashboard;
pub mod jwt;
pub mod notification;
pub mod password;
pub mod post;
pub mod preview;
pub mod rate_limiter;
pub mod seed;
pub mod settings;
pub mod tag;
pub mod upload;
pub mod user;

pub use analytics::{AnalyticsReport, AnalyticsService, AnalyticsServiceError};
pub use category::{CategoryService, CategoryServiceError};
pub use comment::{CommentService, CommentServiceError};
pub use dashboard::{Dashboard, DashboardService, DashboardServiceError, DashboardSources};
pub use jwt::{Claims, JwtManager, TokenError};
pub use notification::{NotificationPage, NotificationService, NotificationServiceError};
pub use password::{hash_password, verify_password};
pub use post::{PostService, PostServiceError};
pub use preview::{PreviewService, PreviewServiceError};
pub use rate_limiter::LoginRateLimiter;
pub use seed::{seed_if_empty, SeedSummary};
pub use settings::{SettingsService, SettingsServiceError};
pub use tag::{TagService, TagServiceError};
pub use upload::{UploadService, UploadServiceError};
pub use user::{UserService, UserServiceError};
