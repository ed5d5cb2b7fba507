//! Database layer
//!
//! SQLite is the default backend (single file next to the binary); MySQL is
//! available for larger deployments. The driver is picked from configuration
//! and hidden behind [`DatabasePool`].
//!
//! ```ignore
//! let pool = create_pool(&config.database).await?;
//! migrations::run_migrations(&pool).await?;
//! pool.ping().await?;
//! ```

pub mod migrations;
pub mod pool;
pub mod query;
pub mod repositories;

pub use pool::{
    create_pool, create_test_pool, Backend, DatabasePool, DynDatabasePool, LastInsertId,
    MysqlDatabase, SqliteDatabase,
};
pub use query::{Page, SqlParam};
